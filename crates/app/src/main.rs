//! meshview - main entry point
//!
//! Opens a window, merges a small demo scene into one vertex/index buffer and
//! lets a free-look camera fly through it.
//!
//! Usage: `meshview [config.json]`. Without an argument the path in
//! `MESHVIEW_CONFIG` is used, and without that the built-in defaults.

use std::path::PathBuf;

use anyhow::{Context, Result};
use glam::{Mat4, Vec3};
use tracing::{debug, error, info};
use winit::application::ApplicationHandler;
use winit::event::{DeviceEvent, DeviceId, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::WindowId;

use meshview_core::{FrameCounter, RendererConfig};
use meshview_platform::{InputState, KeyCode, Window};
use meshview_renderer::{Renderer, ShaderSources};
use meshview_scene::primitives::{cube, ground_quad};
use meshview_scene::{Camera, CameraSettings, Model, Scene};

struct Viewer {
    // Dropped before the window: the surface must go first.
    renderer: Renderer,
    camera: Camera,
    view: Mat4,
    window: Window,
}

struct App {
    config: RendererConfig,
    viewer: Option<Viewer>,
    input: InputState,
    frames: FrameCounter,
}

impl App {
    fn new(config: RendererConfig) -> Self {
        Self {
            config,
            viewer: None,
            input: InputState::new(),
            frames: FrameCounter::default(),
        }
    }

    fn start(&self, event_loop: &ActiveEventLoop) -> Result<Viewer> {
        let window = Window::new(event_loop, &self.config.window)?;

        let scene = demo_scene();
        let graphics = &self.config.graphics;
        let shaders = ShaderSources::from_files(&graphics.vertex_shader, &graphics.fragment_shader)
            .context("Failed to load shaders")?;

        let mut renderer = Renderer::bootstrap(&self.config, &window, &scene, &shaders)
            .context("Failed to bootstrap renderer")?;

        let settings = CameraSettings {
            speed: self.config.camera.speed,
            mouse_sensitivity: self.config.camera.mouse_sensitivity,
            renormalize: self.config.camera.renormalize,
        };
        let mut view = Mat4::IDENTITY;
        let camera = Camera::with_basis(
            Vec3::new(0.0, 1.0, 4.0),
            Vec3::NEG_Z,
            Vec3::Y,
            settings,
            &mut view,
        );
        renderer.update_uniforms(&view)?;

        Ok(Viewer {
            renderer,
            camera,
            view,
            window,
        })
    }

    fn tick(&mut self) -> Result<()> {
        let Some(viewer) = self.viewer.as_mut() else {
            return Ok(());
        };

        for command in self.input.take_camera_commands() {
            viewer.camera.apply(command, &mut viewer.view);
        }

        viewer.renderer.update_uniforms(&viewer.view)?;
        viewer.renderer.draw_frame()?;

        if let Some(fps) = self.frames.frame() {
            let drift = viewer.camera.drift();
            debug!("{:.1} fps, camera drift {:.2e}", fps, drift.max());
        }

        Ok(())
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(mut viewer) = self.viewer.take() {
            viewer.renderer.shutdown();
            info!("Rendered {} frame(s)", self.frames.total_frames());
        }
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.viewer.is_some() {
            return;
        }
        match self.start(event_loop) {
            Ok(viewer) => {
                info!("Initialization complete, entering main loop");
                self.viewer = Some(viewer);
            }
            Err(e) => {
                error!("Startup failed: {:#}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                self.shutdown(event_loop);
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.tick() {
                    error!("Frame failed: {:#}", e);
                    self.shutdown(event_loop);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    if event.state.is_pressed() {
                        self.input.on_key_pressed(key);
                    } else {
                        self.input.on_key_released(key);
                    }
                    if key == KeyCode::Escape && event.state.is_pressed() {
                        info!("Escape pressed, shutting down");
                        self.shutdown(event_loop);
                    }
                }
            }
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _id: DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.input.on_mouse_motion(dx, dy);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(viewer) = &self.viewer {
            viewer.window.request_redraw();
        }
    }
}

/// A colored cube, an empty model and a ground quad, in draw order.
fn demo_scene() -> Scene {
    let face_colors = [
        Vec3::new(0.9, 0.2, 0.2),
        Vec3::new(0.2, 0.9, 0.2),
        Vec3::new(0.2, 0.2, 0.9),
        Vec3::new(0.9, 0.9, 0.2),
        Vec3::new(0.2, 0.9, 0.9),
        Vec3::new(0.9, 0.2, 0.9),
    ];

    let mut scene = Scene::new();
    scene.push_model(&cube(Vec3::new(0.0, 0.5, 0.0), 1.0, face_colors));
    scene.push_model(&Model::empty());
    scene.push_model(&ground_quad(Vec3::ZERO, 10.0, Vec3::splat(0.5)));
    scene
}

fn main() -> Result<()> {
    meshview_core::init_logging();
    info!("Starting meshview");

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = RendererConfig::load_or_default(config_path).context("Failed to load config")?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_scene_has_an_empty_draw() {
        let scene = demo_scene();
        assert_eq!(scene.model_count(), 3);
        let ranges: Vec<_> = scene.draw_ranges().collect();
        assert_eq!(ranges[0].index_count, 36);
        assert!(ranges[1].is_empty());
        assert_eq!(ranges[2].index_count, 6);
        assert_eq!(scene.markers().last().copied(), Some(scene.indices().len() as u32));
    }
}
