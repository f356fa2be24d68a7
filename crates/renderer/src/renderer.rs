//! Renderer bootstrap and teardown.
//!
//! The [`Renderer`] owns every GPU resource in an `Option` slot, one group
//! per [`BootstrapStep`]. Each `create_*` method checks its prerequisites
//! with the [`PhaseTracker`], fills its slot and marks the phase complete.
//! [`Renderer::bootstrap`] runs them all in order. [`Renderer::shutdown`]
//! (also run from `Drop`) empties the slots in reverse creation order, so a
//! bootstrap that fails part-way is cleaned up the same way as a full one.

use std::path::Path;
use std::sync::Arc;

use ash::vk;
use glam::Mat4;
use tracing::{debug, error, info};

use meshview_core::{GraphicsConfig, RendererConfig};
use meshview_rhi::buffer::{Buffer, BufferUsage};
use meshview_rhi::command::{CommandBuffer, CommandPool, full_rect, full_viewport};
use meshview_rhi::descriptor::{
    DescriptorPool, DescriptorSetLayout, uniform_buffer_binding, write_uniform_buffer,
};
use meshview_rhi::device::Device;
use meshview_rhi::framebuffer::Framebuffer;
use meshview_rhi::instance::{Instance, InstanceDesc};
use meshview_rhi::physical_device::select_physical_device;
use meshview_rhi::pipeline::{GraphicsPipelineBuilder, Pipeline, PipelineLayout};
use meshview_rhi::render_pass::RenderPass;
use meshview_rhi::shader::{Shader, ShaderStage};
use meshview_rhi::surface::{Surface, SurfaceProvider};
use meshview_rhi::swapchain::Swapchain;
use meshview_rhi::sync::Semaphore;
use meshview_rhi::vertex::Vertex;
use meshview_rhi::{RhiError, RhiResult};
use meshview_scene::{DrawRange, Scene};

use crate::bootstrap::{BootstrapStep, PhaseTracker};
use crate::depth_buffer::{DepthBuffer, find_depth_format};
use crate::draw::record_draws;
use crate::error::{RendererError, RendererResult, StepContext};
use crate::ubo::UniformBufferObject;

/// SPIR-V blobs for the two programmable stages.
#[derive(Clone, Debug, Default)]
pub struct ShaderSources {
    pub vertex: Vec<u8>,
    pub fragment: Vec<u8>,
}

impl ShaderSources {
    pub fn from_files(vertex: &Path, fragment: &Path) -> RhiResult<Self> {
        let read = |path: &Path| {
            std::fs::read(path).map_err(|e| {
                RhiError::ShaderError(format!("Failed to read shader file {:?}: {}", path, e))
            })
        };
        Ok(Self {
            vertex: read(vertex)?,
            fragment: read(fragment)?,
        })
    }
}

pub(crate) struct DescriptorResources {
    // Sets are freed with the pool; the pool goes before the layout.
    pub(crate) set: vk::DescriptorSet,
    pub(crate) _pool: DescriptorPool,
    pub(crate) layout: DescriptorSetLayout,
}

pub(crate) struct GeometryBuffers {
    pub(crate) vertex_buffer: Buffer,
    pub(crate) index_buffer: Buffer,
    pub(crate) draw_ranges: Vec<DrawRange>,
}

pub(crate) struct PipelineResources {
    pub(crate) pipeline: Pipeline,
    pub(crate) layout: PipelineLayout,
}

pub(crate) struct CommandResources {
    /// One per swapchain image, recorded once.
    pub(crate) buffers: Vec<CommandBuffer>,
    pub(crate) _pool: CommandPool,
}

pub(crate) struct SyncObjects {
    pub(crate) image_acquired: Semaphore,
    pub(crate) render_complete: Semaphore,
}

/// Single-frame-in-flight forward renderer for one merged scene.
pub struct Renderer {
    pub(crate) graphics: GraphicsConfig,
    window_extent: vk::Extent2D,
    pub(crate) phases: PhaseTracker,

    pub(crate) instance: Option<Instance>,
    pub(crate) surface: Option<Surface>,
    pub(crate) device: Option<Arc<Device>>,
    pub(crate) swapchain: Option<Swapchain>,
    pub(crate) depth_buffer: Option<DepthBuffer>,
    pub(crate) uniform_buffer: Option<Buffer>,
    pub(crate) descriptors: Option<DescriptorResources>,
    pub(crate) render_pass: Option<RenderPass>,
    pub(crate) framebuffers: Option<Vec<Framebuffer>>,
    pub(crate) geometry: Option<GeometryBuffers>,
    pub(crate) pipeline: Option<PipelineResources>,
    pub(crate) commands: Option<CommandResources>,
    pub(crate) sync: Option<SyncObjects>,
}

impl Renderer {
    /// Creates an empty renderer. No graphics calls are made until a
    /// `create_*` step (or [`Renderer::bootstrap`]) runs.
    pub fn new(config: &RendererConfig) -> Self {
        Self {
            graphics: config.graphics.clone(),
            window_extent: vk::Extent2D {
                width: config.window.width,
                height: config.window.height,
            },
            phases: PhaseTracker::new(),
            instance: None,
            surface: None,
            device: None,
            swapchain: None,
            depth_buffer: None,
            uniform_buffer: None,
            descriptors: None,
            render_pass: None,
            framebuffers: None,
            geometry: None,
            pipeline: None,
            commands: None,
            sync: None,
        }
    }

    /// Runs every bootstrap step in order.
    ///
    /// On failure the partially built renderer is dropped, which tears down
    /// whatever steps had completed.
    pub fn bootstrap(
        config: &RendererConfig,
        surface_provider: &dyn SurfaceProvider,
        scene: &Scene,
        shaders: &ShaderSources,
    ) -> RendererResult<Self> {
        info!(
            "Bootstrapping renderer ({}x{}, {} model(s))",
            config.window.width,
            config.window.height,
            scene.model_count()
        );

        let mut renderer = Self::new(config);
        renderer.create_instance(surface_provider)?;
        renderer.create_surface(surface_provider)?;
        renderer.create_device()?;
        renderer.create_swapchain()?;
        renderer.create_depth_buffer()?;
        renderer.create_uniform_buffer()?;
        renderer.create_descriptors()?;
        renderer.create_render_pass()?;
        renderer.create_framebuffers()?;
        renderer.create_geometry_buffers(scene)?;
        renderer.create_pipeline(shaders)?;
        renderer.create_command_buffers()?;
        renderer.create_sync_objects()?;

        info!("Renderer bootstrapped");
        Ok(renderer)
    }

    pub fn phases(&self) -> &PhaseTracker {
        &self.phases
    }

    fn finish(&mut self, step: BootstrapStep) {
        self.phases.complete(step);
        info!("Bootstrap step complete: {}", step);
    }

    // =========================================================================
    // Bootstrap steps
    // =========================================================================

    pub fn create_instance(&mut self, provider: &dyn SurfaceProvider) -> RendererResult<()> {
        let step = BootstrapStep::Instance;
        self.phases.require(step)?;

        let required_extensions = provider
            .required_instance_extensions(self.graphics.print_diagnostics)
            .step(step.name())?;

        let desc = InstanceDesc {
            required_extensions,
            enable_validation: self.graphics.enable_validation,
            print_diagnostics: self.graphics.print_diagnostics,
        };
        self.instance = Some(Instance::new(&desc).step(step.name())?);

        self.finish(step);
        Ok(())
    }

    pub fn create_surface(&mut self, provider: &dyn SurfaceProvider) -> RendererResult<()> {
        let step = BootstrapStep::Surface;
        self.phases.require(step)?;
        let instance = required(&self.instance, step)?;

        self.surface = Some(Surface::create(instance, provider).step(step.name())?);

        self.finish(step);
        Ok(())
    }

    pub fn create_device(&mut self) -> RendererResult<()> {
        let step = BootstrapStep::Device;
        self.phases.require(step)?;
        let instance = required(&self.instance, step)?;
        let surface = required(&self.surface, step)?;

        let info = select_physical_device(
            instance.handle(),
            surface,
            self.graphics.print_diagnostics,
        )
        .step(step.name())?;
        self.device = Some(Device::new(instance, &info).step(step.name())?);

        self.finish(step);
        Ok(())
    }

    pub fn create_swapchain(&mut self) -> RendererResult<()> {
        let step = BootstrapStep::Swapchain;
        self.phases.require(step)?;
        let instance = required(&self.instance, step)?;
        let surface = required(&self.surface, step)?;
        let device = required(&self.device, step)?;

        self.swapchain = Some(
            Swapchain::new(
                instance,
                device.clone(),
                surface,
                self.window_extent.width,
                self.window_extent.height,
            )
            .step(step.name())?,
        );

        self.finish(step);
        Ok(())
    }

    pub fn create_depth_buffer(&mut self) -> RendererResult<()> {
        let step = BootstrapStep::DepthBuffer;
        self.phases.require(step)?;
        let instance = required(&self.instance, step)?;
        let device = required(&self.device, step)?;
        let swapchain = required(&self.swapchain, step)?;

        let format = find_depth_format(instance, device).step(step.name())?;
        self.depth_buffer =
            Some(DepthBuffer::new(device.clone(), swapchain.extent(), format).step(step.name())?);

        self.finish(step);
        Ok(())
    }

    pub fn create_uniform_buffer(&mut self) -> RendererResult<()> {
        let step = BootstrapStep::UniformBuffer;
        self.phases.require(step)?;
        let device = required(&self.device, step)?;

        let buffer = Buffer::new(
            device.clone(),
            BufferUsage::Uniform,
            UniformBufferObject::SIZE as vk::DeviceSize,
        )
        .step(step.name())?;
        buffer
            .write(0, bytemuck::bytes_of(&UniformBufferObject::default()))
            .step(step.name())?;
        self.uniform_buffer = Some(buffer);

        self.finish(step);
        Ok(())
    }

    pub fn create_descriptors(&mut self) -> RendererResult<()> {
        let step = BootstrapStep::Descriptors;
        self.phases.require(step)?;
        let device = required(&self.device, step)?;
        let uniform_buffer = required(&self.uniform_buffer, step)?;

        let bindings = [uniform_buffer_binding(0, vk::ShaderStageFlags::VERTEX)];
        let layout = DescriptorSetLayout::new(device.clone(), &bindings).step(step.name())?;
        let pool = DescriptorPool::for_bindings(device.clone(), 1, &bindings).step(step.name())?;
        let sets = pool.allocate(&[layout.handle()]).step(step.name())?;
        let set = sets.first().copied().ok_or_else(|| RendererError::Step {
            step: step.name(),
            source: RhiError::InvalidHandle("descriptor pool returned no sets".to_string()),
        })?;

        write_uniform_buffer(
            device,
            set,
            0,
            uniform_buffer.handle(),
            UniformBufferObject::SIZE as vk::DeviceSize,
        );

        self.descriptors = Some(DescriptorResources {
            set,
            _pool: pool,
            layout,
        });

        self.finish(step);
        Ok(())
    }

    pub fn create_render_pass(&mut self) -> RendererResult<()> {
        let step = BootstrapStep::RenderPass;
        self.phases.require(step)?;
        let device = required(&self.device, step)?;
        let swapchain = required(&self.swapchain, step)?;
        let depth_buffer = required(&self.depth_buffer, step)?;

        self.render_pass = Some(
            RenderPass::new(device.clone(), swapchain.format(), depth_buffer.format())
                .step(step.name())?,
        );

        self.finish(step);
        Ok(())
    }

    pub fn create_framebuffers(&mut self) -> RendererResult<()> {
        let step = BootstrapStep::Framebuffers;
        self.phases.require(step)?;
        let device = required(&self.device, step)?;
        let swapchain = required(&self.swapchain, step)?;
        let depth_buffer = required(&self.depth_buffer, step)?;
        let render_pass = required(&self.render_pass, step)?;

        let framebuffers = swapchain
            .image_views()
            .iter()
            .map(|&color_view| {
                Framebuffer::new(
                    device.clone(),
                    render_pass.handle(),
                    &[color_view, depth_buffer.image_view()],
                    swapchain.extent(),
                )
            })
            .collect::<RhiResult<Vec<_>>>()
            .step(step.name())?;

        debug!("Created {} framebuffer(s)", framebuffers.len());
        self.framebuffers = Some(framebuffers);

        self.finish(step);
        Ok(())
    }

    /// Uploads the scene's merged vertex and index arrays once.
    pub fn create_geometry_buffers(&mut self, scene: &Scene) -> RendererResult<()> {
        let step = BootstrapStep::GeometryBuffers;
        self.phases.require(step)?;
        let device = required(&self.device, step)?;

        let vertex_buffer = Buffer::new_with_data(
            device.clone(),
            BufferUsage::Vertex,
            bytemuck::cast_slice::<Vertex, u8>(scene.vertices()),
        )
        .step(step.name())?;
        let index_buffer = Buffer::new_with_data(
            device.clone(),
            BufferUsage::Index,
            bytemuck::cast_slice::<u32, u8>(scene.indices()),
        )
        .step(step.name())?;

        info!(
            "Uploaded scene: {} vertices, {} indices, {} draw(s)",
            scene.vertices().len(),
            scene.indices().len(),
            scene.model_count()
        );

        self.geometry = Some(GeometryBuffers {
            vertex_buffer,
            index_buffer,
            draw_ranges: scene.draw_ranges().collect(),
        });

        self.finish(step);
        Ok(())
    }

    pub fn create_pipeline(&mut self, shaders: &ShaderSources) -> RendererResult<()> {
        let step = BootstrapStep::Pipeline;
        self.phases.require(step)?;
        let device = required(&self.device, step)?;
        let descriptors = required(&self.descriptors, step)?;
        let render_pass = required(&self.render_pass, step)?;

        let vertex_shader =
            Shader::from_spirv_bytes(device.clone(), &shaders.vertex, ShaderStage::Vertex, "main")
                .step(step.name())?;
        let fragment_shader = Shader::from_spirv_bytes(
            device.clone(),
            &shaders.fragment,
            ShaderStage::Fragment,
            "main",
        )
        .step(step.name())?;

        let layout = PipelineLayout::new(device.clone(), &[descriptors.layout.handle()], &[])
            .step(step.name())?;
        let pipeline = GraphicsPipelineBuilder::new()
            .vertex_shader(&vertex_shader)
            .fragment_shader(&fragment_shader)
            .vertex_binding(Vertex::binding_description())
            .vertex_attributes(&Vertex::attribute_descriptions())
            .render_pass(render_pass.handle())
            .build(device.clone(), &layout)
            .step(step.name())?;

        self.pipeline = Some(PipelineResources { pipeline, layout });

        self.finish(step);
        Ok(())
    }

    /// Allocates and records one command buffer per framebuffer.
    pub fn create_command_buffers(&mut self) -> RendererResult<()> {
        let step = BootstrapStep::CommandBuffers;
        self.phases.require(step)?;
        let device = required(&self.device, step)?;
        let swapchain = required(&self.swapchain, step)?;
        let descriptors = required(&self.descriptors, step)?;
        let render_pass = required(&self.render_pass, step)?;
        let framebuffers = required(&self.framebuffers, step)?;
        let geometry = required(&self.geometry, step)?;
        let pipeline = required(&self.pipeline, step)?;

        let pool = CommandPool::new(device.clone(), device.queue_families().graphics)
            .step(step.name())?;
        let mut buffers = pool
            .allocate_command_buffers(framebuffers.len() as u32)
            .step(step.name())?;

        let extent = swapchain.extent();
        for (cmd, framebuffer) in buffers.iter_mut().zip(framebuffers) {
            cmd.begin().step(step.name())?;
            cmd.begin_render_pass(
                render_pass.handle(),
                framebuffer.handle(),
                extent,
                self.graphics.clear_color,
            );
            cmd.bind_pipeline(pipeline.pipeline.bind_point(), pipeline.pipeline.handle());
            cmd.bind_descriptor_sets(
                pipeline.pipeline.bind_point(),
                pipeline.layout.handle(),
                0,
                &[descriptors.set],
            );
            cmd.set_viewport(&full_viewport(extent));
            cmd.set_scissor(&full_rect(extent));
            cmd.bind_vertex_buffer(geometry.vertex_buffer.handle());
            cmd.bind_index_buffer(geometry.index_buffer.handle());
            record_draws(cmd, geometry.draw_ranges.iter().copied());
            cmd.end_render_pass();
            cmd.end().step(step.name())?;
        }

        debug!(
            "Recorded {} command buffer(s) with {} draw(s) each",
            buffers.len(),
            geometry.draw_ranges.len()
        );

        self.commands = Some(CommandResources {
            buffers,
            _pool: pool,
        });

        self.finish(step);
        Ok(())
    }

    pub fn create_sync_objects(&mut self) -> RendererResult<()> {
        let step = BootstrapStep::SyncObjects;
        self.phases.require(step)?;
        let device = required(&self.device, step)?;

        self.sync = Some(SyncObjects {
            image_acquired: Semaphore::new(device.clone()).step(step.name())?,
            render_complete: Semaphore::new(device.clone()).step(step.name())?,
        });

        self.finish(step);
        Ok(())
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Destroys every created resource in reverse creation order.
    ///
    /// Safe to call more than once and on a partially bootstrapped renderer.
    pub fn shutdown(&mut self) {
        let order = self.phases.teardown_order();
        if order.is_empty() {
            return;
        }

        if let Some(device) = &self.device
            && let Err(e) = device.wait_idle()
        {
            error!("Failed to wait for device idle during shutdown: {}", e);
        }

        for step in order {
            if let Err(e) = self.phases.mark_destroyed(step) {
                error!("Skipping teardown of {}: {}", step, e);
                continue;
            }
            self.release(step);
            debug!("Tore down {}", step);
        }

        info!("Renderer shut down");
    }

    fn release(&mut self, step: BootstrapStep) {
        match step {
            BootstrapStep::Instance => drop(self.instance.take()),
            BootstrapStep::Surface => drop(self.surface.take()),
            BootstrapStep::Device => drop(self.device.take()),
            BootstrapStep::Swapchain => drop(self.swapchain.take()),
            BootstrapStep::DepthBuffer => drop(self.depth_buffer.take()),
            BootstrapStep::UniformBuffer => drop(self.uniform_buffer.take()),
            BootstrapStep::Descriptors => drop(self.descriptors.take()),
            BootstrapStep::RenderPass => drop(self.render_pass.take()),
            BootstrapStep::Framebuffers => drop(self.framebuffers.take()),
            BootstrapStep::GeometryBuffers => drop(self.geometry.take()),
            BootstrapStep::Pipeline => drop(self.pipeline.take()),
            BootstrapStep::CommandBuffers => drop(self.commands.take()),
            BootstrapStep::SyncObjects => drop(self.sync.take()),
        }
    }

    /// Swapchain extent once created, else the configured window size.
    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain
            .as_ref()
            .map_or(self.window_extent, Swapchain::extent)
    }

    /// Aspect ratio used for the projection matrix.
    pub fn aspect_ratio(&self) -> f32 {
        let extent = self.extent();
        extent.width as f32 / extent.height.max(1) as f32
    }

    pub(crate) fn projection(&self) -> Mat4 {
        crate::ubo::vulkan_perspective(
            self.graphics.fov_y_degrees,
            self.aspect_ratio(),
            self.graphics.near,
            self.graphics.far,
        )
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Borrows a slot the phase tracker says is populated.
pub(crate) fn required<T>(slot: &Option<T>, step: BootstrapStep) -> RendererResult<&T> {
    slot.as_ref().ok_or_else(|| RendererError::Step {
        step: step.name(),
        source: RhiError::InvalidHandle(format!("{} resource slot is empty", step)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> Renderer {
        Renderer::new(&RendererConfig::default())
    }

    #[test]
    fn test_new_renderer_has_no_phases() {
        let renderer = renderer();
        assert!(renderer.phases().teardown_order().is_empty());
        assert_eq!(
            renderer.phases().first_missing(),
            Some(BootstrapStep::Instance)
        );
    }

    #[test]
    fn test_step_out_of_order_is_rejected_before_any_gpu_call() {
        let mut renderer = renderer();
        match renderer.create_device() {
            Err(RendererError::Precondition { step, missing }) => {
                assert_eq!(step, BootstrapStep::Device);
                assert_eq!(missing, BootstrapStep::Instance);
            }
            other => panic!("expected precondition error, got {other:?}"),
        }
        assert!(renderer.create_command_buffers().is_err());
        assert!(renderer.create_sync_objects().is_err());
    }

    #[test]
    fn test_extent_falls_back_to_window() {
        let renderer = renderer();
        assert_eq!(renderer.extent().width, 1280);
        assert_eq!(renderer.extent().height, 720);
        assert!((renderer.aspect_ratio() - 16.0 / 9.0).abs() < 1e-6);
    }

    #[test]
    fn test_shutdown_without_bootstrap_is_noop() {
        let mut renderer = renderer();
        renderer.shutdown();
        renderer.shutdown();
        assert!(renderer.instance.is_none());
    }

    #[test]
    fn test_shader_sources_name_the_missing_file() {
        let missing = Path::new("does/not/exist.vert.spv");
        let err = ShaderSources::from_files(missing, missing).unwrap_err();
        assert!(matches!(err, RhiError::ShaderError(_)));
        assert!(err.to_string().contains("exist.vert.spv"));
    }

    #[test]
    fn test_required_reports_empty_slot() {
        let slot: Option<u32> = None;
        let err = required(&slot, BootstrapStep::Pipeline).unwrap_err();
        assert!(err.to_string().starts_with("pipeline failed:"));
    }
}
