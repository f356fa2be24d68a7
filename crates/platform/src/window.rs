//! Window management using winit.
//!
//! [`Window`] is the renderer's surface collaborator: it implements
//! [`SurfaceProvider`] by asking `ash-window` for the platform's surface
//! extensions and for the surface itself.

use std::ffi::{CStr, CString};
use std::sync::Arc;

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::dpi::PhysicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window as WinitWindow, WindowAttributes};

use meshview_core::{Error, Result, WindowConfig};
use meshview_rhi::RhiError;
use meshview_rhi::surface::SurfaceProvider;

/// A winit window that can host a Vulkan surface.
///
/// The swapchain is never recreated, so the window is created non-resizable
/// at the configured size.
pub struct Window {
    window: Arc<WinitWindow>,
    width: u32,
    height: u32,
}

impl Window {
    pub fn new(event_loop: &ActiveEventLoop, config: &WindowConfig) -> Result<Self> {
        let attrs = WindowAttributes::default()
            .with_title(config.title.as_str())
            .with_inner_size(PhysicalSize::new(config.width, config.height))
            .with_resizable(false);

        let window = event_loop
            .create_window(attrs)
            .map_err(|e| Error::Window(e.to_string()))?;

        tracing::info!(
            "Window created: {}x{} \"{}\"",
            config.width,
            config.height,
            config.title
        );

        Ok(Self {
            window: Arc::new(window),
            width: config.width,
            height: config.height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }
}

impl SurfaceProvider for Window {
    fn required_instance_extensions(&self, debug_print: bool) -> meshview_rhi::RhiResult<Vec<CString>> {
        let display_handle = self
            .window
            .display_handle()
            .map_err(|e| RhiError::SurfaceError(format!("Failed to get display handle: {}", e)))?;

        let extensions = required_extensions(display_handle.as_raw())?;

        if debug_print {
            tracing::info!("Required Vulkan extensions for surface: {:?}", extensions);
        } else {
            tracing::debug!("Required Vulkan extensions for surface: {:?}", extensions);
        }

        Ok(extensions)
    }

    fn create_surface(
        &self,
        entry: &ash::Entry,
        instance: &ash::Instance,
    ) -> meshview_rhi::RhiResult<vk::SurfaceKHR> {
        let display_handle = self
            .window
            .display_handle()
            .map_err(|e| RhiError::SurfaceError(format!("Failed to get display handle: {}", e)))?;

        let window_handle = self
            .window
            .window_handle()
            .map_err(|e| RhiError::SurfaceError(format!("Failed to get window handle: {}", e)))?;

        // SAFETY: entry and instance are live for the duration of the call and
        // both handles come from this winit window. The caller takes ownership
        // of the returned surface and destroys it before the instance.
        let surface = unsafe {
            ash_window::create_surface(
                entry,
                instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| RhiError::SurfaceError(format!("Failed to create Vulkan surface: {}", e)))?
        };

        Ok(surface)
    }
}

/// Surface extensions `ash-window` reports for `display_handle`, as owned names.
pub fn required_extensions(
    display_handle: raw_window_handle::RawDisplayHandle,
) -> meshview_rhi::RhiResult<Vec<CString>> {
    let extensions = ash_window::enumerate_required_extensions(display_handle).map_err(|e| {
        RhiError::SurfaceError(format!("Failed to enumerate required extensions: {}", e))
    })?;

    Ok(extensions
        .iter()
        // SAFETY: ash-window returns pointers to static, null-terminated
        // extension name constants.
        .map(|&ext| unsafe { CStr::from_ptr(ext) }.to_owned())
        .collect())
}
