//! Presentable surfaces and the contract for whoever can create them.
//!
//! The windowing layer stays outside this crate. It is consumed only through
//! [`SurfaceProvider`], which answers two questions: which instance extensions
//! a surface needs, and how to create one for a given instance.

use std::ffi::CString;

use ash::vk;
use tracing::{debug, info};

use crate::error::RhiResult;
use crate::instance::Instance;

/// Anything that can produce a `VkSurfaceKHR` for a Vulkan instance.
pub trait SurfaceProvider {
    /// Instance extensions required to create a surface on this platform.
    ///
    /// With `debug_print` set the implementation logs the list it returns.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform has no Vulkan surface support.
    fn required_instance_extensions(&self, debug_print: bool) -> RhiResult<Vec<CString>>;

    /// Create a raw surface. Ownership passes to the caller.
    ///
    /// # Safety
    ///
    /// Not `unsafe` to call, but the implementation must keep the native
    /// window alive for as long as the returned surface exists.
    ///
    /// # Errors
    ///
    /// Returns an error if surface creation fails.
    fn create_surface(
        &self,
        entry: &ash::Entry,
        instance: &ash::Instance,
    ) -> RhiResult<vk::SurfaceKHR>;
}

/// RAII wrapper for a Vulkan surface.
///
/// The owning [`Instance`] must outlive this value.
pub struct Surface {
    handle: vk::SurfaceKHR,
    loader: ash::khr::surface::Instance,
}

impl Surface {
    /// Ask `provider` for a surface on `instance` and take ownership of it.
    ///
    /// # Errors
    ///
    /// Returns whatever [`SurfaceProvider::create_surface`] returns.
    pub fn create(instance: &Instance, provider: &dyn SurfaceProvider) -> RhiResult<Self> {
        let handle = provider.create_surface(instance.entry(), instance.handle())?;
        let loader = ash::khr::surface::Instance::new(instance.entry(), instance.handle());
        info!("Vulkan surface created");
        Ok(Self { handle, loader })
    }

    /// Get the raw Vulkan surface handle.
    #[inline]
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.handle
    }

    /// Surface extension loader, for capability/format/present-mode queries.
    #[inline]
    pub fn loader(&self) -> &ash::khr::surface::Instance {
        &self.loader
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        unsafe {
            self.loader.destroy_surface(self.handle, None);
        }
        debug!("Vulkan surface destroyed");
    }
}
