//! Vulkan logical device and queue management.
//!
//! [`Device`] owns the logical device, one queue per unique queue family, and
//! a copy of the adapter's memory properties for explicit memory-type
//! selection. It is shared as `Arc<Device>` by every resource that needs to
//! destroy itself.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, error, info};

use crate::error::RhiResult;
use crate::instance::Instance;
use crate::physical_device::{PhysicalDeviceInfo, QueueFamilies, REQUIRED_DEVICE_EXTENSIONS};

/// Vulkan logical device wrapper.
///
/// Dropping the device waits for it to go idle first, so it must be the last
/// owner of GPU work. Every resource wrapper holds an `Arc<Device>` to keep
/// that true.
pub struct Device {
    /// Vulkan logical device (ash wrapper).
    device: ash::Device,
    /// Adapter the device was created on.
    physical_device: vk::PhysicalDevice,
    /// Memory heaps and types, copied at creation.
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    /// Queue 0 of the graphics family.
    graphics_queue: vk::Queue,
    /// Queue 0 of the present family. Same handle as `graphics_queue` when
    /// the families coincide.
    present_queue: vk::Queue,
    /// Resolved family indices.
    queue_families: QueueFamilies,
}

impl Device {
    /// Creates the logical device and retrieves its queues.
    ///
    /// One queue (priority 1.0) is requested per unique family, so a device
    /// whose graphics family also presents gets a single queue. Only the
    /// swapchain extension and no optional features are enabled.
    ///
    /// # Arguments
    ///
    /// * `instance` - The Vulkan instance the adapter was enumerated from
    /// * `physical_device_info` - The adapter picked by
    ///   [`select_physical_device`](crate::physical_device::select_physical_device)
    ///
    /// # Errors
    ///
    /// Returns an error if `vkCreateDevice` fails, for example when an
    /// extension went missing between selection and creation.
    pub fn new(
        instance: &Instance,
        physical_device_info: &PhysicalDeviceInfo,
    ) -> RhiResult<Arc<Self>> {
        let queue_families = physical_device_info.queue_families;
        let unique_families = queue_families.unique();
        let queue_priorities = [1.0f32];

        let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = unique_families
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(&queue_priorities)
            })
            .collect();

        debug!(
            "Creating {} queue(s) for families: {:?}",
            queue_create_infos.len(),
            unique_families
        );

        let extension_names: Vec<*const std::ffi::c_char> = REQUIRED_DEVICE_EXTENSIONS
            .iter()
            .map(|ext| ext.as_ptr())
            .collect();

        let features = vk::PhysicalDeviceFeatures::default();

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_names)
            .enabled_features(&features);

        let device = unsafe {
            instance
                .handle()
                .create_device(physical_device_info.device, &create_info, None)?
        };

        info!(
            "Logical device created with {} extension(s)",
            REQUIRED_DEVICE_EXTENSIONS.len()
        );

        let graphics_queue = unsafe { device.get_device_queue(queue_families.graphics, 0) };
        let present_queue = unsafe { device.get_device_queue(queue_families.present, 0) };
        debug!(
            "Queues retrieved: graphics family {}, present family {}",
            queue_families.graphics, queue_families.present
        );

        Ok(Arc::new(Self {
            device,
            physical_device: physical_device_info.device,
            memory_properties: physical_device_info.memory_properties,
            graphics_queue,
            present_queue,
            queue_families,
        }))
    }

    /// Returns the Vulkan logical device handle.
    #[inline]
    pub fn handle(&self) -> &ash::Device {
        &self.device
    }

    /// Returns the physical device this device was created on.
    #[inline]
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    #[inline]
    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    #[inline]
    pub fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }

    /// Returns the graphics and present queue family indices.
    #[inline]
    pub fn queue_families(&self) -> QueueFamilies {
        self.queue_families
    }

    /// Returns the memory properties used for memory-type selection.
    #[inline]
    pub fn memory_properties(&self) -> &vk::PhysicalDeviceMemoryProperties {
        &self.memory_properties
    }

    /// Blocks until every queue on the device is idle.
    ///
    /// # Errors
    ///
    /// Returns an error if the wait fails, typically `ERROR_DEVICE_LOST`.
    pub fn wait_idle(&self) -> RhiResult<()> {
        unsafe { self.device.device_wait_idle()? };
        Ok(())
    }

    /// Blocks until `queue` is idle.
    ///
    /// # Errors
    ///
    /// Returns an error if the wait fails, typically `ERROR_DEVICE_LOST`.
    pub fn queue_wait_idle(&self, queue: vk::Queue) -> RhiResult<()> {
        unsafe { self.device.queue_wait_idle(queue)? };
        Ok(())
    }

    /// Submits command buffers to the graphics queue.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    /// - All command buffers are valid and recorded
    /// - Semaphores referenced by `submit_infos` are in a valid state
    /// - The fence (if not null) is unsignaled and not in use
    ///
    /// # Arguments
    ///
    /// * `submit_infos` - Slice of submit info structures
    /// * `fence` - Fence to signal on completion, or `vk::Fence::null()`
    ///
    /// # Errors
    ///
    /// Returns an error if submission fails.
    pub unsafe fn submit_graphics(
        &self,
        submit_infos: &[vk::SubmitInfo],
        fence: vk::Fence,
    ) -> RhiResult<()> {
        unsafe {
            self.device
                .queue_submit(self.graphics_queue, submit_infos, fence)?;
        }
        Ok(())
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = self.device.device_wait_idle() {
                error!("Failed to wait for device idle during drop: {:?}", e);
            }
            self.device.destroy_device(None);
        }
        info!("Logical device destroyed");
    }
}

// Safety: ash::Device is Send+Sync and the remaining fields are plain handles
// or POD structs.
unsafe impl Send for Device {}
unsafe impl Sync for Device {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Device>();
    }
}
