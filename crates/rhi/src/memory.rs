//! Explicit memory-type selection and device memory ownership.
//!
//! Selection follows one rule: the first memory type allowed by the
//! resource's `memoryTypeBits` whose property flags are a superset of the
//! requested flags. There is no scoring by heap size.

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Returns the first memory type that `type_bits` allows and whose property
/// flags contain every flag in `required`.
pub fn find_memory_type(
    properties: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    required: vk::MemoryPropertyFlags,
) -> Option<u32> {
    (0..properties.memory_type_count).find(|&i| {
        type_bits & (1 << i) != 0
            && properties.memory_types[i as usize]
                .property_flags
                .contains(required)
    })
}

/// Tries each flag set in `candidates` in order and returns the first memory
/// type that satisfies one of them, together with the flags that matched.
pub fn pick_memory_type(
    properties: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    candidates: &[vk::MemoryPropertyFlags],
) -> Option<(u32, vk::MemoryPropertyFlags)> {
    candidates.iter().find_map(|&flags| {
        find_memory_type(properties, type_bits, flags).map(|index| (index, flags))
    })
}

/// A `VkDeviceMemory` allocation that frees itself on drop.
///
/// Declare it after the buffer or image bound to it so the resource is
/// destroyed first.
pub struct DeviceMemory {
    device: Arc<Device>,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
}

impl DeviceMemory {
    /// Allocates memory satisfying `requirements` with at least the `flags` properties.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::NoSuitableMemoryType`] if no memory type matches,
    /// or the Vulkan error if `vkAllocateMemory` fails.
    pub fn allocate(
        device: Arc<Device>,
        requirements: vk::MemoryRequirements,
        flags: vk::MemoryPropertyFlags,
    ) -> RhiResult<Self> {
        Self::allocate_preferred(device, requirements, &[flags])
    }

    /// Like [`DeviceMemory::allocate`], trying each flag set of `candidates` in order.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::NoSuitableMemoryType`] listing every candidate if
    /// none matches, or the Vulkan error if `vkAllocateMemory` fails.
    pub fn allocate_preferred(
        device: Arc<Device>,
        requirements: vk::MemoryRequirements,
        candidates: &[vk::MemoryPropertyFlags],
    ) -> RhiResult<Self> {
        let (type_index, flags) = pick_memory_type(
            device.memory_properties(),
            requirements.memory_type_bits,
            candidates,
        )
        .ok_or_else(|| RhiError::NoSuitableMemoryType(format!("{:?}", candidates)))?;

        let alloc_info = vk::MemoryAllocateInfo::default()
            .allocation_size(requirements.size)
            .memory_type_index(type_index);

        let memory = unsafe { device.handle().allocate_memory(&alloc_info, None)? };

        debug!(
            "Allocated {} bytes from memory type {} ({:?})",
            requirements.size, type_index, flags
        );

        Ok(Self {
            device,
            memory,
            size: requirements.size,
        })
    }

    /// Returns the Vulkan device memory handle.
    #[inline]
    pub fn handle(&self) -> vk::DeviceMemory {
        self.memory
    }
}

impl Drop for DeviceMemory {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().free_memory(self.memory, None);
        }
        debug!("Freed {} bytes of device memory", self.size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn properties(flags: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut props = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: flags.len() as u32,
            ..Default::default()
        };
        for (slot, &property_flags) in props.memory_types.iter_mut().zip(flags) {
            slot.property_flags = property_flags;
        }
        props
    }

    #[test]
    fn test_first_superset_wins() {
        let props = properties(&[
            vk::MemoryPropertyFlags::HOST_VISIBLE,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            vk::MemoryPropertyFlags::DEVICE_LOCAL
                | vk::MemoryPropertyFlags::HOST_VISIBLE
                | vk::MemoryPropertyFlags::HOST_COHERENT,
        ]);

        let host = vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
        assert_eq!(find_memory_type(&props, 0b1111, host), Some(2));
        assert_eq!(
            find_memory_type(&props, 0b1111, vk::MemoryPropertyFlags::DEVICE_LOCAL),
            Some(1)
        );
    }

    #[test]
    fn test_type_bits_filter_candidates() {
        let props = properties(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        ]);
        assert_eq!(
            find_memory_type(&props, 0b10, vk::MemoryPropertyFlags::DEVICE_LOCAL),
            Some(1)
        );
    }

    #[test]
    fn test_no_match() {
        let props = properties(&[vk::MemoryPropertyFlags::DEVICE_LOCAL]);
        assert_eq!(
            find_memory_type(&props, 0b1, vk::MemoryPropertyFlags::HOST_VISIBLE),
            None
        );
        // Allowed by flags but excluded by type bits.
        assert_eq!(
            find_memory_type(&props, 0b0, vk::MemoryPropertyFlags::DEVICE_LOCAL),
            None
        );
    }

    #[test]
    fn test_types_beyond_count_are_ignored() {
        let mut props = properties(&[vk::MemoryPropertyFlags::HOST_VISIBLE]);
        props.memory_types[1].property_flags = vk::MemoryPropertyFlags::DEVICE_LOCAL;
        assert_eq!(
            find_memory_type(&props, u32::MAX, vk::MemoryPropertyFlags::DEVICE_LOCAL),
            None
        );
    }

    #[test]
    fn test_pick_falls_back_to_later_candidate() {
        let props = properties(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        ]);
        let host = vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
        let candidates = [vk::MemoryPropertyFlags::DEVICE_LOCAL | host, host];
        assert_eq!(
            pick_memory_type(&props, 0b11, &candidates),
            Some((1, host))
        );
    }

    #[test]
    fn test_pick_prefers_earlier_candidate() {
        let host = vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
        let props = properties(&[host, vk::MemoryPropertyFlags::DEVICE_LOCAL | host]);
        let candidates = [vk::MemoryPropertyFlags::DEVICE_LOCAL | host, host];
        assert_eq!(
            pick_memory_type(&props, 0b11, &candidates),
            Some((1, candidates[0]))
        );
    }

    #[test]
    fn test_empty_requirement_takes_first_allowed() {
        let props = properties(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::HOST_VISIBLE,
        ]);
        assert_eq!(
            find_memory_type(&props, 0b10, vk::MemoryPropertyFlags::empty()),
            Some(1)
        );
    }
}
