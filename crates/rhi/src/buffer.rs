//! GPU buffer management.
//!
//! Buffers own their `VkDeviceMemory` directly. The memory type is chosen
//! explicitly from the adapter's memory properties (see [`crate::memory`]).
//!
//! - Vertex and index buffers live in device-local memory that the host can
//!   also map. They are written once at creation: map, copy, unmap.
//! - Uniform buffers are host-visible and coherent and stay mapped for the
//!   buffer's whole life, so updates are plain memory writes.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use meshview_rhi::device::Device;
//! use meshview_rhi::buffer::{Buffer, BufferUsage};
//!
//! # fn example(device: Arc<Device>) -> Result<(), meshview_rhi::RhiError> {
//! let indices: [u32; 3] = [0, 1, 2];
//! let index_buffer = Buffer::new_with_data(device, BufferUsage::Index, bytemuck::cast_slice(&indices))?;
//! # Ok(())
//! # }
//! ```

use std::ptr::NonNull;
use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::{RhiError, RhiResult};
use crate::memory::DeviceMemory;

/// Intended use of a buffer; decides usage flags and memory properties.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferUsage {
    /// Vertex buffer, written once
    Vertex,
    /// Index buffer, written once
    Index,
    /// Uniform buffer, persistently mapped
    Uniform,
}

impl BufferUsage {
    /// Converts to Vulkan buffer usage flags.
    pub fn to_vk_usage(self) -> vk::BufferUsageFlags {
        match self {
            BufferUsage::Vertex => vk::BufferUsageFlags::VERTEX_BUFFER,
            BufferUsage::Index => vk::BufferUsageFlags::INDEX_BUFFER,
            BufferUsage::Uniform => vk::BufferUsageFlags::UNIFORM_BUFFER,
        }
    }

    /// Memory property sets to try, most preferred first.
    ///
    /// Geometry requires device-local memory that is also host-visible, since
    /// it is filled by a host map. There is no fallback: an adapter without such
    /// a type fails with [`RhiError::NoSuitableMemoryType`].
    pub fn memory_candidates(self) -> &'static [vk::MemoryPropertyFlags] {
        const HOST: vk::MemoryPropertyFlags = vk::MemoryPropertyFlags::from_raw(
            vk::MemoryPropertyFlags::HOST_VISIBLE.as_raw()
                | vk::MemoryPropertyFlags::HOST_COHERENT.as_raw(),
        );
        const DEVICE_HOST: vk::MemoryPropertyFlags = vk::MemoryPropertyFlags::from_raw(
            HOST.as_raw() | vk::MemoryPropertyFlags::DEVICE_LOCAL.as_raw(),
        );
        match self {
            BufferUsage::Vertex | BufferUsage::Index => &[DEVICE_HOST],
            BufferUsage::Uniform => &[HOST],
        }
    }

    /// Whether the buffer stays mapped after creation.
    pub fn is_persistently_mapped(self) -> bool {
        matches!(self, BufferUsage::Uniform)
    }

    /// Returns a human-readable name for the buffer type.
    pub fn name(self) -> &'static str {
        match self {
            BufferUsage::Vertex => "vertex",
            BufferUsage::Index => "index",
            BufferUsage::Uniform => "uniform",
        }
    }
}

/// GPU buffer with its own memory allocation.
pub struct Buffer {
    device: Arc<Device>,
    buffer: vk::Buffer,
    memory: DeviceMemory,
    size: vk::DeviceSize,
    usage: BufferUsage,
    /// Host pointer for persistently mapped buffers
    mapped: Option<NonNull<u8>>,
}

impl Buffer {
    /// Creates a buffer of `size` bytes, allocates and binds its memory.
    ///
    /// Uniform buffers are mapped here and stay mapped until drop.
    ///
    /// # Errors
    ///
    /// [`RhiError::NoSuitableMemoryType`] if no memory type satisfies the
    /// usage's [`BufferUsage::memory_candidates`], otherwise the Vulkan error
    /// from creation, allocation, binding or mapping. The buffer handle is
    /// destroyed before an allocation error is returned.
    pub fn new(device: Arc<Device>, usage: BufferUsage, size: vk::DeviceSize) -> RhiResult<Self> {
        // Zero-sized buffers are invalid; an empty scene still gets a minimal buffer.
        let size = size.max(4);

        let buffer_info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage.to_vk_usage())
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { device.handle().create_buffer(&buffer_info, None)? };

        let memory = match Self::allocate_and_bind(&device, buffer, usage) {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.handle().destroy_buffer(buffer, None) };
                return Err(e);
            }
        };

        let mut this = Self {
            device,
            buffer,
            memory,
            size,
            usage,
            mapped: None,
        };

        if usage.is_persistently_mapped() {
            this.mapped = Some(this.map()?);
        }

        debug!("Created {} buffer: {} bytes", usage.name(), size);
        Ok(this)
    }

    /// Creates a buffer and fills it with `data` through a single map/copy/unmap.
    pub fn new_with_data(device: Arc<Device>, usage: BufferUsage, data: &[u8]) -> RhiResult<Self> {
        let buffer = Self::new(device, usage, data.len() as vk::DeviceSize)?;

        if buffer.mapped.is_some() {
            buffer.write(0, data)?;
        } else if !data.is_empty() {
            let ptr = buffer.map()?;
            unsafe {
                std::ptr::copy_nonoverlapping(data.as_ptr(), ptr.as_ptr(), data.len());
                buffer.device.handle().unmap_memory(buffer.memory.handle());
            }
        }

        Ok(buffer)
    }

    /// Writes `data` at `offset` through the persistent mapping.
    ///
    /// Memory is host-coherent, so no flush follows.
    ///
    /// # Errors
    ///
    /// Fails if the buffer is not persistently mapped or the write would run
    /// past its end.
    pub fn write(&self, offset: vk::DeviceSize, data: &[u8]) -> RhiResult<()> {
        check_bounds(offset, data.len() as vk::DeviceSize, self.size)?;

        let mapped = self.mapped.ok_or_else(|| {
            RhiError::InvalidHandle(format!("{} buffer is not mapped", self.usage.name()))
        })?;

        unsafe {
            let dst = mapped.as_ptr().add(offset as usize);
            std::ptr::copy_nonoverlapping(data.as_ptr(), dst, data.len());
        }
        Ok(())
    }

    #[inline]
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    fn allocate_and_bind(
        device: &Arc<Device>,
        buffer: vk::Buffer,
        usage: BufferUsage,
    ) -> RhiResult<DeviceMemory> {
        let requirements = unsafe { device.handle().get_buffer_memory_requirements(buffer) };
        let memory =
            DeviceMemory::allocate_preferred(device.clone(), requirements, usage.memory_candidates())?;
        unsafe {
            device
                .handle()
                .bind_buffer_memory(buffer, memory.handle(), 0)?;
        }
        Ok(memory)
    }

    fn map(&self) -> RhiResult<NonNull<u8>> {
        let ptr = unsafe {
            self.device.handle().map_memory(
                self.memory.handle(),
                0,
                vk::WHOLE_SIZE,
                vk::MemoryMapFlags::empty(),
            )?
        };
        NonNull::new(ptr.cast::<u8>())
            .ok_or_else(|| RhiError::InvalidHandle("vkMapMemory returned null".to_string()))
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            if self.mapped.take().is_some() {
                self.device.handle().unmap_memory(self.memory.handle());
            }
            self.device.handle().destroy_buffer(self.buffer, None);
        }
        debug!("Destroyed {} buffer", self.usage.name());
        // `memory` is freed after this body returns.
    }
}

/// Rejects writes of `len` bytes at `offset` that do not fit in `capacity`.
fn check_bounds(offset: vk::DeviceSize, len: vk::DeviceSize, capacity: vk::DeviceSize) -> RhiResult<()> {
    match offset.checked_add(len) {
        Some(end) if end <= capacity => Ok(()),
        _ => Err(RhiError::BufferOverflow {
            offset,
            size: len,
            capacity,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::pick_memory_type;

    #[test]
    fn test_buffer_usage_to_vk_usage() {
        assert_eq!(
            BufferUsage::Vertex.to_vk_usage(),
            vk::BufferUsageFlags::VERTEX_BUFFER
        );
        assert_eq!(
            BufferUsage::Index.to_vk_usage(),
            vk::BufferUsageFlags::INDEX_BUFFER
        );
        assert_eq!(
            BufferUsage::Uniform.to_vk_usage(),
            vk::BufferUsageFlags::UNIFORM_BUFFER
        );
    }

    #[test]
    fn test_uniform_memory_is_host_coherent() {
        let candidates = BufferUsage::Uniform.memory_candidates();
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].contains(
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT
        ));
    }

    #[test]
    fn test_geometry_memory_is_device_local_and_mappable() {
        for usage in [BufferUsage::Vertex, BufferUsage::Index] {
            let candidates = usage.memory_candidates();
            assert_eq!(candidates.len(), 1, "{} buffer has a fallback", usage.name());
            assert!(candidates[0].contains(
                vk::MemoryPropertyFlags::DEVICE_LOCAL | vk::MemoryPropertyFlags::HOST_VISIBLE
            ));
        }
    }

    #[test]
    fn test_geometry_without_device_local_memory_has_no_match() {
        let mut props = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: 1,
            ..Default::default()
        };
        props.memory_types[0].property_flags =
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;

        assert!(pick_memory_type(&props, 0b1, BufferUsage::Vertex.memory_candidates()).is_none());
        assert!(pick_memory_type(&props, 0b1, BufferUsage::Uniform.memory_candidates()).is_some());
    }

    #[test]
    fn test_only_uniform_is_persistently_mapped() {
        assert!(BufferUsage::Uniform.is_persistently_mapped());
        assert!(!BufferUsage::Vertex.is_persistently_mapped());
        assert!(!BufferUsage::Index.is_persistently_mapped());
    }

    #[test]
    fn test_check_bounds() {
        assert!(check_bounds(0, 192, 192).is_ok());
        assert!(check_bounds(64, 128, 192).is_ok());
        assert!(matches!(
            check_bounds(64, 129, 192),
            Err(RhiError::BufferOverflow { offset: 64, size: 129, capacity: 192 })
        ));
        assert!(check_bounds(u64::MAX, 1, 192).is_err());
    }
}
