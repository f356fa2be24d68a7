//! Descriptor set management for shader resource binding.
//!
//! - [`DescriptorSetLayout`] describes the shader bindings
//! - [`DescriptorPool`] sizes a pool for a set of layouts and allocates from it
//! - [`write_uniform_buffer`] points a set binding at a uniform buffer
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ash::vk;
//! use meshview_rhi::device::Device;
//! use meshview_rhi::descriptor::{uniform_buffer_binding, DescriptorPool, DescriptorSetLayout};
//!
//! # fn example(device: Arc<Device>) -> Result<(), meshview_rhi::RhiError> {
//! let bindings = [uniform_buffer_binding(0, vk::ShaderStageFlags::VERTEX)];
//! let layout = DescriptorSetLayout::new(device.clone(), &bindings)?;
//! let pool = DescriptorPool::for_bindings(device, 1, &bindings)?;
//! let sets = pool.allocate(&[layout.handle()])?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::RhiResult;

/// Descriptor set layout wrapper.
///
/// The layout must outlive every pipeline layout and descriptor set created
/// from it.
pub struct DescriptorSetLayout {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan descriptor set layout handle.
    layout: vk::DescriptorSetLayout,
}

impl DescriptorSetLayout {
    /// Creates a new descriptor set layout from `bindings`.
    ///
    /// # Arguments
    ///
    /// * `device` - The logical device
    /// * `bindings` - One entry per shader binding, see [`uniform_buffer_binding`]
    ///
    /// # Errors
    ///
    /// Returns an error if layout creation fails.
    pub fn new(
        device: Arc<Device>,
        bindings: &[vk::DescriptorSetLayoutBinding],
    ) -> RhiResult<Self> {
        let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(bindings);

        let layout = unsafe {
            device
                .handle()
                .create_descriptor_set_layout(&create_info, None)?
        };

        debug!(
            "Created descriptor set layout with {} binding(s)",
            bindings.len()
        );

        Ok(Self { device, layout })
    }

    /// Returns the Vulkan descriptor set layout handle.
    #[inline]
    pub fn handle(&self) -> vk::DescriptorSetLayout {
        self.layout
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_descriptor_set_layout(self.layout, None);
        }
        debug!("Destroyed descriptor set layout");
    }
}

/// Descriptor pool. Sets allocated from it are released when the pool is destroyed.
///
/// The pool is created without `FREE_DESCRIPTOR_SET`, so sets are never
/// returned one at a time.
pub struct DescriptorPool {
    device: Arc<Device>,
    pool: vk::DescriptorPool,
}

impl DescriptorPool {
    /// Creates a new descriptor pool.
    ///
    /// # Arguments
    ///
    /// * `device` - The logical device
    /// * `max_sets` - Maximum number of sets that can be allocated
    /// * `pool_sizes` - Descriptor counts per type, see [`pool_sizes_for`]
    ///
    /// # Errors
    ///
    /// Returns an error if pool creation fails.
    pub fn new(
        device: Arc<Device>,
        max_sets: u32,
        pool_sizes: &[vk::DescriptorPoolSize],
    ) -> RhiResult<Self> {
        let create_info = vk::DescriptorPoolCreateInfo::default()
            .max_sets(max_sets)
            .pool_sizes(pool_sizes);

        let pool = unsafe { device.handle().create_descriptor_pool(&create_info, None)? };

        debug!(
            "Created descriptor pool: max_sets={}, pool_sizes={}",
            max_sets,
            pool_sizes.len()
        );

        Ok(Self { device, pool })
    }

    /// Creates a pool large enough for `set_count` sets shaped like `bindings`.
    ///
    /// # Errors
    ///
    /// Returns an error if pool creation fails.
    pub fn for_bindings(
        device: Arc<Device>,
        set_count: u32,
        bindings: &[vk::DescriptorSetLayoutBinding],
    ) -> RhiResult<Self> {
        let sizes = pool_sizes_for(bindings, set_count);
        Self::new(device, set_count, &sizes)
    }

    /// Allocates one descriptor set per entry of `layouts`.
    ///
    /// # Errors
    ///
    /// Returns `ERROR_OUT_OF_POOL_MEMORY` if the pool was sized for fewer sets
    /// or descriptors, or an out-of-memory error.
    pub fn allocate(
        &self,
        layouts: &[vk::DescriptorSetLayout],
    ) -> RhiResult<Vec<vk::DescriptorSet>> {
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.pool)
            .set_layouts(layouts);

        let sets = unsafe { self.device.handle().allocate_descriptor_sets(&alloc_info)? };

        debug!("Allocated {} descriptor set(s)", sets.len());

        Ok(sets)
    }

    /// Returns the Vulkan descriptor pool handle.
    #[inline]
    pub fn handle(&self) -> vk::DescriptorPool {
        self.pool
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_descriptor_pool(self.pool, None);
        }
        debug!("Destroyed descriptor pool");
    }
}

/// A single uniform buffer binding visible to `stage_flags`.
#[inline]
pub fn uniform_buffer_binding(
    binding: u32,
    stage_flags: vk::ShaderStageFlags,
) -> vk::DescriptorSetLayoutBinding<'static> {
    vk::DescriptorSetLayoutBinding::default()
        .binding(binding)
        .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
        .descriptor_count(1)
        .stage_flags(stage_flags)
}

/// Pool sizes covering `set_count` copies of `bindings`, one entry per descriptor type.
pub fn pool_sizes_for(
    bindings: &[vk::DescriptorSetLayoutBinding],
    set_count: u32,
) -> Vec<vk::DescriptorPoolSize> {
    let mut sizes: Vec<vk::DescriptorPoolSize> = Vec::new();
    for binding in bindings {
        let count = binding.descriptor_count * set_count;
        match sizes
            .iter_mut()
            .find(|size| size.ty == binding.descriptor_type)
        {
            Some(size) => size.descriptor_count += count,
            None => sizes.push(
                vk::DescriptorPoolSize::default()
                    .ty(binding.descriptor_type)
                    .descriptor_count(count),
            ),
        }
    }
    sizes
}

/// Points `binding` of `set` at the first `range` bytes of `buffer`.
///
/// # Safety
///
/// Not `unsafe` to call, but the caller must ensure `set` is not bound in a
/// command buffer that is pending execution, and that `buffer` outlives
/// every use of `set`.
pub fn write_uniform_buffer(
    device: &Device,
    set: vk::DescriptorSet,
    binding: u32,
    buffer: vk::Buffer,
    range: vk::DeviceSize,
) {
    let buffer_infos = [vk::DescriptorBufferInfo::default()
        .buffer(buffer)
        .offset(0)
        .range(range)];

    let write = vk::WriteDescriptorSet::default()
        .dst_set(set)
        .dst_binding(binding)
        .dst_array_element(0)
        .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
        .buffer_info(&buffer_infos);

    unsafe {
        device.handle().update_descriptor_sets(&[write], &[]);
    }

    debug!("Bound {}-byte uniform buffer to binding {}", range, binding);
}
