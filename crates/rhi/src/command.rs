//! Command pool and command buffer management.
//!
//! - [`CommandPool`] owns a VkCommandPool for one queue family
//! - [`CommandBuffer`] is a recording facade over a pool-owned VkCommandBuffer
//!
//! Command buffers here are recorded once and replayed on every present, so
//! [`CommandBuffer::begin`] uses no usage flags.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use meshview_rhi::device::Device;
//! use meshview_rhi::command::CommandPool;
//!
//! # fn example(device: Arc<Device>) -> Result<(), meshview_rhi::RhiError> {
//! let pool = CommandPool::new(device.clone(), device.queue_families().graphics)?;
//! let buffers = pool.allocate_command_buffers(3)?;
//! for cmd in &buffers {
//!     cmd.begin()?;
//!     // ... record ...
//!     cmd.end()?;
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use crate::device::Device;
use crate::error::RhiResult;

/// Vulkan command pool wrapper.
///
/// A pool allocates command buffers that may only be submitted to queues of
/// its queue family. Buffers allocated from the pool are freed with it, so
/// the pool must outlive every [`CommandBuffer`] it handed out.
///
/// # Thread Safety
///
/// Command pools are externally synchronized. Record from one thread at a time.
pub struct CommandPool {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan command pool handle.
    pool: vk::CommandPool,
    /// Queue family index this pool belongs to. Only logged.
    queue_family_index: u32,
}

impl CommandPool {
    /// Creates a pool for `queue_family_index`.
    ///
    /// No create flags are set: buffers are recorded once and never
    /// individually reset.
    ///
    /// # Arguments
    ///
    /// * `device` - The logical device
    /// * `queue_family_index` - The queue family the buffers will be submitted to
    ///
    /// # Errors
    ///
    /// Returns an error if command pool creation fails.
    pub fn new(device: Arc<Device>, queue_family_index: u32) -> RhiResult<Self> {
        let create_info =
            vk::CommandPoolCreateInfo::default().queue_family_index(queue_family_index);

        let pool = unsafe { device.handle().create_command_pool(&create_info, None)? };

        info!(
            "Command pool created for queue family {}",
            queue_family_index
        );

        Ok(Self {
            device,
            pool,
            queue_family_index,
        })
    }

    /// Returns the Vulkan command pool handle.
    #[inline]
    pub fn handle(&self) -> vk::CommandPool {
        self.pool
    }

    /// Allocates `count` primary command buffers from this pool.
    ///
    /// The returned wrappers do not free their handles; see [`CommandBuffer`].
    ///
    /// # Errors
    ///
    /// Returns an error if allocation fails, typically out of host or device memory.
    pub fn allocate_command_buffers(&self, count: u32) -> RhiResult<Vec<CommandBuffer>> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        let handles = unsafe { self.device.handle().allocate_command_buffers(&alloc_info)? };

        debug!("Allocated {} primary command buffer(s)", handles.len());

        Ok(handles
            .into_iter()
            .map(|buffer| CommandBuffer::from_handle(self.device.clone(), buffer))
            .collect())
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_command_pool(self.pool, None);
        }
        debug!(
            "Command pool destroyed for queue family {}",
            self.queue_family_index
        );
    }
}

/// Vulkan command buffer wrapper.
///
/// Does NOT own the VkCommandBuffer; the handle is freed when the owning
/// [`CommandPool`] is destroyed.
///
/// Recording methods other than [`begin`](Self::begin) and
/// [`end`](Self::end) return nothing: `vkCmd*` calls cannot fail, errors
/// surface at `vkEndCommandBuffer` or submission.
pub struct CommandBuffer {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Pool-owned command buffer handle.
    buffer: vk::CommandBuffer,
}

impl CommandBuffer {
    /// Wraps a handle allocated from a pool on `device`.
    ///
    /// # Safety
    ///
    /// Not `unsafe` to call, but the caller must ensure `buffer` was allocated
    /// from a pool on `device` and that the pool outlives this wrapper.
    #[inline]
    pub fn from_handle(device: Arc<Device>, buffer: vk::CommandBuffer) -> Self {
        Self { device, buffer }
    }

    /// Returns the Vulkan command buffer handle.
    #[inline]
    pub fn handle(&self) -> vk::CommandBuffer {
        self.buffer
    }

    // =========================================================================
    // Recording Control
    // =========================================================================

    /// Begins recording.
    ///
    /// No usage flags are set, so the buffer may be submitted any number of
    /// times but not while a previous submission is still pending.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is already recording or out of memory.
    pub fn begin(&self) -> RhiResult<()> {
        let begin_info = vk::CommandBufferBeginInfo::default();

        unsafe {
            self.device
                .handle()
                .begin_command_buffer(self.buffer, &begin_info)?;
        }

        Ok(())
    }

    /// Ends recording.
    ///
    /// # Errors
    ///
    /// Returns an error if any recorded command ran out of memory.
    pub fn end(&self) -> RhiResult<()> {
        unsafe {
            self.device.handle().end_command_buffer(self.buffer)?;
        }

        Ok(())
    }

    // =========================================================================
    // Render Pass
    // =========================================================================

    /// Begins `render_pass` on `framebuffer` covering the whole `extent`,
    /// clearing color to `clear_color` and depth to 1.0.
    ///
    /// # Arguments
    ///
    /// * `render_pass` - A color + depth render pass
    /// * `framebuffer` - Framebuffer compatible with `render_pass`
    /// * `extent` - Render area, normally the swapchain extent
    /// * `clear_color` - Linear RGBA clear color
    pub fn begin_render_pass(
        &self,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
        clear_color: [f32; 4],
    ) {
        let clear_values = render_pass_clear_values(clear_color);

        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(render_pass)
            .framebuffer(framebuffer)
            .render_area(full_rect(extent))
            .clear_values(&clear_values);

        unsafe {
            self.device.handle().cmd_begin_render_pass(
                self.buffer,
                &begin_info,
                vk::SubpassContents::INLINE,
            );
        }
    }

    /// Ends the current render pass.
    pub fn end_render_pass(&self) {
        unsafe {
            self.device.handle().cmd_end_render_pass(self.buffer);
        }
    }

    // =========================================================================
    // Binding
    // =========================================================================

    pub fn bind_pipeline(&self, bind_point: vk::PipelineBindPoint, pipeline: vk::Pipeline) {
        unsafe {
            self.device
                .handle()
                .cmd_bind_pipeline(self.buffer, bind_point, pipeline);
        }
    }

    /// Binds `buffer` to vertex binding 0 at offset 0.
    pub fn bind_vertex_buffer(&self, buffer: vk::Buffer) {
        unsafe {
            self.device
                .handle()
                .cmd_bind_vertex_buffers(self.buffer, 0, &[buffer], &[0]);
        }
    }

    /// Binds a 32-bit index buffer at offset 0.
    pub fn bind_index_buffer(&self, buffer: vk::Buffer) {
        unsafe {
            self.device.handle().cmd_bind_index_buffer(
                self.buffer,
                buffer,
                0,
                vk::IndexType::UINT32,
            );
        }
    }

    /// Binds descriptor sets starting at `first_set`. No dynamic offsets.
    pub fn bind_descriptor_sets(
        &self,
        bind_point: vk::PipelineBindPoint,
        layout: vk::PipelineLayout,
        first_set: u32,
        descriptor_sets: &[vk::DescriptorSet],
    ) {
        unsafe {
            self.device.handle().cmd_bind_descriptor_sets(
                self.buffer,
                bind_point,
                layout,
                first_set,
                descriptor_sets,
                &[],
            );
        }
    }

    // =========================================================================
    // Dynamic State
    // =========================================================================

    pub fn set_viewport(&self, viewport: &vk::Viewport) {
        unsafe {
            self.device
                .handle()
                .cmd_set_viewport(self.buffer, 0, std::slice::from_ref(viewport));
        }
    }

    pub fn set_scissor(&self, scissor: &vk::Rect2D) {
        unsafe {
            self.device
                .handle()
                .cmd_set_scissor(self.buffer, 0, std::slice::from_ref(scissor));
        }
    }

    // =========================================================================
    // Draw
    // =========================================================================

    /// Records an indexed draw.
    ///
    /// # Arguments
    ///
    /// * `index_count` - Number of indices to read
    /// * `instance_count` - Number of instances, 1 for a plain draw
    /// * `first_index` - First index within the bound index buffer
    /// * `vertex_offset` - Value added to each index before vertex lookup
    /// * `first_instance` - Instance ID of the first instance
    pub fn draw_indexed(
        &self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        unsafe {
            self.device.handle().cmd_draw_indexed(
                self.buffer,
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            );
        }
    }
}

/// Clear values for a color + depth render pass, in attachment order.
pub fn render_pass_clear_values(clear_color: [f32; 4]) -> [vk::ClearValue; 2] {
    [
        vk::ClearValue {
            color: vk::ClearColorValue {
                float32: clear_color,
            },
        },
        vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue {
                depth: 1.0,
                stencil: 0,
            },
        },
    ]
}

/// Viewport covering `extent` with the full 0..1 depth range.
pub fn full_viewport(extent: vk::Extent2D) -> vk::Viewport {
    vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: extent.width as f32,
        height: extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    }
}

/// Rectangle at the origin covering `extent`.
pub fn full_rect(extent: vk::Extent2D) -> vk::Rect2D {
    vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_buffer_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<CommandBuffer>();
        assert_send::<CommandPool>();
    }

    #[test]
    fn test_clear_values_order() {
        let values = render_pass_clear_values([0.1, 0.2, 0.3, 1.0]);
        unsafe {
            assert_eq!(values[0].color.float32, [0.1, 0.2, 0.3, 1.0]);
            assert_eq!(values[1].depth_stencil.depth, 1.0);
            assert_eq!(values[1].depth_stencil.stencil, 0);
        }
    }

    #[test]
    fn test_full_viewport_matches_extent() {
        let extent = vk::Extent2D {
            width: 1280,
            height: 720,
        };
        let viewport = full_viewport(extent);
        assert_eq!(viewport.width, 1280.0);
        assert_eq!(viewport.height, 720.0);
        assert_eq!((viewport.min_depth, viewport.max_depth), (0.0, 1.0));

        let rect = full_rect(extent);
        assert_eq!(rect.extent, extent);
        assert_eq!((rect.offset.x, rect.offset.y), (0, 0));
    }
}
