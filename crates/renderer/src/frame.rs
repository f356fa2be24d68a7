//! Per-frame draw and present cycle.
//!
//! One frame is: acquire an image, submit its pre-recorded command buffer,
//! present it, then block until the present queue is idle. The final block
//! keeps exactly one frame in flight, which is what lets the single uniform
//! buffer be rewritten between frames without further synchronization.

use ash::vk;
use glam::Mat4;
use tracing::{trace, warn};

use meshview_rhi::RhiError;

use crate::bootstrap::BootstrapStep;
use crate::error::{RendererError, RendererResult, StepContext};
use crate::renderer::{Renderer, required};
use crate::ubo::UniformBufferObject;

pub const ACQUIRE_STEP: &str = "acquire";
pub const SUBMIT_STEP: &str = "submit";
pub const PRESENT_STEP: &str = "present";
pub const WAIT_IDLE_STEP: &str = "wait idle";
pub const UPDATE_UNIFORMS_STEP: &str = "update uniforms";

/// Result of one presented frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameStatus {
    pub image_index: u32,
    /// The swapchain no longer matches the surface exactly. Presentation
    /// still succeeded; the swapchain is never recreated here.
    pub suboptimal: bool,
}

impl Renderer {
    fn ensure_bootstrapped(&self, operation: &'static str) -> RendererResult<()> {
        match self.phases.first_missing() {
            None => Ok(()),
            Some(missing) => Err(RendererError::NotBootstrapped { operation, missing }),
        }
    }

    /// Renders and presents one frame.
    ///
    /// # Errors
    ///
    /// [`RendererError::NotBootstrapped`] before every bootstrap step has run,
    /// otherwise a [`RendererError::Step`] naming `acquire`, `submit`,
    /// `present` or `wait idle`.
    pub fn draw_frame(&mut self) -> RendererResult<FrameStatus> {
        self.ensure_bootstrapped("draw frame")?;

        let device = required(&self.device, BootstrapStep::Device)?;
        let swapchain = required(&self.swapchain, BootstrapStep::Swapchain)?;
        let commands = required(&self.commands, BootstrapStep::CommandBuffers)?;
        let sync = required(&self.sync, BootstrapStep::SyncObjects)?;

        let (image_index, acquire_suboptimal) = swapchain
            .acquire_next_image(sync.image_acquired.handle())
            .step(ACQUIRE_STEP)?;
        trace!("Acquired swapchain image {}", image_index);

        let command_buffer = commands
            .buffers
            .get(image_index as usize)
            .ok_or_else(|| RendererError::Step {
                step: ACQUIRE_STEP,
                source: RhiError::InvalidHandle(format!(
                    "no command buffer recorded for image {}",
                    image_index
                )),
            })?;

        let wait_semaphores = [sync.image_acquired.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [command_buffer.handle()];
        let signal_semaphores = [sync.render_complete.handle()];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        // SAFETY: the command buffer was fully recorded during bootstrap and
        // the previous frame finished before present_and_wait returned.
        unsafe {
            device
                .submit_graphics(&[submit_info], vk::Fence::null())
                .step(SUBMIT_STEP)?;
        }

        let present_suboptimal = self.present_and_wait(image_index)?;

        let suboptimal = acquire_suboptimal || present_suboptimal;
        if suboptimal {
            warn!("Swapchain is suboptimal for the surface");
        }

        Ok(FrameStatus {
            image_index,
            suboptimal,
        })
    }

    /// Presents `image_index` once rendering completes, then blocks until
    /// the present queue drains.
    fn present_and_wait(&self, image_index: u32) -> RendererResult<bool> {
        let device = required(&self.device, BootstrapStep::Device)?;
        let swapchain = required(&self.swapchain, BootstrapStep::Swapchain)?;
        let sync = required(&self.sync, BootstrapStep::SyncObjects)?;

        let suboptimal = swapchain
            .present(
                device.present_queue(),
                image_index,
                sync.render_complete.handle(),
            )
            .step(PRESENT_STEP)?;

        device
            .queue_wait_idle(device.present_queue())
            .step(WAIT_IDLE_STEP)?;

        Ok(suboptimal)
    }

    /// Writes the model/view/projection triple for the next frame.
    ///
    /// Only the uniform buffer needs to exist; the rest of the bootstrap may
    /// still be pending.
    pub fn update_uniforms(&mut self, view: &Mat4) -> RendererResult<()> {
        if !self.phases.is_complete(BootstrapStep::UniformBuffer) {
            return Err(RendererError::NotBootstrapped {
                operation: UPDATE_UNIFORMS_STEP,
                missing: BootstrapStep::UniformBuffer,
            });
        }

        let ubo = UniformBufferObject {
            model: Mat4::IDENTITY,
            view: *view,
            projection: self.projection(),
        };

        let buffer = required(&self.uniform_buffer, BootstrapStep::UniformBuffer)?;
        buffer
            .write(0, bytemuck::bytes_of(&ubo))
            .step(UPDATE_UNIFORMS_STEP)
    }
}
