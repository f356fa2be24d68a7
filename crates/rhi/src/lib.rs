//! Vulkan abstraction layer (Render Hardware Interface).
//!
//! Thin RAII wrappers over `ash` for the pieces a single-pass forward
//! renderer needs:
//! - Instance, surface and device creation
//! - Swapchain management
//! - Buffers with explicit memory-type selection
//! - Render pass, framebuffers and graphics pipeline
//! - Command buffer recording and semaphores

mod error;

pub mod buffer;
pub mod command;
pub mod descriptor;
pub mod device;
pub mod framebuffer;
pub mod instance;
pub mod memory;
pub mod physical_device;
pub mod pipeline;
pub mod render_pass;
pub mod shader;
pub mod surface;
pub mod swapchain;
pub mod sync;
pub mod vertex;

pub use error::{RhiError, RhiResult};

// Re-export ash types that users might need
pub use ash::vk;
