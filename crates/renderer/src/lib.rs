//! Forward renderer for a single merged scene.
//!
//! This crate orchestrates the rendering process:
//! - Ordered bootstrap of every GPU resource, with prerequisite checks
//! - Reverse-order teardown
//! - Command buffers recorded once, one indexed draw per model
//! - A frame loop with exactly one frame in flight

pub mod bootstrap;
pub mod depth_buffer;
pub mod draw;
pub mod error;
pub mod frame;
pub mod renderer;
pub mod ubo;

pub use bootstrap::{BootstrapStep, PhaseTracker};
pub use error::{RendererError, RendererResult};
pub use frame::FrameStatus;
pub use renderer::{Renderer, ShaderSources};
pub use ubo::UniformBufferObject;
