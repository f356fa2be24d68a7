//! Platform layer for the meshview renderer.
//!
//! This crate provides platform-specific functionality:
//! - Window management via winit
//! - The renderer's surface collaborator (`SurfaceProvider`)
//! - Input handling, turned into camera commands

mod input;
mod window;

pub use input::{InputState, KeyCode, ROLL_STEP};
pub use window::{Window, required_extensions};
