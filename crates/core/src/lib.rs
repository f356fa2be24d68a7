//! Core utilities for the meshview renderer.
//!
//! This crate provides the ambient pieces every other crate leans on:
//! - Error types and result aliases
//! - Logging initialization
//! - Configuration loading
//! - Frame-rate accounting

mod config;
mod error;
mod logging;
mod timer;

pub use config::{CONFIG_ENV_VAR, CameraConfig, GraphicsConfig, RendererConfig, WindowConfig};
pub use error::{Error, Result};
pub use logging::init_logging;
pub use timer::FrameCounter;
