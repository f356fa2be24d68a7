//! Error types shared by the meshview crates.

use thiserror::Error;

/// Errors raised while preparing the viewer, before any GPU work starts.
#[derive(Error, Debug)]
pub enum Error {
    /// A configuration value is missing or out of range
    #[error("Config error: {0}")]
    Config(String),

    /// Reading a config file or a shader blob failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Window creation failed
    #[error("Window error: {0}")]
    Window(String),

    /// A config file is not valid JSON for [`crate::RendererConfig`]
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type alias using the core [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;
