//! RHI-specific error types.

use thiserror::Error;

/// RHI-specific error type.
#[derive(Error, Debug)]
pub enum RhiError {
    /// Vulkan API error
    #[error("Vulkan error: {0}")]
    VulkanError(#[from] ash::vk::Result),

    /// Failed to load Vulkan library
    #[error("Failed to load Vulkan: {0}")]
    LoadingError(#[from] ash::LoadingError),

    /// A required instance layer is not installed
    #[error("Required layer not available: {0}")]
    MissingLayer(String),

    /// A required instance extension is not available
    #[error("Required extension not available: {0}")]
    MissingExtension(String),

    /// No adapter offers graphics + present queues and the required device extensions
    #[error("No suitable GPU found")]
    NoSuitableGpu,

    /// No memory type satisfies the requested property flags
    #[error("No memory type with {0} is allowed for this resource")]
    NoSuitableMemoryType(String),

    /// None of the candidate depth formats supports depth attachments
    #[error("No supported depth format")]
    NoSuitableDepthFormat,

    /// Shader blob is malformed
    #[error("Shader error: {0}")]
    ShaderError(String),

    /// Surface creation error
    #[error("Surface error: {0}")]
    SurfaceError(String),

    /// Swapchain error
    #[error("Swapchain error: {0}")]
    SwapchainError(String),

    /// A handle or mapping is missing or in the wrong state
    #[error("Invalid handle: {0}")]
    InvalidHandle(String),

    /// Pipeline creation error
    #[error("Pipeline error: {0}")]
    PipelineError(String),

    /// A host write would run past the end of a buffer
    #[error("Buffer overflow: writing {size} bytes at offset {offset} into a {capacity}-byte buffer")]
    BufferOverflow {
        offset: u64,
        size: u64,
        capacity: u64,
    },
}

/// Result type alias for RHI operations.
pub type RhiResult<T> = std::result::Result<T, RhiError>;
