//! Uniform buffer layout shared with the vertex shader.
//!
//! # Memory Layout
//!
//! - Offset 0: model matrix (64 bytes)
//! - Offset 64: view matrix (64 bytes)
//! - Offset 128: projection matrix (64 bytes)
//! - Total size: 192 bytes

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// Model/view/projection triple bound at set 0, binding 0.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct UniformBufferObject {
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
}

impl Default for UniformBufferObject {
    fn default() -> Self {
        Self {
            model: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        }
    }
}

impl UniformBufferObject {
    /// Size of the struct in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();
}

/// Right-handed perspective projection with Y flipped for Vulkan clip space.
pub fn vulkan_perspective(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    let mut projection = Mat4::perspective_rh(fov_y_degrees.to_radians(), aspect, near, far);
    projection.y_axis.y *= -1.0;
    projection
}
