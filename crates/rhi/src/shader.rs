//! SPIR-V validation and VkShaderModule creation.
//!
//! The renderer only uses a vertex and a fragment stage, both with a `main`
//! entry point by default. Reading the `.spv` files is the caller's job;
//! modules are built from in-memory blobs.

use std::ffi::CString;
use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// SPIR-V magic number, first word of every module.
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Pipeline stage a shader module is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn to_vk_stage(self) -> vk::ShaderStageFlags {
        match self {
            ShaderStage::Vertex => vk::ShaderStageFlags::VERTEX,
            ShaderStage::Fragment => vk::ShaderStageFlags::FRAGMENT,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Reinterprets a SPIR-V blob as little-endian 32-bit words.
///
/// Rejects blobs whose length is not a multiple of four and blobs that do not
/// start with [`SPIRV_MAGIC`].
pub fn spirv_words(bytes: &[u8]) -> RhiResult<Vec<u32>> {
    if !bytes.len().is_multiple_of(4) {
        return Err(RhiError::ShaderError(format!(
            "SPIR-V code must be 4-byte aligned, got {} bytes",
            bytes.len()
        )));
    }

    let words: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    match words.first() {
        Some(&SPIRV_MAGIC) => Ok(words),
        Some(other) => Err(RhiError::ShaderError(format!(
            "Bad SPIR-V magic number {other:#010x}"
        ))),
        None => Err(RhiError::ShaderError("SPIR-V code is empty".to_string())),
    }
}

/// Owned VkShaderModule plus the stage and entry point needed for pipeline creation.
pub struct Shader {
    device: Arc<Device>,
    module: vk::ShaderModule,
    stage: ShaderStage,
    entry_point: CString,
}

impl Shader {
    /// Creates a module from an in-memory SPIR-V blob.
    ///
    /// # Errors
    ///
    /// [`RhiError::ShaderError`] if the blob fails [`spirv_words`] or the
    /// entry point contains a NUL byte, otherwise the Vulkan error from
    /// module creation.
    pub fn from_spirv_bytes(
        device: Arc<Device>,
        bytes: &[u8],
        stage: ShaderStage,
        entry_point: &str,
    ) -> RhiResult<Self> {
        let code = spirv_words(bytes)?;

        let entry_point = CString::new(entry_point)
            .map_err(|e| RhiError::ShaderError(format!("Invalid entry point name: {}", e)))?;

        let create_info = vk::ShaderModuleCreateInfo::default().code(&code);
        let module = unsafe { device.handle().create_shader_module(&create_info, None)? };

        debug!(
            "Created {} shader module ({} words) with entry point {:?}",
            stage,
            code.len(),
            entry_point
        );

        Ok(Self {
            device,
            module,
            stage,
            entry_point,
        })
    }

    /// Stage description for pipeline creation. Borrows from `self`.
    pub fn stage_create_info(&self) -> vk::PipelineShaderStageCreateInfo<'_> {
        vk::PipelineShaderStageCreateInfo::default()
            .stage(self.stage.to_vk_stage())
            .module(self.module)
            .name(&self.entry_point)
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_shader_module(self.module, None);
        }
        debug!("Destroyed {} shader module", self.stage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    #[test]
    fn test_shader_stage_to_vk_stage() {
        assert_eq!(
            ShaderStage::Vertex.to_vk_stage(),
            vk::ShaderStageFlags::VERTEX
        );
        assert_eq!(
            ShaderStage::Fragment.to_vk_stage(),
            vk::ShaderStageFlags::FRAGMENT
        );
    }

    #[test]
    fn test_shader_stage_display() {
        assert_eq!(format!("{}", ShaderStage::Vertex), "vertex");
        assert_eq!(format!("{}", ShaderStage::Fragment), "fragment");
    }

    #[test]
    fn test_spirv_words_accepts_valid_header() {
        let words = spirv_words(&blob(&[SPIRV_MAGIC, 0x0001_0000, 0, 8, 0])).unwrap();
        assert_eq!(words.len(), 5);
        assert_eq!(words[0], SPIRV_MAGIC);
        assert_eq!(words[3], 8);
    }

    #[test]
    fn test_spirv_words_rejects_misaligned() {
        let mut bytes = blob(&[SPIRV_MAGIC]);
        bytes.push(0);
        assert!(matches!(spirv_words(&bytes), Err(RhiError::ShaderError(_))));
    }

    #[test]
    fn test_spirv_words_rejects_bad_magic() {
        let err = spirv_words(&blob(&[0xdead_beef, 0])).unwrap_err();
        assert!(err.to_string().contains("0xdeadbeef"));
    }

    #[test]
    fn test_spirv_words_rejects_empty() {
        assert!(spirv_words(&[]).is_err());
    }
}
