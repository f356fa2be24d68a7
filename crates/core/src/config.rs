//! Viewer configuration.
//!
//! Every field has a default, so a config file only needs the values it
//! overrides:
//!
//! ```json
//! { "window": { "width": 1920, "height": 1080 }, "camera": { "renormalize": false } }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Environment variable consulted for a config path when none is passed explicitly.
pub const CONFIG_ENV_VAR: &str = "MESHVIEW_CONFIG";

/// Top-level configuration for the viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RendererConfig {
    pub window: WindowConfig,
    pub graphics: GraphicsConfig,
    pub camera: CameraConfig,
}

/// Window size and title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "vulkan test".to_string(),
        }
    }
}

/// Device, pipeline and projection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphicsConfig {
    /// Request `VK_LAYER_KHRONOS_validation` and a debug messenger
    pub enable_validation: bool,
    /// Log available/required layers, extensions and candidate devices
    pub print_diagnostics: bool,
    pub clear_color: [f32; 4],
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
    /// Vertical field of view in degrees
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(debug_assertions),
            print_diagnostics: false,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            vertex_shader: PathBuf::from("shaders/scene.vert.spv"),
            fragment_shader: PathBuf::from("shaders/scene.frag.spv"),
            fov_y_degrees: 45.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

/// Free-look camera tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Distance covered by one move command
    pub speed: f32,
    /// Radians per unit of mouse motion
    pub mouse_sensitivity: f32,
    /// Re-orthonormalize forward/up after each rotation
    pub renormalize: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            speed: 0.1,
            mouse_sensitivity: 0.01,
            renormalize: true,
        }
    }
}

impl RendererConfig {
    /// Load and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load from `path` if given, else from `MESHVIEW_CONFIG` if set, else defaults.
    pub fn load_or_default(path: Option<PathBuf>) -> Result<Self> {
        let path = path.or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));
        match path {
            Some(path) => Self::load(path),
            None => {
                debug!("No config file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Reject values the renderer cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(Error::Config(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }
        if !(self.camera.speed > 0.0) {
            return Err(Error::Config(format!(
                "camera.speed must be positive, got {}",
                self.camera.speed
            )));
        }
        if !(self.camera.mouse_sensitivity > 0.0) {
            return Err(Error::Config(format!(
                "camera.mouse_sensitivity must be positive, got {}",
                self.camera.mouse_sensitivity
            )));
        }
        let g = &self.graphics;
        if !(g.near > 0.0 && g.far > g.near) {
            return Err(Error::Config(format!(
                "clip range must satisfy 0 < near < far, got near={} far={}",
                g.near, g.far
            )));
        }
        if !(g.fov_y_degrees > 0.0 && g.fov_y_degrees < 180.0) {
            return Err(Error::Config(format!(
                "graphics.fov_y_degrees must be in (0, 180), got {}",
                g.fov_y_degrees
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RendererConfig::default();
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.window.height, 720);
        assert_eq!(config.window.title, "vulkan test");
        assert_eq!(config.camera.speed, 0.1);
        assert_eq!(config.camera.mouse_sensitivity, 0.01);
        assert!(config.camera.renormalize);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: RendererConfig =
            serde_json::from_str(r#"{ "window": { "width": 800 }, "camera": { "renormalize": false } }"#)
                .unwrap();
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 720);
        assert!(!config.camera.renormalize);
        assert_eq!(config.graphics.far, 100.0);
    }

    #[test]
    fn test_validate_rejects_zero_window() {
        let mut config = RendererConfig::default();
        config.window.height = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_clip_range() {
        let mut config = RendererConfig::default();
        config.graphics.near = 10.0;
        config.graphics.far = 1.0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_nan_speed() {
        let mut config = RendererConfig::default();
        config.camera.speed = f32::NAN;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("meshview-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "graphics": { "print_diagnostics": true } }"#).unwrap();
        let config = RendererConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert!(config.graphics.print_diagnostics);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let result = RendererConfig::load("/nonexistent/meshview.json");
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
