//! Scene data for the renderer.
//!
//! This crate provides:
//! - Geometry models and a few procedural primitives
//! - The scene aggregator that merges models into one vertex/index buffer
//! - A free-look camera

pub mod aggregate;
pub mod camera;
pub mod model;
pub mod primitives;

pub use aggregate::{DrawRange, Scene, draw_ranges_from_markers};
pub use camera::{Camera, CameraCommand, CameraDrift, CameraSettings, DRIFT_TOLERANCE};
pub use model::Model;
