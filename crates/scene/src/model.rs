//! Geometry model: an indexed triangle list plus a local transform.
//!
//! Indices are zero-based into the model's own vertices. The transform is
//! carried along but not applied when the scene is drawn; geometry is
//! expected to be in world space already.
//!
//! # Example
//!
//! ```
//! use glam::Vec3;
//! use meshview_rhi::vertex::Vertex;
//! use meshview_scene::Model;
//!
//! let v = |x, y| Vertex::new(Vec3::new(x, y, 0.0), Vec3::ONE, Vec3::Z);
//! let model = Model::new(vec![v(0.0, 0.0), v(1.0, 0.0), v(0.0, 1.0)], vec![0, 1, 2]);
//! assert!(model.is_well_formed());
//! ```

use glam::Mat4;
use meshview_rhi::vertex::Vertex;

/// An indexed mesh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Model {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    /// Local-to-world transform (unused by the draw path)
    transform: Mat4,
}

impl Model {
    /// Creates a model with an identity transform.
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self::with_transform(vertices, indices, Mat4::IDENTITY)
    }

    pub fn with_transform(vertices: Vec<Vertex>, indices: Vec<u32>, transform: Mat4) -> Self {
        Self {
            vertices,
            indices,
            transform,
        }
    }

    /// A model with no geometry. Pushing it yields a zero-length draw.
    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    #[inline]
    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    /// True when the model has neither vertices nor indices.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.indices.is_empty()
    }

    /// True when every index refers to one of this model's vertices.
    pub fn is_well_formed(&self) -> bool {
        let count = self.vertices.len();
        self.indices.iter().all(|&i| (i as usize) < count)
    }
}
