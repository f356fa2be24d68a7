//! Scene aggregation: many models merged into one vertex and one index array.
//!
//! Each pushed model's indices are rebased by the number of vertices already
//! in the scene, so the merged index buffer can be drawn against the merged
//! vertex buffer directly. After every push the scene records a marker: the
//! total index count so far. Draw `i` covers `[markers[i - 1], markers[i])`
//! with `markers[-1] = 0`.
//!
//! # Example
//!
//! ```
//! use meshview_scene::{DrawRange, Model, Scene};
//! # use glam::Vec3;
//! # use meshview_rhi::vertex::Vertex;
//! # let tri = || Model::new(vec![Vertex::new(Vec3::ZERO, Vec3::ONE, Vec3::Z); 3], vec![0, 1, 2]);
//!
//! let mut scene = Scene::new();
//! scene.push_model(&tri());
//! scene.push_model(&Model::empty());
//! scene.push_model(&tri());
//!
//! assert_eq!(scene.markers(), &[3, 3, 6]);
//! assert_eq!(scene.indices()[3..], [3, 4, 5]);
//! assert_eq!(
//!     scene.draw_ranges().collect::<Vec<_>>()[1],
//!     DrawRange { first_index: 3, index_count: 0 }
//! );
//! ```

use meshview_rhi::vertex::Vertex;
use tracing::{debug, warn};

use crate::model::Model;

/// A contiguous slice of the merged index buffer drawn by one indexed draw call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawRange {
    pub first_index: u32,
    pub index_count: u32,
}

impl DrawRange {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index_count == 0
    }
}

/// Splits the merged index buffer back into per-model ranges.
///
/// `markers` must be non-decreasing; a repeated marker yields a range with
/// `index_count == 0`.
pub fn draw_ranges_from_markers(markers: &[u32]) -> impl Iterator<Item = DrawRange> + '_ {
    markers.iter().scan(0u32, |start, &end| {
        let range = DrawRange {
            first_index: *start,
            index_count: end.saturating_sub(*start),
        };
        *start = end;
        Some(range)
    })
}

/// Append-only aggregate of every model in draw order.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    markers: Vec<u32>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `model`, rebasing its indices by the current vertex count.
    ///
    /// Empty models are accepted and produce a marker equal to the previous one.
    /// A model that cannot be merged (an index past its own vertices, or a
    /// merged size past `u32` range) is skipped with a warning; it still gets
    /// a marker, so the draw order of later models is unchanged.
    pub fn push_model(&mut self, model: &Model) {
        let model_index = self.markers.len();

        let Some(offset) = self.mergeable_offset(model) else {
            self.markers.push(self.current_marker());
            return;
        };

        self.vertices.extend_from_slice(model.vertices());
        self.indices
            .extend(model.indices().iter().map(|&index| index + offset));
        self.markers.push(self.current_marker());

        debug!(
            "Pushed model #{}: {} vertices, {} indices, vertex offset {}",
            model_index,
            model.vertices().len(),
            model.indices().len(),
            offset
        );
    }

    /// Vertex offset for `model`, or `None` if merging it would produce
    /// indices that do not fit the 32-bit index buffer.
    fn mergeable_offset(&self, model: &Model) -> Option<u32> {
        let model_index = self.markers.len();

        if !model.is_well_formed() {
            warn!(
                "Skipping model #{}: indices past its {} vertices",
                model_index,
                model.vertices().len()
            );
            return None;
        }

        let offset = u32::try_from(self.vertices.len()).ok();
        let vertex_end = offset.and_then(|offset| {
            u32::try_from(model.vertices().len())
                .ok()
                .and_then(|count| offset.checked_add(count))
        });
        let index_end = u32::try_from(self.indices.len() + model.indices().len()).ok();

        match (offset, vertex_end, index_end) {
            (Some(offset), Some(_), Some(_)) => Some(offset),
            _ => {
                warn!(
                    "Skipping model #{}: merged scene would exceed 32-bit indices",
                    model_index
                );
                None
            }
        }
    }

    /// Index count so far. Always fits `u32`: pushes that would overflow it are skipped.
    fn current_marker(&self) -> u32 {
        u32::try_from(self.indices.len()).unwrap_or(u32::MAX)
    }

    #[inline]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Cumulative index count after each pushed model.
    #[inline]
    pub fn markers(&self) -> &[u32] {
        &self.markers
    }

    #[inline]
    pub fn model_count(&self) -> usize {
        self.markers.len()
    }

    pub fn draw_ranges(&self) -> impl Iterator<Item = DrawRange> + '_ {
        draw_ranges_from_markers(&self.markers)
    }
}
