//! Procedural demo geometry, wound counter-clockwise when seen from outside.

use glam::Vec3;
use meshview_rhi::vertex::Vertex;

use crate::model::Model;

/// Outward normal plus two in-plane axes with `u × v == normal`.
const CUBE_FACES: [(Vec3, Vec3, Vec3); 6] = [
    (Vec3::X, Vec3::Y, Vec3::Z),
    (Vec3::NEG_X, Vec3::Z, Vec3::Y),
    (Vec3::Y, Vec3::Z, Vec3::X),
    (Vec3::NEG_Y, Vec3::X, Vec3::Z),
    (Vec3::Z, Vec3::X, Vec3::Y),
    (Vec3::NEG_Z, Vec3::Y, Vec3::X),
];

fn push_face(
    vertices: &mut Vec<Vertex>,
    indices: &mut Vec<u32>,
    center: Vec3,
    (normal, u, v): (Vec3, Vec3, Vec3),
    half_extent: f32,
    color: Vec3,
) {
    let base = vertices.len() as u32;
    for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
        let position = center + (u * su + v * sv) * half_extent;
        vertices.push(Vertex::new(position, color, normal));
    }
    indices.extend([0, 1, 2, 2, 3, 0].map(|i| base + i));
}

/// Axis-aligned cube with flat per-face normals and one color per face.
pub fn cube(center: Vec3, size: f32, face_colors: [Vec3; 6]) -> Model {
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for (face, color) in CUBE_FACES.into_iter().zip(face_colors) {
        let face_center = center + face.0 * (size * 0.5);
        push_face(&mut vertices, &mut indices, face_center, face, size * 0.5, color);
    }

    Model::new(vertices, indices)
}

/// Horizontal square facing +Y.
pub fn ground_quad(center: Vec3, size: f32, color: Vec3) -> Model {
    let mut vertices = Vec::with_capacity(4);
    let mut indices = Vec::with_capacity(6);

    push_face(
        &mut vertices,
        &mut indices,
        center,
        (Vec3::Y, Vec3::Z, Vec3::X),
        size * 0.5,
        color,
    );

    Model::new(vertices, indices)
}
