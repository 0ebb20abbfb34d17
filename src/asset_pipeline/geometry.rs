//! Procedural props: the table slab is a box and the hexagons are six-sided cylinders.
//!
//! Both follow the usual three.js conventions: centered on the origin, Y up,
//! counter-clockwise front faces.

use std::f32::consts::TAU;

use glam::{Vec2, Vec3};

use crate::model::{Model, ModelPrimitive, Vertex};

#[derive(Default)]
struct GeometryBuilder {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
}

impl GeometryBuilder {
    fn push_vertex(&mut self, position: Vec3, normal: Vec3, tex_coords: Vec2) -> u32 {
        self.vertices.push(Vertex {
            position,
            normal,
            tex_coords,
            tangent: Vec3::ZERO,
        });
        (self.vertices.len() - 1) as u32
    }

    /// `u` cross `v` must point along `normal`.
    fn push_quad(&mut self, center: Vec3, u: Vec3, v: Vec3, normal: Vec3) {
        let a = self.push_vertex(center - u - v, normal, Vec2::new(0.0, 1.0));
        let b = self.push_vertex(center + u - v, normal, Vec2::new(1.0, 1.0));
        let c = self.push_vertex(center + u + v, normal, Vec2::new(1.0, 0.0));
        let d = self.push_vertex(center - u + v, normal, Vec2::new(0.0, 0.0));
        self.indices.extend_from_slice(&[a, b, c, a, c, d]);
    }

    fn into_model(self, name: &str) -> Model {
        let mut primitive = ModelPrimitive {
            index: 0,
            vertices: self.vertices,
            indices: self.indices,
            material: None,
        };

        if let Err(err) = primitive.generate_tangents() {
            log::warn!("{name}: {err}");
        }

        Model {
            name: name.to_string(),
            primitives: vec![primitive],
        }
    }
}

pub fn box_model(name: &str, size: Vec3) -> Model {
    let half = size * 0.5;
    let mut builder = GeometryBuilder::default();

    let faces = [
        (Vec3::X, -Vec3::Z, Vec3::Y),
        (-Vec3::X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, -Vec3::Z),
        (-Vec3::Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (-Vec3::Z, -Vec3::X, Vec3::Y),
    ];

    for (normal, u, v) in faces {
        builder.push_quad(normal * half, u * half, v * half, normal);
    }

    builder.into_model(name)
}

pub fn cylinder_model(
    name: &str,
    radius_top: f32,
    radius_bottom: f32,
    height: f32,
    radial_segments: u32,
) -> Model {
    let segments = radial_segments.max(3);
    let half_height = height * 0.5;
    let mut builder = GeometryBuilder::default();

    let ring_point = |i: u32, radius: f32, y: f32| {
        let theta = i as f32 / segments as f32 * TAU;
        Vec3::new(radius * theta.sin(), y, radius * theta.cos())
    };

    // Flat-shaded sides, one quad per segment
    for i in 0..segments {
        let b0 = ring_point(i, radius_bottom, -half_height);
        let b1 = ring_point(i + 1, radius_bottom, -half_height);
        let t0 = ring_point(i, radius_top, half_height);
        let t1 = ring_point(i + 1, radius_top, half_height);
        let normal = (b1 - b0).cross(t0 - b0).normalize_or(Vec3::X);

        let u0 = i as f32 / segments as f32;
        let u1 = (i + 1) as f32 / segments as f32;
        let a = builder.push_vertex(b0, normal, Vec2::new(u0, 1.0));
        let b = builder.push_vertex(b1, normal, Vec2::new(u1, 1.0));
        let c = builder.push_vertex(t1, normal, Vec2::new(u1, 0.0));
        let d = builder.push_vertex(t0, normal, Vec2::new(u0, 0.0));
        builder.indices.extend_from_slice(&[a, b, c, a, c, d]);
    }

    for (y, radius, normal) in [
        (half_height, radius_top, Vec3::Y),
        (-half_height, radius_bottom, -Vec3::Y),
    ] {
        if radius <= 0.0 {
            continue;
        }

        let center = builder.push_vertex(Vec3::new(0.0, y, 0.0), normal, Vec2::splat(0.5));
        let ring_start = builder.vertices.len() as u32;

        for i in 0..segments {
            let point = ring_point(i, radius, y);
            let uv = Vec2::new(point.x / radius, point.z / radius) * 0.5 + Vec2::splat(0.5);
            builder.push_vertex(point, normal, uv);
        }

        for i in 0..segments {
            let current = ring_start + i;
            let next = ring_start + (i + 1) % segments;
            if normal.y > 0.0 {
                builder.indices.extend_from_slice(&[center, current, next]);
            } else {
                builder.indices.extend_from_slice(&[center, next, current]);
            }
        }
    }

    builder.into_model(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_normal(primitive: &ModelPrimitive, face: usize) -> Vec3 {
        let a = primitive.vertex_by_triangle_index(face, 0).position;
        let b = primitive.vertex_by_triangle_index(face, 1).position;
        let c = primitive.vertex_by_triangle_index(face, 2).position;
        (b - a).cross(c - a).normalize()
    }

    #[test]
    fn table_slab_has_requested_extent() {
        let model = box_model("table", Vec3::new(8.0, 0.2, 1.0));
        let primitive = &model.primitives[0];

        assert_eq!(primitive.vertices.len(), 24);
        assert_eq!(primitive.indices.len(), 36);

        let max = primitive
            .vertices
            .iter()
            .fold(Vec3::splat(f32::MIN), |acc, v| acc.max(v.position));
        assert!((max - Vec3::new(4.0, 0.1, 0.5)).length() < 1e-6);
    }

    #[test]
    fn box_winding_matches_normals() {
        let model = box_model("box", Vec3::ONE);
        let primitive = &model.primitives[0];

        for face in 0..primitive.indices.len() / 3 {
            let stored = primitive.vertex_by_triangle_index(face, 0).normal;
            assert!(triangle_normal(primitive, face).dot(stored) > 0.99);
        }
    }

    #[test]
    fn hexagon_has_six_sides_and_two_caps() {
        let model = cylinder_model("hexagon", 1.0, 1.0, 0.1, 6);
        let primitive = &model.primitives[0];

        // 6 side quads (4 vertices each) plus two caps of 1 center + 6 ring vertices
        assert_eq!(primitive.vertices.len(), 6 * 4 + 2 * 7);
        assert_eq!(primitive.indices.len(), 6 * 6 + 2 * 6 * 3);

        for face in 0..primitive.indices.len() / 3 {
            let stored = primitive.vertex_by_triangle_index(face, 0).normal;
            assert!(triangle_normal(primitive, face).dot(stored) > 0.99);
        }
    }
}
