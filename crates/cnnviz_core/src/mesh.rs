//! Unit meshes instanced for every cell.
//!
//! Both meshes fit inside the unit box centered at the origin, so an instance's
//! `scale` is the cube edge length or the sphere diameter.

use std::f32::consts::{PI, TAU};

use glam::Vec3;

use crate::gpu::MeshVertex;

#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u16>,
}

impl MeshData {
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}

/// Cube with one quad per face so each face gets a flat normal.
pub fn cube() -> MeshData {
    const FACES: [(Vec3, Vec3, Vec3); 6] = [
        (Vec3::X, Vec3::Y, Vec3::NEG_Z),
        (Vec3::NEG_X, Vec3::Y, Vec3::Z),
        (Vec3::Y, Vec3::Z, Vec3::NEG_X),
        (Vec3::NEG_Y, Vec3::NEG_Z, Vec3::NEG_X),
        (Vec3::Z, Vec3::Y, Vec3::X),
        (Vec3::NEG_Z, Vec3::Y, Vec3::NEG_X),
    ];

    let mut mesh = MeshData::default();
    for (normal, up, side) in FACES {
        let base = mesh.vertices.len() as u16;
        let center = normal * 0.5;
        for (u, v) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let position = center + side * (0.5 * u) + up * (0.5 * v);
            mesh.vertices.push(MeshVertex::new(position, normal));
        }
        // side × up == normal for every face above, so this winding is CCW seen from outside.
        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    mesh
}

/// Latitude/longitude sphere of radius 0.5.
pub fn uv_sphere(segments: u16, rings: u16) -> MeshData {
    let segments = segments.max(3);
    let rings = rings.max(2);
    let mut mesh = MeshData::default();

    for ring in 0..=rings {
        let phi = PI * ring as f32 / rings as f32;
        let (sin_phi, cos_phi) = phi.sin_cos();
        for segment in 0..=segments {
            let theta = TAU * segment as f32 / segments as f32;
            let (sin_theta, cos_theta) = theta.sin_cos();
            let normal = Vec3::new(sin_phi * sin_theta, cos_phi, sin_phi * cos_theta);
            mesh.vertices.push(MeshVertex::new(normal * 0.5, normal));
        }
    }

    let stride = segments + 1;
    for ring in 0..rings {
        for segment in 0..segments {
            let a = ring * stride + segment;
            let b = a + stride;
            if ring != 0 {
                mesh.indices.extend_from_slice(&[a, b, a + 1]);
            }
            if ring != rings - 1 {
                mesh.indices.extend_from_slice(&[b, b + 1, a + 1]);
            }
        }
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_normal(mesh: &MeshData, tri: &[u16]) -> Vec3 {
        let p = |i: u16| Vec3::from_array(mesh.vertices[i as usize].position);
        (p(tri[1]) - p(tri[0])).cross(p(tri[2]) - p(tri[0]))
    }

    #[test]
    fn cube_has_flat_faces_facing_out() {
        let mesh = cube();
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.index_count(), 36);
        for v in &mesh.vertices {
            assert!(v.position.iter().all(|c| (c.abs() - 0.5).abs() < 1e-6));
        }
        for tri in mesh.indices.chunks(3) {
            let n = triangle_normal(&mesh, tri);
            let expected = Vec3::from_array(mesh.vertices[tri[0] as usize].normal);
            assert!(n.dot(expected) > 0.0);
        }
    }

    #[test]
    fn sphere_vertices_lie_on_radius() {
        let mesh = uv_sphere(16, 12);
        assert_eq!(mesh.vertices.len(), 17 * 13);
        for v in &mesh.vertices {
            let p = Vec3::from_array(v.position);
            assert!((p.length() - 0.5).abs() < 1e-5);
        }
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
    }

    #[test]
    fn sphere_triangles_face_out() {
        let mesh = uv_sphere(16, 12);
        for tri in mesh.indices.chunks(3) {
            let n = triangle_normal(&mesh, tri);
            let centroid = tri
                .iter()
                .map(|&i| Vec3::from_array(mesh.vertices[i as usize].position))
                .sum::<Vec3>();
            assert!(n.dot(centroid) > 0.0);
        }
    }
}
