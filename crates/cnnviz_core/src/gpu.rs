//! GPU-facing data structures shared between host code and WGSL shaders.

use glam::{Mat4, Vec3};

use crate::camera::OrbitCamera;
use crate::layout::{Cell, Outline, Primitive};
use crate::palette;
use crate::scene::SceneLayout;
use crate::Scalar;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    pub position: [Scalar; 3],
    pub normal: [Scalar; 3],
}

const _: () = assert!(core::mem::size_of::<MeshVertex>() == 24);

impl MeshVertex {
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
        }
    }
}

/// Per-instance record for the mesh pipeline (vertex buffer slot 1).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshInstance {
    pub center: [Scalar; 3],
    pub scale: Scalar,
    /// Linear RGBA.
    pub color: [Scalar; 4],
    /// Edge overlay selector, see [`MeshInstance::outline_code`].
    pub outline: Scalar,
    pub _pad: [Scalar; 3],
}

const _: () = assert!(core::mem::size_of::<MeshInstance>() == 48);

impl MeshInstance {
    pub fn from_cell(cell: &Cell) -> Self {
        Self {
            center: cell.position.to_array(),
            scale: cell.kind.extent(),
            color: palette::base_color(cell.kind, cell.group).linear_rgba(1.0),
            outline: Self::outline_code(cell.kind.outline()),
            _pad: [0.0; 3],
        }
    }

    /// Value read by `mesh.wgsl`: 0 none, 1 unit-box edges, 2 sphere grid.
    pub fn outline_code(outline: Outline) -> Scalar {
        match outline {
            Outline::None => 0.0,
            Outline::BoxEdges => 1.0,
            Outline::SphereGrid => 2.0,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LineVertex {
    pub position: [Scalar; 3],
    pub color: [Scalar; 4],
}

const _: () = assert!(core::mem::size_of::<LineVertex>() == 28);

/// Matches the `Camera` uniform struct in the WGSL sources.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[Scalar; 4]; 4],
    pub eye: [Scalar; 4],
    /// Direction towards the light, w unused.
    pub light_dir: [Scalar; 4],
}

const _: () = assert!(core::mem::size_of::<CameraUniform>() == 96);

impl CameraUniform {
    pub fn from_camera(camera: &OrbitCamera, aspect: Scalar) -> Self {
        Self::new(camera.view_projection(aspect), camera.eye())
    }

    pub fn new(view_proj: Mat4, eye: Vec3) -> Self {
        let light = Vec3::ONE.normalize();
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            eye: eye.extend(1.0).to_array(),
            light_dir: light.extend(0.0).to_array(),
        }
    }
}

/// Host-side copies of everything the renderer uploads for one scene snapshot.
#[derive(Debug, Clone, Default)]
pub struct SceneInstances {
    pub cubes: Vec<MeshInstance>,
    pub spheres: Vec<MeshInstance>,
    /// Two vertices per connection, drawn as a line list.
    pub lines: Vec<LineVertex>,
}

impl SceneInstances {
    pub fn from_layout(layout: &SceneLayout) -> Self {
        let mut instances = Self::default();
        for cell in layout.cells() {
            let instance = MeshInstance::from_cell(cell);
            match cell.kind.primitive() {
                Primitive::Cube => instances.cubes.push(instance),
                Primitive::Sphere => instances.spheres.push(instance),
            }
        }

        instances.lines.reserve(layout.connections().len() * 2);
        for connection in layout.connections() {
            let color = connection
                .style
                .color
                .linear_rgba(connection.style.opacity);
            instances.lines.push(LineVertex {
                position: connection.from.to_array(),
                color,
            });
            instances.lines.push(LineVertex {
                position: connection.to.to_array(),
                color,
            });
        }
        instances
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;

    #[test]
    fn instances_split_by_primitive() {
        let layout = SceneLayout::build(Configuration::new(3).unwrap());
        let instances = SceneInstances::from_layout(&layout);

        // inputs + conv outputs + pooled + flattened
        assert_eq!(instances.cubes.len(), 192 + 192 + 48 + 48);
        // fc input + hidden + output
        assert_eq!(instances.spheres.len(), 48 + 4 + 1);
        assert_eq!(instances.lines.len(), 2 * 244);

        assert!(instances.cubes.iter().all(|c| c.outline == 1.0));
        let (fc, rest) = instances.spheres.split_at(48);
        assert!(fc.iter().all(|s| s.outline == 0.0));
        assert!(rest.iter().all(|s| s.outline == 2.0));
        assert!(instances.lines.iter().all(|l| (l.color[3] - 0.3).abs() < 1e-6));
    }

    #[test]
    fn output_node_is_largest_sphere() {
        let layout = SceneLayout::build(Configuration::new(1).unwrap());
        let instances = SceneInstances::from_layout(&layout);
        let last = instances.spheres.last().unwrap();
        assert_eq!(last.center, [46.0, 0.0, 0.0]);
        assert_eq!(last.scale, 0.8);
    }

    #[test]
    fn camera_uniform_carries_eye() {
        let camera = OrbitCamera::default();
        let uniform = CameraUniform::from_camera(&camera, 1.5);
        let eye = Vec3::new(uniform.eye[0], uniform.eye[1], uniform.eye[2]);
        assert!((eye - camera.eye()).length() < 1e-5);
        assert_eq!(uniform.light_dir[3], 0.0);
    }
}
