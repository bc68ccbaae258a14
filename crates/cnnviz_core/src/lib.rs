//! Core CNN flow diagram logic that remains independent of GPU backends or UI shells.
//!
//! - configuration and layout constants shared between the UI and the renderer
//! - deterministic layer geometry and connection builders
//! - orbit camera math, unit meshes and the POD payloads uploaded to the GPU

pub mod camera;
pub mod config;
pub mod connections;
pub mod error;
pub mod gpu;
pub mod layout;
pub mod mesh;
pub mod palette;
pub mod scene;
pub mod summary;

/// Convenience re-export for the scalar type used across the visualizer.
pub type Scalar = f32;

pub use config::Configuration;
pub use error::{LayoutError, LayoutResult};
pub use gpu::{CameraUniform, LineVertex, MeshInstance, MeshVertex, SceneInstances};
pub use layout::{Cell, LayerGroup, LayerKind, Outline, Primitive};
pub use scene::SceneLayout;
