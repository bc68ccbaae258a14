//! Centralized storage for WGSL shader sources and their entry point names.

pub mod render {
    pub const MESH: &str = include_str!("wgsl/mesh.wgsl");
    pub const LINES: &str = include_str!("wgsl/lines.wgsl");

    pub const MESH_VERTEX_ENTRY: &str = "mesh_vertex";
    pub const MESH_FRAGMENT_ENTRY: &str = "mesh_fragment";
    pub const LINE_VERTEX_ENTRY: &str = "line_vertex";
    pub const LINE_FRAGMENT_ENTRY: &str = "line_fragment";
}
