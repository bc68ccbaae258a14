//! Layer geometry builder.
//!
//! Every function here is pure: it maps the configuration onto cell positions and
//! metadata and knows nothing about how the cells are drawn.

use glam::Vec3;

use crate::config::{
    kernel_z_offset, stage_x, Configuration, COLUMN_STRETCH, HIDDEN_SIZE, HIDDEN_SPACING,
    INPUT_CHANNELS, LAYER_SIZE, LAYER_SPACING, OUTPUT_SIZE, POOLED_SIZE, SPACING,
};
use crate::Scalar;

/// Stage of the network a cell belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Input,
    ConvOutput,
    Pooled,
    Flattened,
    FcInput,
    Hidden,
    Output,
}

/// Shape used to draw a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Cube,
    Sphere,
}

impl LayerKind {
    pub fn primitive(self) -> Primitive {
        match self {
            LayerKind::Input | LayerKind::ConvOutput | LayerKind::Pooled | LayerKind::Flattened => {
                Primitive::Cube
            }
            LayerKind::FcInput | LayerKind::Hidden | LayerKind::Output => Primitive::Sphere,
        }
    }

    /// Edge length for cubes, diameter for spheres.
    pub fn extent(self) -> Scalar {
        match self {
            LayerKind::Input | LayerKind::ConvOutput | LayerKind::Pooled | LayerKind::Flattened => {
                0.8
            }
            LayerKind::FcInput | LayerKind::Hidden => 0.6,
            LayerKind::Output => 0.8,
        }
    }

    /// Dark edge overlay drawn on top of the base color.
    pub fn outline(self) -> Outline {
        match self {
            LayerKind::Input | LayerKind::ConvOutput | LayerKind::Pooled | LayerKind::Flattened => {
                Outline::BoxEdges
            }
            LayerKind::FcInput => Outline::None,
            LayerKind::Hidden | LayerKind::Output => Outline::SphereGrid,
        }
    }
}

/// Edge overlay for a cell's mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outline {
    None,
    /// The twelve edges of the cube.
    BoxEdges,
    /// Meridians and parallels of the sphere tessellation.
    SphereGrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCoord {
    pub x: u32,
    pub y: u32,
}

/// Pooled cell a flattened entry was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PooledSource {
    pub kernel: usize,
    pub pooled_x: usize,
    pub pooled_y: usize,
}

impl PooledSource {
    /// Recovers the pooled cell behind flattened index `index`.
    pub fn from_flattened_index(index: usize) -> Self {
        let area = POOLED_SIZE * POOLED_SIZE;
        let kernel = index / area;
        let pos_in_kernel = index % area;
        Self {
            kernel,
            pooled_x: pos_in_kernel / POOLED_SIZE,
            pooled_y: pos_in_kernel % POOLED_SIZE,
        }
    }

    /// Inverse of [`PooledSource::from_flattened_index`].
    pub fn flattened_index(&self) -> usize {
        self.kernel * POOLED_SIZE * POOLED_SIZE + self.pooled_x * POOLED_SIZE + self.pooled_y
    }
}

/// One drawable primitive of the diagram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub kind: LayerKind,
    /// Channel for input cells, kernel for conv/pooled cells, zero otherwise.
    pub group: usize,
    /// Position of the cell inside its group, in creation order.
    pub index: usize,
    pub grid: GridCoord,
    /// Position relative to the owning group's origin.
    pub local: Vec3,
    /// World-space position: group offset plus `local`.
    pub position: Vec3,
    /// Only set on flattened cells.
    pub source: Option<PooledSource>,
}

/// Ordered cells sharing a kind and a translation offset.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerGroup {
    pub kind: LayerKind,
    pub index: usize,
    pub offset: Vec3,
    pub cells: Vec<Cell>,
}

impl LayerGroup {
    fn new(kind: LayerKind, index: usize, offset: Vec3, capacity: usize) -> Self {
        Self {
            kind,
            index,
            offset,
            cells: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, grid: GridCoord, local: Vec3, source: Option<PooledSource>) {
        let index = self.cells.len();
        self.cells.push(Cell {
            kind: self.kind,
            group: self.index,
            index,
            grid,
            local,
            position: self.offset + local,
            source,
        });
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.cells.iter().map(|cell| cell.position)
    }
}

/// Offset of `i` from the center of a row of `count` items.
fn centered(i: usize, count: usize) -> Scalar {
    i as Scalar - (count as Scalar - 1.0) / 2.0
}

fn square_grid(kind: LayerKind, index: usize, offset: Vec3, size: usize) -> LayerGroup {
    let mut group = LayerGroup::new(kind, index, offset, size * size);
    for x in 0..size {
        for y in 0..size {
            let local = Vec3::new(centered(x, size) * SPACING, centered(y, size) * SPACING, 0.0);
            group.push(
                GridCoord {
                    x: x as u32,
                    y: y as u32,
                },
                local,
                None,
            );
        }
    }
    group
}

fn column(kind: LayerKind, offset: Vec3, count: usize, step: Scalar) -> LayerGroup {
    let mut group = LayerGroup::new(kind, 0, offset, count);
    for i in 0..count {
        let source = (kind == LayerKind::Flattened).then(|| PooledSource::from_flattened_index(i));
        group.push(
            GridCoord { x: 0, y: i as u32 },
            Vec3::new(0.0, centered(i, count) * step, 0.0),
            source,
        );
    }
    group
}

/// Three 8×8 channel grids stacked along Z around the origin.
pub fn build_input_layers() -> Vec<LayerGroup> {
    (0..INPUT_CHANNELS)
        .map(|channel| {
            let z = (channel as Scalar - 1.0) * LAYER_SPACING;
            square_grid(
                LayerKind::Input,
                channel,
                Vec3::new(stage_x::INPUT, 0.0, z),
                LAYER_SIZE,
            )
        })
        .collect()
}

/// One 8×8 feature map per kernel.
pub fn build_output_layers(config: &Configuration) -> Vec<LayerGroup> {
    kernel_grids(config, LayerKind::ConvOutput, stage_x::CONV_OUTPUT, LAYER_SIZE)
}

/// One 4×4 pooled map per kernel.
pub fn build_pooled_layers(config: &Configuration) -> Vec<LayerGroup> {
    kernel_grids(config, LayerKind::Pooled, stage_x::POOLED, POOLED_SIZE)
}

fn kernel_grids(config: &Configuration, kind: LayerKind, x: Scalar, size: usize) -> Vec<LayerGroup> {
    let num_kernels = config.num_kernels() as usize;
    (0..num_kernels)
        .map(|kernel| {
            let offset = Vec3::new(x, 0.0, kernel_z_offset(kernel, num_kernels));
            square_grid(kind, kernel, offset, size)
        })
        .collect()
}

/// Single column holding every pooled cell of every kernel.
pub fn build_flattened_layer(config: &Configuration) -> LayerGroup {
    column(
        LayerKind::Flattened,
        Vec3::new(stage_x::FLATTENED, 0.0, 0.0),
        config.flattened_size(),
        SPACING * COLUMN_STRETCH,
    )
}

/// FC input column, positioned one-to-one against the flattened column.
pub fn build_fc_input_layer(flattened_size: usize) -> LayerGroup {
    column(
        LayerKind::FcInput,
        Vec3::new(stage_x::FC_INPUT, 0.0, 0.0),
        flattened_size,
        SPACING * COLUMN_STRETCH,
    )
}

pub fn build_hidden_layer() -> LayerGroup {
    column(
        LayerKind::Hidden,
        Vec3::new(stage_x::HIDDEN, 0.0, 0.0),
        HIDDEN_SIZE,
        HIDDEN_SPACING,
    )
}

pub fn build_output_node() -> LayerGroup {
    let mut group = LayerGroup::new(
        LayerKind::Output,
        0,
        Vec3::new(stage_x::OUTPUT, 0.0, 0.0),
        OUTPUT_SIZE,
    );
    group.push(GridCoord { x: 0, y: 0 }, Vec3::ZERO, None);
    group
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(n: u32) -> Configuration {
        Configuration::new(n).unwrap()
    }

    #[test]
    fn input_layers_are_centered_and_stacked() {
        let layers = build_input_layers();
        assert_eq!(layers.len(), 3);
        for (channel, layer) in layers.iter().enumerate() {
            assert_eq!(layer.len(), 64);
            assert_eq!(layer.index, channel);
            assert_eq!(layer.offset.z, (channel as f32 - 1.0) * 3.0);
        }

        let first = layers[0].cells[0];
        assert_eq!(first.grid, GridCoord { x: 0, y: 0 });
        assert_eq!(first.local, Vec3::new(-3.5, -3.5, 0.0));
        assert_eq!(first.position, Vec3::new(-3.5, -3.5, -3.0));

        // y varies fastest.
        let second = layers[0].cells[1];
        assert_eq!(second.grid, GridCoord { x: 0, y: 1 });

        let last = layers[2].cells[63];
        assert_eq!(last.position, Vec3::new(3.5, 3.5, 3.0));
    }

    #[test]
    fn pooled_grid_is_centered() {
        let pooled = build_pooled_layers(&cfg(1));
        assert_eq!(pooled.len(), 1);
        let group = &pooled[0];
        assert_eq!(group.len(), 16);
        assert_eq!(group.cells[0].local, Vec3::new(-1.5, -1.5, 0.0));
        assert_eq!(group.cells[15].local, Vec3::new(1.5, 1.5, 0.0));
        assert_eq!(group.offset, Vec3::new(20.0, 0.0, 0.0));
    }

    #[test]
    fn output_layers_spread_along_z() {
        let outputs = build_output_layers(&cfg(4));
        let offsets: Vec<f32> = outputs.iter().map(|g| g.offset.z).collect();
        assert_eq!(offsets, vec![-6.0, -2.0, 2.0, 6.0]);
        assert!(outputs.iter().all(|g| g.offset.x == 12.0 && g.len() == 64));
        assert!(outputs
            .iter()
            .enumerate()
            .all(|(k, g)| g.cells.iter().all(|c| c.group == k)));
    }

    #[test]
    fn flattened_column_records_sources() {
        let flat = build_flattened_layer(&cfg(3));
        assert_eq!(flat.len(), 48);

        let top = flat.cells[47];
        assert!((top.local.y - 23.5 * 1.2).abs() < 1e-4);
        assert!((flat.cells[0].local.y + 23.5 * 1.2).abs() < 1e-4);

        let source = flat.cells[21].source.unwrap();
        assert_eq!(
            source,
            PooledSource {
                kernel: 1,
                pooled_x: 1,
                pooled_y: 1
            }
        );
        assert!(flat.cells.iter().all(|c| c.source.is_some()));
    }

    #[test]
    fn fc_input_mirrors_flattened_heights() {
        let flat = build_flattened_layer(&cfg(2));
        let fc = build_fc_input_layer(flat.len());
        assert_eq!(fc.len(), flat.len());
        for (f, c) in flat.cells.iter().zip(&fc.cells) {
            assert_eq!(f.position.y, c.position.y);
            assert_eq!(c.position.x, 36.0);
            assert!(c.source.is_none());
        }
    }

    #[test]
    fn hidden_and_output_are_fixed() {
        let hidden = build_hidden_layer();
        let ys: Vec<f32> = hidden.positions().map(|p| p.y).collect();
        assert_eq!(ys, vec![-3.0, -1.0, 1.0, 3.0]);
        assert!(hidden.positions().all(|p| p.x == 38.0));

        let output = build_output_node();
        assert_eq!(output.len(), OUTPUT_SIZE);
        assert_eq!(output.cells[0].position, Vec3::new(46.0, 0.0, 0.0));
    }

    #[test]
    fn kinds_map_to_primitives() {
        assert_eq!(LayerKind::Pooled.primitive(), Primitive::Cube);
        assert_eq!(LayerKind::Hidden.primitive(), Primitive::Sphere);
        assert_eq!(LayerKind::Output.extent(), 0.8);
        assert_eq!(LayerKind::FcInput.extent(), 0.6);
    }

    #[test]
    fn only_fc_input_spheres_lack_edges() {
        assert_eq!(LayerKind::Flattened.outline(), Outline::BoxEdges);
        assert_eq!(LayerKind::FcInput.outline(), Outline::None);
        assert_eq!(LayerKind::Hidden.outline(), Outline::SphereGrid);
        assert_eq!(LayerKind::Output.outline(), Outline::SphereGrid);
    }
}
