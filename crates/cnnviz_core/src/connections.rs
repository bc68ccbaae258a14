//! Line connections between the fully-connected stages.

use glam::Vec3;

use crate::layout::LayerGroup;
use crate::palette::{self, Rgb};
use crate::Scalar;

/// Which pair of stages a connection joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionStage {
    FlattenedToFc,
    FcToHidden,
    HiddenToOutput,
}

/// Visual style shared by every connection line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineStyle {
    pub color: Rgb,
    pub opacity: Scalar,
}

impl LineStyle {
    pub const CONNECTION: LineStyle = LineStyle {
        color: palette::CONNECTION,
        opacity: 0.3,
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connection {
    pub from: Vec3,
    pub to: Vec3,
    pub stage: ConnectionStage,
    pub style: LineStyle,
}

impl Connection {
    fn new(from: Vec3, to: Vec3, stage: ConnectionStage) -> Self {
        Self {
            from,
            to,
            stage,
            style: LineStyle::CONNECTION,
        }
    }
}

/// Number of lines [`build_connections`] produces for the given column sizes.
pub fn connection_count(flattened: usize, fc_input: usize, hidden: usize, output: usize) -> usize {
    let one_to_one = if fc_input == 0 { 0 } else { flattened };
    one_to_one + fc_input * hidden + hidden * output
}

/// Builds the three connection passes: flattened→FC one-to-one, FC→hidden and
/// hidden→output fully bipartite.
pub fn build_connections(
    flattened: &LayerGroup,
    fc_input: &LayerGroup,
    hidden: &LayerGroup,
    output: &LayerGroup,
) -> Vec<Connection> {
    let mut lines = Vec::with_capacity(connection_count(
        flattened.len(),
        fc_input.len(),
        hidden.len(),
        output.len(),
    ));

    if !fc_input.is_empty() {
        for (i, cell) in flattened.cells.iter().enumerate() {
            let target = &fc_input.cells[i % fc_input.len()];
            lines.push(Connection::new(
                cell.position,
                target.position,
                ConnectionStage::FlattenedToFc,
            ));
        }
    }

    for fc in fc_input.positions() {
        for node in hidden.positions() {
            lines.push(Connection::new(fc, node, ConnectionStage::FcToHidden));
        }
    }

    for node in hidden.positions() {
        for out in output.positions() {
            lines.push(Connection::new(node, out, ConnectionStage::HiddenToOutput));
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;
    use crate::layout::{
        build_fc_input_layer, build_flattened_layer, build_hidden_layer, build_output_node,
    };

    #[test]
    fn three_kernels_produce_244_lines() {
        let cfg = Configuration::new(3).unwrap();
        let flat = build_flattened_layer(&cfg);
        let fc = build_fc_input_layer(flat.len());
        let hidden = build_hidden_layer();
        let output = build_output_node();

        let lines = build_connections(&flat, &fc, &hidden, &output);
        assert_eq!(lines.len(), 244);
        assert_eq!(connection_count(48, 48, 4, 1), 244);

        let one_to_one = lines
            .iter()
            .filter(|l| l.stage == ConnectionStage::FlattenedToFc)
            .count();
        assert_eq!(one_to_one, 48);

        // Flattened→FC lines are horizontal.
        for line in lines
            .iter()
            .filter(|l| l.stage == ConnectionStage::FlattenedToFc)
        {
            assert_eq!(line.from.y, line.to.y);
            assert_eq!(line.from.x, 28.0);
            assert_eq!(line.to.x, 36.0);
        }

        let last = lines.last().unwrap();
        assert_eq!(last.stage, ConnectionStage::HiddenToOutput);
        assert_eq!(last.to, output.cells[0].position);
    }

    #[test]
    fn short_fc_column_wraps_indices() {
        let cfg = Configuration::new(1).unwrap();
        let flat = build_flattened_layer(&cfg);
        let fc = build_fc_input_layer(4);
        let lines = build_connections(&flat, &fc, &build_hidden_layer(), &build_output_node());

        let flat_lines: Vec<_> = lines
            .iter()
            .filter(|l| l.stage == ConnectionStage::FlattenedToFc)
            .collect();
        assert_eq!(flat_lines.len(), 16);
        assert_eq!(flat_lines[5].to, fc.cells[1].position);
    }

    #[test]
    fn every_line_uses_connection_style() {
        let cfg = Configuration::new(2).unwrap();
        let flat = build_flattened_layer(&cfg);
        let fc = build_fc_input_layer(flat.len());
        let lines = build_connections(&flat, &fc, &build_hidden_layer(), &build_output_node());
        assert!(lines.iter().all(|l| l.style == LineStyle::CONNECTION));
        assert!((LineStyle::CONNECTION.opacity - 0.3).abs() < f32::EPSILON);
    }
}
