//! Scene snapshot tying every layer group and connection to one configuration.

use tracing::debug;

use crate::config::Configuration;
use crate::connections::{build_connections, Connection};
use crate::error::LayoutResult;
use crate::layout::{
    build_fc_input_layer, build_flattened_layer, build_hidden_layer, build_input_layers,
    build_output_layers, build_output_node, build_pooled_layers, Cell, LayerGroup,
};
use crate::summary::{describe, PipelineSummary};

/// Every group downstream of the input layers. Rebuilt as a unit.
#[derive(Debug, Clone, PartialEq)]
struct Downstream {
    conv_outputs: Vec<LayerGroup>,
    pooled: Vec<LayerGroup>,
    flattened: LayerGroup,
    fc_input: LayerGroup,
    hidden: LayerGroup,
    output: LayerGroup,
    connections: Vec<Connection>,
}

impl Downstream {
    fn build(config: &Configuration) -> Self {
        let conv_outputs = build_output_layers(config);
        let pooled = build_pooled_layers(config);
        let flattened = build_flattened_layer(config);
        let fc_input = build_fc_input_layer(flattened.len());
        let hidden = build_hidden_layer();
        let output = build_output_node();
        let connections = build_connections(&flattened, &fc_input, &hidden, &output);

        Self {
            conv_outputs,
            pooled,
            flattened,
            fc_input,
            hidden,
            output,
            connections,
        }
    }
}

/// Complete geometry for one configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneLayout {
    config: Configuration,
    inputs: Vec<LayerGroup>,
    downstream: Downstream,
}

impl SceneLayout {
    pub fn build(config: Configuration) -> Self {
        let layout = Self {
            config,
            inputs: build_input_layers(),
            downstream: Downstream::build(&config),
        };
        layout.log_sizes();
        layout
    }

    /// Replaces every group downstream of the inputs and all connections.
    pub fn rebuild(&mut self, config: Configuration) {
        self.downstream = Downstream::build(&config);
        self.config = config;
        self.log_sizes();
    }

    /// Validates `num_kernels` and rebuilds for it.
    ///
    /// Validation happens before anything is touched, so on error the current
    /// snapshot is unchanged.
    pub fn set_kernels(&mut self, num_kernels: u32) -> LayoutResult<()> {
        let config = Configuration::new(num_kernels)?;
        self.rebuild(config);
        Ok(())
    }

    fn log_sizes(&self) {
        debug!(
            kernels = self.config.num_kernels(),
            cells = self.cell_count(),
            connections = self.downstream.connections.len(),
            "scene layout built"
        );
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn inputs(&self) -> &[LayerGroup] {
        &self.inputs
    }

    pub fn conv_outputs(&self) -> &[LayerGroup] {
        &self.downstream.conv_outputs
    }

    pub fn pooled(&self) -> &[LayerGroup] {
        &self.downstream.pooled
    }

    pub fn flattened(&self) -> &LayerGroup {
        &self.downstream.flattened
    }

    pub fn fc_input(&self) -> &LayerGroup {
        &self.downstream.fc_input
    }

    pub fn hidden(&self) -> &LayerGroup {
        &self.downstream.hidden
    }

    pub fn output(&self) -> &LayerGroup {
        &self.downstream.output
    }

    pub fn connections(&self) -> &[Connection] {
        &self.downstream.connections
    }

    pub fn flattened_size(&self) -> usize {
        self.downstream.flattened.len()
    }

    pub fn fc_input_size(&self) -> usize {
        self.downstream.fc_input.len()
    }

    /// All groups in pipeline order.
    pub fn groups(&self) -> impl Iterator<Item = &LayerGroup> + '_ {
        let d = &self.downstream;
        self.inputs
            .iter()
            .chain(&d.conv_outputs)
            .chain(&d.pooled)
            .chain([&d.flattened, &d.fc_input, &d.hidden, &d.output])
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.groups().flat_map(|group| group.cells.iter())
    }

    pub fn cell_count(&self) -> usize {
        self.groups().map(LayerGroup::len).sum()
    }

    pub fn summary(&self) -> PipelineSummary {
        describe(&self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LayoutError;
    use crate::layout::LayerKind;

    fn cfg(n: u32) -> Configuration {
        Configuration::new(n).unwrap()
    }

    #[test]
    fn build_counts_every_group() {
        let scene = SceneLayout::build(cfg(3));
        assert_eq!(scene.inputs().len(), 3);
        assert_eq!(scene.conv_outputs().len(), 3);
        assert_eq!(scene.pooled().len(), 3);
        assert_eq!(scene.flattened_size(), 48);
        assert_eq!(scene.fc_input_size(), 48);
        assert_eq!(scene.hidden().len(), 4);
        assert_eq!(scene.output().len(), 1);
        assert_eq!(scene.connections().len(), 244);
        assert_eq!(scene.cell_count(), 192 + 192 + 48 + 48 + 48 + 4 + 1);
    }

    #[test]
    fn groups_come_in_pipeline_order() {
        let scene = SceneLayout::build(cfg(2));
        let kinds: Vec<LayerKind> = scene.groups().map(|g| g.kind).collect();
        assert_eq!(
            kinds,
            vec![
                LayerKind::Input,
                LayerKind::Input,
                LayerKind::Input,
                LayerKind::ConvOutput,
                LayerKind::ConvOutput,
                LayerKind::Pooled,
                LayerKind::Pooled,
                LayerKind::Flattened,
                LayerKind::FcInput,
                LayerKind::Hidden,
                LayerKind::Output,
            ]
        );
    }

    #[test]
    fn rebuild_keeps_inputs_and_replaces_downstream() {
        let mut scene = SceneLayout::build(cfg(3));
        let inputs_before = scene.inputs().to_vec();

        scene.rebuild(cfg(5));
        assert_eq!(scene.inputs(), inputs_before.as_slice());
        assert_eq!(scene.conv_outputs().len(), 5);
        assert_eq!(scene.flattened_size(), 80);
        assert_eq!(scene.connections().len(), 80 + 80 * 4 + 4);
        assert_eq!(scene.config().num_kernels(), 5);
    }

    #[test]
    fn rebuild_is_idempotent() {
        let mut scene = SceneLayout::build(cfg(4));
        let before = scene.clone();
        scene.rebuild(cfg(4));
        assert_eq!(scene, before);
    }

    #[test]
    fn summary_tracks_rebuilds() {
        let mut scene = SceneLayout::build(cfg(3));
        scene.set_kernels(1).unwrap();
        assert!(scene.summary().pipeline_shape.contains("16 neurons"));
    }

    #[test]
    fn zero_kernels_leave_scene_untouched() {
        let mut scene = SceneLayout::build(cfg(3));
        let before = scene.clone();

        let err = scene.set_kernels(0).unwrap_err();
        assert_eq!(
            err,
            LayoutError::InvalidConfiguration("kernel count must be at least 1".into())
        );
        assert_eq!(scene, before);
    }
}
