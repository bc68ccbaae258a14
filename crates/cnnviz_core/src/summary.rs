//! Human-readable description of the current pipeline shape.

use crate::config::{Configuration, INPUT_CHANNELS, LAYER_SIZE, POOLED_SIZE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSummary {
    pub kernel_info: String,
    pub pipeline_shape: String,
}

pub fn describe(config: &Configuration) -> PipelineSummary {
    let k = config.num_kernels();
    let plural = if k > 1 { "s" } else { "" };
    let flattened = config.flattened_size();

    let kernel_info = format!(
        "Using {k} kernel{plural} creates {k} grayscale feature map{plural}, \
         each highlighting different aspects of the input image."
    );
    let pipeline_shape = format!(
        "Current setup: {l}×{l}×{c} input → {k} kernels → {k} feature maps ({l}×{l}) \
         → max pool → {k} pooled maps ({p}×{p}) → flatten → {flattened} neurons \
         → FC input ({fc} nodes)",
        l = LAYER_SIZE,
        c = INPUT_CHANNELS,
        p = POOLED_SIZE,
        fc = config.fc_input_size(),
    );

    PipelineSummary {
        kernel_info,
        pipeline_shape,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_kernels_text() {
        let summary = describe(&Configuration::new(3).unwrap());
        assert_eq!(
            summary.kernel_info,
            "Using 3 kernels creates 3 grayscale feature maps, each highlighting different aspects of the input image."
        );
        assert_eq!(
            summary.pipeline_shape,
            "Current setup: 8×8×3 input → 3 kernels → 3 feature maps (8×8) → max pool → 3 pooled maps (4×4) → flatten → 48 neurons → FC input (48 nodes)"
        );
    }

    #[test]
    fn single_kernel_is_singular() {
        let summary = describe(&Configuration::new(1).unwrap());
        assert!(summary.kernel_info.starts_with("Using 1 kernel creates 1 grayscale feature map,"));
        assert!(summary.pipeline_shape.contains("→ 16 neurons →"));
    }
}
