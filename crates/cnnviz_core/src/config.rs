//! Configuration and fixed layout constants for the CNN flow diagram.

use serde::{Deserialize, Serialize};

use crate::error::{LayoutError, LayoutResult};
use crate::Scalar;

/// Number of colour channels in the input image.
pub const INPUT_CHANNELS: usize = 3;
/// Side length of the input image and of every convolution feature map.
pub const LAYER_SIZE: usize = 8;
/// Side length of a feature map after 2×2 max pooling with stride 2.
pub const POOLED_SIZE: usize = 4;
/// Number of nodes in the hidden fully-connected layer.
pub const HIDDEN_SIZE: usize = 4;
/// Number of output nodes.
pub const OUTPUT_SIZE: usize = 1;

/// Base distance between neighbouring grid cells.
pub const SPACING: Scalar = 1.0;
/// Distance between the three stacked input channels along Z.
pub const LAYER_SPACING: Scalar = 3.0;
/// Distance between neighbouring kernels' feature maps along Z.
pub const KERNEL_SPREAD: Scalar = 4.0;
/// Vertical stretch applied to the flattened and FC-input columns.
pub const COLUMN_STRETCH: Scalar = 1.2;
/// Vertical distance between hidden nodes.
pub const HIDDEN_SPACING: Scalar = 2.0;

/// X position of each stage along the pipeline axis.
pub mod stage_x {
    use crate::Scalar;

    pub const INPUT: Scalar = 0.0;
    pub const CONV_OUTPUT: Scalar = 12.0;
    pub const POOLED: Scalar = 20.0;
    pub const FLATTENED: Scalar = 28.0;
    pub const FC_INPUT: Scalar = 36.0;
    pub const HIDDEN: Scalar = 38.0;
    pub const OUTPUT: Scalar = 46.0;
}

/// Kernel count used when the viewer starts.
pub const DEFAULT_KERNELS: u32 = 3;
/// Upper bound exposed by the kernel slider. The layout itself does not cap it.
pub const SLIDER_MAX_KERNELS: u32 = 6;

/// The single runtime-tunable parameter of the diagram.
///
/// Instances are always valid: construction and deserialization both reject a
/// kernel count of zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawConfiguration")]
pub struct Configuration {
    num_kernels: u32,
}

#[derive(Deserialize)]
struct RawConfiguration {
    num_kernels: u32,
}

impl TryFrom<RawConfiguration> for Configuration {
    type Error = LayoutError;

    fn try_from(raw: RawConfiguration) -> LayoutResult<Self> {
        Configuration::new(raw.num_kernels)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            num_kernels: DEFAULT_KERNELS,
        }
    }
}

impl Configuration {
    pub fn new(num_kernels: u32) -> LayoutResult<Self> {
        if num_kernels == 0 {
            return Err(LayoutError::InvalidConfiguration(
                "kernel count must be at least 1".into(),
            ));
        }
        Ok(Self { num_kernels })
    }

    pub fn num_kernels(&self) -> u32 {
        self.num_kernels
    }

    /// Cells in one pooled feature map.
    pub const fn pooled_area() -> usize {
        POOLED_SIZE * POOLED_SIZE
    }

    /// Length of the flattened vector: every pooled cell of every kernel.
    pub fn flattened_size(&self) -> usize {
        Self::pooled_area() * self.num_kernels as usize
    }

    /// The FC input column mirrors the flattened column one-to-one.
    pub fn fc_input_size(&self) -> usize {
        self.flattened_size()
    }

    /// Z offset of kernel `kernel`, spreading all kernels symmetrically around zero.
    pub fn kernel_z(&self, kernel: usize) -> Scalar {
        kernel_z_offset(kernel, self.num_kernels as usize)
    }
}

pub(crate) fn kernel_z_offset(kernel: usize, num_kernels: usize) -> Scalar {
    let center = (num_kernels as Scalar - 1.0) / 2.0;
    (kernel as Scalar - center) * KERNEL_SPREAD
}
