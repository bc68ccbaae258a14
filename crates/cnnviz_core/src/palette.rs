//! Colour classes for each layer kind.

use crate::layout::LayerKind;
use crate::Scalar;

/// sRGB colour stored as `0xRRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u32);

impl Rgb {
    pub fn srgb(self) -> [Scalar; 3] {
        [
            ((self.0 >> 16) & 0xff) as Scalar / 255.0,
            ((self.0 >> 8) & 0xff) as Scalar / 255.0,
            (self.0 & 0xff) as Scalar / 255.0,
        ]
    }

    /// Linear-light components, as expected by an sRGB render target.
    pub fn linear(self) -> [Scalar; 3] {
        self.srgb().map(srgb_to_linear)
    }

    pub fn linear_rgba(self, alpha: Scalar) -> [Scalar; 4] {
        let [r, g, b] = self.linear();
        [r, g, b, alpha]
    }
}

pub fn srgb_to_linear(c: Scalar) -> Scalar {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

pub const BACKGROUND: Rgb = Rgb(0x1a1a2e);
pub const CONNECTION: Rgb = Rgb(0x666666);
pub const EDGE: Rgb = Rgb(0x000000);

const INPUT_CHANNELS: [Rgb; 3] = [Rgb(0xff4444), Rgb(0x44ff44), Rgb(0x4444ff)];

/// Colour of a cell of `kind` in group `group`.
///
/// Only input cells vary by group (one colour per channel); every other kind has
/// one colour for all of its groups.
pub fn base_color(kind: LayerKind, group: usize) -> Rgb {
    match kind {
        LayerKind::Input => INPUT_CHANNELS[group % INPUT_CHANNELS.len()],
        LayerKind::ConvOutput => Rgb(0x888888),
        LayerKind::Pooled => Rgb(0x666666),
        LayerKind::Flattened => Rgb(0x9966cc),
        LayerKind::FcInput => Rgb(0xff9933),
        LayerKind::Hidden => Rgb(0x33cc33),
        LayerKind::Output => Rgb(0xcc3333),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_components_unpack() {
        assert_eq!(Rgb(0xff0000).srgb(), [1.0, 0.0, 0.0]);
        let [r, g, b] = BACKGROUND.srgb();
        assert!((r - 26.0 / 255.0).abs() < 1e-6);
        assert!((g - 26.0 / 255.0).abs() < 1e-6);
        assert!((b - 46.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn linear_conversion_keeps_endpoints() {
        assert_eq!(srgb_to_linear(0.0), 0.0);
        assert!((srgb_to_linear(1.0) - 1.0).abs() < 1e-6);
        assert!(srgb_to_linear(0.5) < 0.5);
    }

    #[test]
    fn output_layer_and_output_node_colors_differ() {
        assert_ne!(
            base_color(LayerKind::ConvOutput, 0),
            base_color(LayerKind::Output, 0)
        );
        assert_eq!(base_color(LayerKind::Input, 2), Rgb(0x4444ff));
        assert_eq!(
            base_color(LayerKind::Pooled, 0),
            base_color(LayerKind::Pooled, 5)
        );
    }
}
