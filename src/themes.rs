use egui::{Color32, Style};

pub mod colorhash;
mod style;
pub use style::Styled;

/// Gorbie-specific semantic style for the `FlameGraphView` widget.
#[derive(Clone, Debug)]
pub struct GorbieFlameGraphStyle {
    /// Outline drawn around the hovered bar.
    pub outline: Color32,
    /// Background the ancestor bars above the zoomed frame are faded towards.
    pub backdrop: Color32,
    /// How far breadcrumb bars are blended into the backdrop.
    pub breadcrumb_fade: f32,
    /// Opacity of bars inside the zoomed subtree.
    pub focused_alpha: u8,
    /// Gap left between neighbouring bars, in points.
    pub bar_gap: f32,
}

impl From<&Style> for GorbieFlameGraphStyle {
    fn from(style: &Style) -> Self {
        let dark_mode = style.visuals.dark_mode;
        Self {
            outline: if dark_mode {
                Color32::WHITE
            } else {
                Color32::BLACK
            },
            backdrop: style.visuals.panel_fill,
            breadcrumb_fade: 0.6,
            focused_alpha: 0xAF,
            bar_gap: 1.0,
        }
    }
}

// Color utilities: simple sRGB linear interpolation for quick palette derivation
pub fn blend(a: Color32, b: Color32, t: f32) -> Color32 {
    let r = (a.r() as f32 * (1.0 - t) + b.r() as f32 * t).round() as u8;
    let g = (a.g() as f32 * (1.0 - t) + b.g() as f32 * t).round() as u8;
    let bch = (a.b() as f32 * (1.0 - t) + b.b() as f32 * t).round() as u8;
    Color32::from_rgb(r, g, bch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blend_endpoints() {
        let a = Color32::from_rgb(255, 64, 0);
        let b = Color32::from_rgb(0, 0, 255);
        assert_eq!(blend(a, b, 0.0), a);
        assert_eq!(blend(a, b, 1.0), b);
        assert_eq!(blend(a, b, 0.5), Color32::from_rgb(128, 32, 128));
    }
}
