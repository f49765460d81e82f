use std::collections::{BTreeMap, BTreeSet};

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};

use crate::data::model::CellValue;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

fn to_color32(rgb: Srgb) -> Color32 {
    Color32::from_rgb(
        (rgb.red.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.green.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.blue.clamp(0.0, 1.0) * 255.0) as u8,
    )
}

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            to_color32(rgb)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Region colours: region value → Color32
// ---------------------------------------------------------------------------

/// Maps the distinct values of the region column to distinct colours, so
/// a region keeps its colour in the legend, the filter list and the chart.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<CellValue, Color32>,
    default_color: Color32,
}

impl ColorMap {
    pub fn new(unique_values: &BTreeSet<CellValue>) -> Self {
        let palette = generate_palette(unique_values.len());
        let mapping = unique_values.iter().cloned().zip(palette).collect();

        ColorMap {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a given region value.
    pub fn color_for(&self, value: &CellValue) -> Color32 {
        self.mapping
            .get(value)
            .copied()
            .unwrap_or(self.default_color)
    }
}

// ---------------------------------------------------------------------------
// Diverging scale for the correlation heatmap
// ---------------------------------------------------------------------------

fn srgb(r: u8, g: u8, b: u8) -> LinSrgb {
    Srgb::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0).into_linear()
}

/// Blue (−1) → light grey (0) → red (+1), blended in linear RGB.
/// `None` (undefined coefficient) renders dark grey.
pub fn diverging_color(value: Option<f64>) -> Color32 {
    let Some(v) = value.filter(|v| v.is_finite()) else {
        return Color32::DARK_GRAY;
    };
    let cold = srgb(59, 76, 192);
    let neutral = srgb(221, 221, 221);
    let warm = srgb(180, 4, 38);

    let t = v.clamp(-1.0, 1.0) as f32;
    let mixed = if t < 0.0 {
        neutral.mix(cold, -t)
    } else {
        neutral.mix(warm, t)
    };
    to_color32(Srgb::from_linear(mixed))
}

/// Text colour that stays readable on top of [`diverging_color`].
pub fn contrast_text(value: Option<f64>) -> Color32 {
    match value {
        Some(v) if v.abs() > 0.6 => Color32::WHITE,
        _ => Color32::BLACK,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_has_requested_size() {
        assert!(generate_palette(0).is_empty());
        let colors = generate_palette(5);
        assert_eq!(colors.len(), 5);
        assert_ne!(colors[0], colors[1]);
    }

    #[test]
    fn unknown_region_gets_default_color() {
        let values: BTreeSet<_> = ["North", "South"]
            .iter()
            .map(|s| CellValue::Text(s.to_string()))
            .collect();
        let map = ColorMap::new(&values);
        assert_ne!(
            map.color_for(&CellValue::Text("North".into())),
            map.color_for(&CellValue::Text("South".into()))
        );
        assert_eq!(map.color_for(&CellValue::Text("East".into())), Color32::GRAY);
        assert_ne!(map.color_for(&CellValue::Text("North".into())), Color32::GRAY);
    }

    #[test]
    fn diverging_scale_ends() {
        let cold = diverging_color(Some(-1.0));
        let warm = diverging_color(Some(1.0));
        assert!(cold.b() > cold.r());
        assert!(warm.r() > warm.b());
        assert_eq!(diverging_color(None), Color32::DARK_GRAY);
    }
}
