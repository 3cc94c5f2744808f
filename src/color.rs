use std::str::FromStr;

use palette::{Hsl, IntoColor, Lighten, Srgb};
use plotters::style::RGBColor;

// ---------------------------------------------------------------------------
// Cohort colours
// ---------------------------------------------------------------------------

/// xkcd "pale red".
pub const REFERENCE_HEX: &str = "#d9544d";
/// xkcd "denim blue".
pub const TARGET_HEX: &str = "#3b5b92";

/// Parse a `#rrggbb` colour; falls back to grey on malformed input.
pub fn from_hex(hex: &str) -> RGBColor {
    match Srgb::<u8>::from_str(hex) {
        Ok(c) => RGBColor(c.red, c.green, c.blue),
        Err(_) => RGBColor(128, 128, 128),
    }
}

/// A lighter tint of `base` for annotation box backgrounds.
pub fn tint(base: RGBColor, amount: f32) -> RGBColor {
    let rgb: Srgb = Srgb::new(base.0, base.1, base.2).into_format();
    let hsl: Hsl = rgb.into_color();
    let light: Srgb = hsl.lighten(amount).into_color();
    let out: Srgb<u8> = light.into_format();
    RGBColor(out.red, out.green, out.blue)
}

/// Colour pair used for (reference, target) cohorts.
pub fn cohort_colors() -> (RGBColor, RGBColor) {
    (from_hex(REFERENCE_HEX), from_hex(TARGET_HEX))
}
