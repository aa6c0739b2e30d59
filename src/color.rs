use std::fmt;

use palette::{Hsl, IntoColor, Srgb};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SoilColor – an RGB triple used for plotting and the structural model
// ---------------------------------------------------------------------------

/// 8-bit sRGB colour, serialized as an `[r, g, b]` triple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(u8, u8, u8)", into = "(u8, u8, u8)")]
pub struct SoilColor(pub Srgb<u8>);

impl SoilColor {
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        SoilColor(Srgb::new(red, green, blue))
    }

    pub fn rgb(&self) -> (u8, u8, u8) {
        (self.0.red, self.0.green, self.0.blue)
    }

    /// `#rrggbb` notation.
    pub fn hex(&self) -> String {
        let (r, g, b) = self.rgb();
        format!("#{r:02x}{g:02x}{b:02x}")
    }
}

impl From<(u8, u8, u8)> for SoilColor {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        SoilColor::new(r, g, b)
    }
}

impl From<SoilColor> for (u8, u8, u8) {
    fn from(color: SoilColor) -> Self {
        color.rgb()
    }
}

/// CSS `rgb(r, g, b)` notation, as plotting front-ends expect it.
impl fmt::Display for SoilColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (r, g, b) = self.rgb();
        write!(f, "rgb({r}, {g}, {b})")
    }
}

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
/// Used for catalog entries that do not declare a colour of their own.
pub fn generate_palette(n: usize) -> Vec<SoilColor> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            SoilColor(rgb.into_format())
        })
        .collect()
}
