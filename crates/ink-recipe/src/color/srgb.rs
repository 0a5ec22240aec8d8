//! sRGB color type
//!
//! Used for on-screen swatches of targets and predicted mixes. sRGB is
//! defined against D65, so XYZ in any other white must be adapted first.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ColorError;
use super::xyz::{mat_vec, Mat3, WhitePoint, XyzColor};

const XYZ_TO_LINEAR: Mat3 = [
    [3.2404542, -1.5371385, -0.4985314],
    [-0.9692660, 1.8760108, 0.0415560],
    [0.0556434, -0.2040259, 1.0572252],
];

const LINEAR_TO_XYZ: Mat3 = [
    [0.4124564, 0.3575761, 0.1804375],
    [0.2126729, 0.7151522, 0.0721750],
    [0.0193339, 0.1191920, 0.9503041],
];

/// A gamma-encoded sRGB color, channels nominally in 0.0..=1.0.
///
/// Out-of-gamut conversions keep their raw channel values; use
/// [`Srgb::in_gamut`] to test and [`Srgb::to_bytes`] to clamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Srgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Srgb {
    #[inline]
    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    #[inline]
    pub fn from_u8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
        }
    }

    /// Round and clamp to 8-bit channels.
    pub fn to_bytes(self) -> [u8; 3] {
        [
            (self.r * 255.0).round().clamp(0.0, 255.0) as u8,
            (self.g * 255.0).round().clamp(0.0, 255.0) as u8,
            (self.b * 255.0).round().clamp(0.0, 255.0) as u8,
        ]
    }

    /// True when every channel lies in 0..=1 (with a small tolerance).
    pub fn in_gamut(&self) -> bool {
        const TOL: f64 = 1e-9;
        [self.r, self.g, self.b]
            .iter()
            .all(|c| (-TOL..=1.0 + TOL).contains(c))
    }

    /// `#RRGGBB` form, clamped.
    pub fn to_hex(self) -> String {
        let [r, g, b] = self.to_bytes();
        format!("#{r:02X}{g:02X}{b:02X}")
    }
}

impl fmt::Display for Srgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Srgb {
    type Err = ColorError;

    /// Parse `#RRGGBB`, `RRGGBB`, `#RGB` or `RGB`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        let invalid = || ColorError::InvalidHex(s.to_string());
        let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());
        if !hex.is_ascii() {
            return Err(invalid());
        }

        match hex.len() {
            6 => Ok(Self::from_u8(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => {
                let expand = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
                Ok(Self::from_u8(expand(0)?, expand(1)?, expand(2)?))
            }
            _ => Err(invalid()),
        }
    }
}

#[inline]
fn encode(linear: f64) -> f64 {
    if linear <= 0.0031308 {
        12.92 * linear
    } else {
        1.055 * linear.powf(1.0 / 2.4) - 0.055
    }
}

#[inline]
fn decode(encoded: f64) -> f64 {
    if encoded <= 0.04045 {
        encoded / 12.92
    } else {
        ((encoded + 0.055) / 1.055).powf(2.4)
    }
}

/// Convert D65 XYZ to gamma-encoded sRGB.
pub fn xyz_to_rgb(xyz: XyzColor) -> Result<Srgb, ColorError> {
    if xyz.white != WhitePoint::D65 {
        return Err(ColorError::WhitePointMismatch {
            expected: WhitePoint::D65,
            found: xyz.white,
        });
    }
    let scaled = [xyz.x / 100.0, xyz.y / 100.0, xyz.z / 100.0];
    let [r, g, b] = mat_vec(&XYZ_TO_LINEAR, scaled);
    // Odd extension keeps out-of-gamut negatives invertible.
    let enc = |c: f64| c.signum() * encode(c.abs());
    Ok(Srgb::new(enc(r), enc(g), enc(b)))
}

/// Convert gamma-encoded sRGB to D65 XYZ.
pub fn rgb_to_xyz(rgb: Srgb) -> XyzColor {
    let dec = |c: f64| c.signum() * decode(c.abs());
    let [x, y, z] = mat_vec(&LINEAR_TO_XYZ, [dec(rgb.r), dec(rgb.g), dec(rgb.b)]);
    XyzColor::new(x * 100.0, y * 100.0, z * 100.0, WhitePoint::D65)
}
