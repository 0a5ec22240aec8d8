//! CIELAB color type
//!
//! Lab values arrive from measurement devices and user input, so every
//! public entry point validates them. Arithmetic results (predicted
//! corrections, mixes) may legitimately leave the nominal domain and are
//! built with the unchecked [`LabColor::new`].

use serde::{Deserialize, Serialize};

use super::error::ColorError;

/// Valid range for L*.
pub const L_RANGE: (f64, f64) = (0.0, 100.0);
/// Valid range for a* and b*.
pub const AB_RANGE: (f64, f64) = (-128.0, 127.0);

/// A color in CIELAB space (D50 unless stated otherwise by the caller).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLab")]
pub struct LabColor {
    /// Lightness, 0..=100
    #[serde(rename = "L")]
    pub l: f64,
    /// Red (+) / green (-) axis
    pub a: f64,
    /// Yellow (+) / blue (-) axis
    pub b: f64,
}

#[derive(Deserialize)]
struct RawLab {
    #[serde(rename = "L", alias = "l")]
    l: f64,
    a: f64,
    b: f64,
}

impl TryFrom<RawLab> for LabColor {
    type Error = ColorError;

    fn try_from(raw: RawLab) -> Result<Self, Self::Error> {
        LabColor::try_new(raw.l, raw.a, raw.b)
    }
}

impl LabColor {
    /// Build a Lab color without validation.
    #[inline]
    pub const fn new(l: f64, a: f64, b: f64) -> Self {
        Self { l, a, b }
    }

    /// Build a Lab color, rejecting non-finite or out-of-domain components.
    pub fn try_new(l: f64, a: f64, b: f64) -> Result<Self, ColorError> {
        let lab = Self { l, a, b };
        lab.validate()?;
        Ok(lab)
    }

    /// Check that all three components are finite and within range.
    pub fn validate(&self) -> Result<(), ColorError> {
        check("L", self.l, L_RANGE)?;
        check("a", self.a, AB_RANGE)?;
        check("b", self.b, AB_RANGE)
    }

    /// Chroma C*ab.
    #[inline]
    pub fn chroma(&self) -> f64 {
        self.a.hypot(self.b)
    }

    /// Hue angle h_ab in degrees, normalized to [0, 360). Neutral colors
    /// report 0.
    pub fn hue(&self) -> f64 {
        if self.a == 0.0 && self.b == 0.0 {
            return 0.0;
        }
        self.b.atan2(self.a).to_degrees().rem_euclid(360.0)
    }

    /// Component-wise difference `self - other` as `[dL, da, db]`.
    #[inline]
    pub fn difference(&self, other: &LabColor) -> [f64; 3] {
        [self.l - other.l, self.a - other.a, self.b - other.b]
    }

    #[inline]
    pub fn to_array(self) -> [f64; 3] {
        [self.l, self.a, self.b]
    }

    #[inline]
    pub fn from_array(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

fn check(field: &'static str, value: f64, (min, max): (f64, f64)) -> Result<(), ColorError> {
    if !value.is_finite() {
        return Err(ColorError::NotFinite { field });
    }
    if value < min || value > max {
        return Err(ColorError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_new_accepts_boundaries() {
        assert!(LabColor::try_new(0.0, -128.0, 127.0).is_ok());
        assert!(LabColor::try_new(100.0, 127.0, -128.0).is_ok());
    }

    #[test]
    fn test_try_new_names_offending_field() {
        let err = LabColor::try_new(50.0, 130.0, 0.0).unwrap_err();
        assert!(matches!(err, ColorError::OutOfRange { field: "a", .. }));

        let err = LabColor::try_new(-0.5, 0.0, 0.0).unwrap_err();
        assert!(matches!(err, ColorError::OutOfRange { field: "L", .. }));

        let err = LabColor::try_new(50.0, 0.0, f64::NAN).unwrap_err();
        assert_eq!(err, ColorError::NotFinite { field: "b" });
    }

    #[test]
    fn test_hue_wraps_into_positive_range() {
        let lab = LabColor::new(50.0, 10.0, -10.0);
        assert!((lab.hue() - 315.0).abs() < 1e-9);
        assert_eq!(LabColor::new(50.0, 0.0, 0.0).hue(), 0.0);
    }

    #[test]
    fn test_serde_uses_capital_l() {
        let lab = LabColor::new(55.0, -37.0, -50.0);
        let json = serde_json::to_string(&lab).unwrap();
        assert_eq!(json, r#"{"L":55.0,"a":-37.0,"b":-50.0}"#);

        let back: LabColor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, lab);
    }

    #[test]
    fn test_deserialize_validates() {
        let result: Result<LabColor, _> = serde_json::from_str(r#"{"L":150,"a":0,"b":0}"#);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("L = 150"), "unexpected error: {err}");
    }
}
