//! Sampled spectral curves and resampling onto the fixed grid.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::data::{wavelength, GRID_LEN, GRID_STEP};
use super::error::SpectralError;

/// Values on the 380-780 nm, 10 nm grid.
pub type Spectrum = [f64; GRID_LEN];

/// Largest gap (nm) bridged by linear interpolation when resampling.
const MAX_INTERPOLATION_GAP: u32 = 2 * GRID_STEP;

/// A measured curve: wavelength in nm to value (reflectance factor 0..1
/// or relative power).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<u32, f64>", into = "BTreeMap<u32, f64>")]
pub struct SpectralCurve {
    samples: BTreeMap<u32, f64>,
}

impl TryFrom<BTreeMap<u32, f64>> for SpectralCurve {
    type Error = SpectralError;

    fn try_from(samples: BTreeMap<u32, f64>) -> Result<Self, Self::Error> {
        Self::new(samples)
    }
}

impl From<SpectralCurve> for BTreeMap<u32, f64> {
    fn from(curve: SpectralCurve) -> Self {
        curve.samples
    }
}

/// Outcome of putting a curve on the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Resampled {
    pub values: Spectrum,
    /// Grid wavelengths with no usable data; their value is zero.
    pub missing: Vec<u32>,
}

impl SpectralCurve {
    /// Build from `(nm, value)` pairs, rejecting negative or non-finite values.
    pub fn new(samples: impl IntoIterator<Item = (u32, f64)>) -> Result<Self, SpectralError> {
        let curve = Self {
            samples: samples.into_iter().collect(),
        };
        curve.validate()?;
        Ok(curve)
    }

    /// Build from values already on the grid.
    pub fn from_grid(values: &Spectrum) -> Self {
        Self {
            samples: values
                .iter()
                .enumerate()
                .map(|(i, &v)| (wavelength(i), v))
                .collect(),
        }
    }

    pub fn validate(&self) -> Result<(), SpectralError> {
        if self.samples.is_empty() {
            return Err(SpectralError::Empty);
        }
        for (&wavelength, &value) in &self.samples {
            if !value.is_finite() || value < 0.0 {
                return Err(SpectralError::InvalidSample { wavelength, value });
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, nm: u32) -> Option<f64> {
        self.samples.get(&nm).copied()
    }

    /// Resample onto the grid. Exact samples are used directly, gaps up to
    /// 20 nm are linearly interpolated, anything else counts as missing.
    pub fn resample(&self) -> Resampled {
        let mut values = [0.0; GRID_LEN];
        let mut missing = Vec::new();

        for (i, slot) in values.iter_mut().enumerate() {
            let nm = wavelength(i);
            if let Some(v) = self.samples.get(&nm) {
                *slot = *v;
                continue;
            }
            let below = self.samples.range(..nm).next_back();
            let above = self.samples.range(nm..).next();
            match (below, above) {
                (Some((&l0, &v0)), Some((&l1, &v1))) if l1 - l0 <= MAX_INTERPOLATION_GAP => {
                    let t = (nm - l0) as f64 / (l1 - l0) as f64;
                    *slot = v0 + t * (v1 - v0);
                }
                _ => missing.push(nm),
            }
        }

        Resampled { values, missing }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_curve_resamples_exactly() {
        let mut grid = [0.0; GRID_LEN];
        for (i, v) in grid.iter_mut().enumerate() {
            *v = i as f64 / 100.0;
        }
        let r = SpectralCurve::from_grid(&grid).resample();
        assert_eq!(r.values, grid);
        assert!(r.missing.is_empty());
    }

    #[test]
    fn test_5nm_offsets_interpolate() {
        let curve = SpectralCurve::new((0..41).map(|i| (375 + 10 * i, 0.5))).unwrap();
        let r = curve.resample();
        // 780 is above the last sample (775)
        assert_eq!(r.missing, vec![780]);
        assert!((r.values[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_missing_range_is_reported_as_zero() {
        let curve = SpectralCurve::new((40..=70).map(|i| (10 * i, 0.8))).unwrap();
        let r = curve.resample();
        assert_eq!(r.missing.len(), 10);
        assert_eq!(r.missing[..3], [380, 390, 710]);
        assert_eq!(r.values[40], 0.0);
    }

    #[test]
    fn test_rejects_negative() {
        let err = SpectralCurve::new([(500, -0.1)]).unwrap_err();
        assert_eq!(
            err,
            SpectralError::InvalidSample {
                wavelength: 500,
                value: -0.1
            }
        );
    }

    #[test]
    fn test_serializes_as_map() {
        let curve = SpectralCurve::new([(400, 0.25), (410, 0.5)]).unwrap();
        let json = serde_json::to_string(&curve).unwrap();
        assert_eq!(json, r#"{"400":0.25,"410":0.5}"#);
        let back: SpectralCurve = serde_json::from_str(&json).unwrap();
        assert_eq!(back, curve);
    }
}
