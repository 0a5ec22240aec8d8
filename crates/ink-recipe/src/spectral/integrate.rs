//! Integration of measured curves with data-quality tracking.

use serde::Serialize;

use super::curve::SpectralCurve;
use super::illuminant::WeightTable;
use crate::color::LabColor;

/// Wavelengths that had to be treated as zero during integration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DataQuality {
    /// Grid wavelengths missing from reflectance curves.
    pub missing_reflectance: Vec<u32>,
    /// Grid wavelengths missing from the illuminant.
    pub missing_illuminant: Vec<u32>,
}

impl DataQuality {
    pub fn is_complete(&self) -> bool {
        self.missing_reflectance.is_empty() && self.missing_illuminant.is_empty()
    }

    /// Fold another report into this one, keeping wavelengths sorted and unique.
    pub fn merge(&mut self, other: &DataQuality) {
        merge_sorted(&mut self.missing_reflectance, &other.missing_reflectance);
        merge_sorted(&mut self.missing_illuminant, &other.missing_illuminant);
    }

    pub(crate) fn add_reflectance_gaps(&mut self, gaps: &[u32]) {
        merge_sorted(&mut self.missing_reflectance, gaps);
    }

    pub(crate) fn add_illuminant_gaps(&mut self, gaps: &[u32]) {
        merge_sorted(&mut self.missing_illuminant, gaps);
    }
}

fn merge_sorted(into: &mut Vec<u32>, from: &[u32]) {
    into.extend_from_slice(from);
    into.sort_unstable();
    into.dedup();
}

/// Color of a measured curve under one illuminant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Integrated {
    pub xyz: [f64; 3],
    pub lab: LabColor,
    pub quality: DataQuality,
}

/// Integrate a measured reflectance curve. Missing wavelengths contribute
/// zero and are logged as a data-quality warning.
pub fn integrate_curve(curve: &SpectralCurve, table: &WeightTable) -> Integrated {
    let resampled = curve.resample();
    let mut quality = DataQuality::default();
    quality.add_reflectance_gaps(&resampled.missing);
    quality.add_illuminant_gaps(table.missing());

    if !quality.is_complete() {
        tracing::warn!(
            illuminant = table.illuminant(),
            missing_reflectance = ?quality.missing_reflectance,
            missing_illuminant = ?quality.missing_illuminant,
            "Incomplete spectral data, missing wavelengths contribute zero"
        );
    }

    Integrated {
        xyz: table.tristimulus(&resampled.values),
        lab: table.lab(&resampled.values),
        quality,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Illuminant;
    use crate::spectral::{IlluminantSpd, GRID_LEN};

    #[test]
    fn test_complete_curve_has_clean_quality() {
        let table = IlluminantSpd::standard(Illuminant::D65).weights().unwrap();
        let curve = SpectralCurve::from_grid(&[0.5; GRID_LEN]);
        let out = integrate_curve(&curve, &table);
        assert!(out.quality.is_complete());
        assert!((out.xyz[1] - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_truncated_curve_is_darker_and_flagged() {
        let table = IlluminantSpd::standard(Illuminant::D65).weights().unwrap();
        let full = integrate_curve(&SpectralCurve::from_grid(&[0.5; GRID_LEN]), &table);
        let short = SpectralCurve::new((38..=60).map(|i| (i * 10, 0.5))).unwrap();
        let out = integrate_curve(&short, &table);
        assert_eq!(out.quality.missing_reflectance.first(), Some(&610));
        assert!(out.xyz[0] < full.xyz[0]);
    }

    #[test]
    fn test_merge_dedups() {
        let mut a = DataQuality {
            missing_reflectance: vec![380, 390],
            missing_illuminant: vec![],
        };
        a.merge(&DataQuality {
            missing_reflectance: vec![390, 780],
            missing_illuminant: vec![700],
        });
        assert_eq!(a.missing_reflectance, vec![380, 390, 780]);
        assert_eq!(a.missing_illuminant, vec![700]);
    }
}
