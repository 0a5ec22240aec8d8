//! Illuminant power distributions and precomputed integration weights.

use super::curve::{SpectralCurve, Spectrum};
use super::data::{wavelength, CMF_X, CMF_Y, CMF_Z, GRID_LEN, SPD_D50, SPD_D65, SPD_F11};
use super::error::SpectralError;
use crate::color::{lab_to_xyz_raw, xyz_to_lab_raw, Illuminant, LabColor};

/// Second radiation constant in nm·K as used by the CIE definition of A.
const C2: f64 = 1.435e7;
/// Correlated color temperature of CIE illuminant A.
const CCT_A: f64 = 2856.0;

/// Relative spectral power distribution of a light source on the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct IlluminantSpd {
    name: String,
    power: Spectrum,
    missing: Vec<u32>,
}

impl IlluminantSpd {
    /// One of the built-in CIE illuminants.
    pub fn standard(illuminant: Illuminant) -> Self {
        let power = match illuminant {
            Illuminant::D50 => SPD_D50,
            Illuminant::D65 => SPD_D65,
            Illuminant::F11 => SPD_F11,
            Illuminant::A => planck(CCT_A),
        };
        Self {
            name: illuminant.name().to_string(),
            power,
            missing: Vec::new(),
        }
    }

    /// Blackbody radiator at `kelvin`, normalized to 100 at 560 nm.
    pub fn blackbody(kelvin: f64) -> Result<Self, SpectralError> {
        if !(1000.0..=25000.0).contains(&kelvin) {
            return Err(SpectralError::InvalidTemperature(kelvin));
        }
        Ok(Self {
            name: format!("{kelvin:.0}K"),
            power: planck(kelvin),
            missing: Vec::new(),
        })
    }

    /// A measured or user-supplied distribution. Grid wavelengths without
    /// data contribute nothing to integration and are logged.
    pub fn custom(name: impl Into<String>, curve: &SpectralCurve) -> Result<Self, SpectralError> {
        curve.validate()?;
        let name = name.into();
        let resampled = curve.resample();
        if !resampled.missing.is_empty() {
            tracing::warn!(
                illuminant = %name,
                missing = ?resampled.missing,
                "Illuminant has no data at some wavelengths, treating as zero power"
            );
        }
        Ok(Self {
            name,
            power: resampled.values,
            missing: resampled.missing,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn power(&self) -> &Spectrum {
        &self.power
    }

    /// Grid wavelengths with no power data.
    pub fn missing(&self) -> &[u32] {
        &self.missing
    }

    /// Precompute the CIE 1931 2° integration weights for this source.
    pub fn weights(&self) -> Result<WeightTable, SpectralError> {
        WeightTable::new(self)
    }
}

fn planck(kelvin: f64) -> Spectrum {
    let mut power = [0.0; GRID_LEN];
    let norm = (C2 / (560.0 * kelvin)).exp_m1();
    for (i, p) in power.iter_mut().enumerate() {
        let nm = wavelength(i) as f64;
        *p = 100.0 * (560.0 / nm).powi(5) * norm / (C2 / (nm * kelvin)).exp_m1();
    }
    power
}

/// Integration weights `k·S(λ)·cmf(λ)` with `k = 100 / Σ S·ȳ`, so that a
/// perfect reflector has Y = 100.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightTable {
    illuminant: String,
    x: Spectrum,
    y: Spectrum,
    z: Spectrum,
    white: [f64; 3],
    missing: Vec<u32>,
}

impl WeightTable {
    fn new(spd: &IlluminantSpd) -> Result<Self, SpectralError> {
        let luminance: f64 = spd.power.iter().zip(CMF_Y.iter()).map(|(s, y)| s * y).sum();
        if luminance <= 0.0 || !luminance.is_finite() {
            return Err(SpectralError::ZeroLuminance(spd.name.clone()));
        }
        let k = 100.0 / luminance;

        let mut x = [0.0; GRID_LEN];
        let mut y = [0.0; GRID_LEN];
        let mut z = [0.0; GRID_LEN];
        for i in 0..GRID_LEN {
            let s = k * spd.power[i];
            x[i] = s * CMF_X[i];
            y[i] = s * CMF_Y[i];
            z[i] = s * CMF_Z[i];
        }
        let white = [x.iter().sum(), y.iter().sum(), z.iter().sum()];

        Ok(Self {
            illuminant: spd.name.clone(),
            x,
            y,
            z,
            white,
            missing: spd.missing.clone(),
        })
    }

    pub fn illuminant(&self) -> &str {
        &self.illuminant
    }

    /// Tristimulus values of the perfect reflecting diffuser.
    pub fn white(&self) -> [f64; 3] {
        self.white
    }

    /// Grid wavelengths where the illuminant had no data.
    pub fn missing(&self) -> &[u32] {
        &self.missing
    }

    /// XYZ of a reflectance spectrum.
    pub fn tristimulus(&self, reflectance: &Spectrum) -> [f64; 3] {
        let mut xyz = [0.0; 3];
        for i in 0..GRID_LEN {
            let r = reflectance[i];
            xyz[0] += r * self.x[i];
            xyz[1] += r * self.y[i];
            xyz[2] += r * self.z[i];
        }
        xyz
    }

    /// Lab of a reflectance spectrum relative to this table's own white.
    pub fn lab(&self, reflectance: &Spectrum) -> LabColor {
        xyz_to_lab_raw(self.tristimulus(reflectance), self.white)
    }

    /// XYZ that a Lab color denotes under this table's white.
    pub(crate) fn xyz_of(&self, lab: LabColor) -> [f64; 3] {
        lab_to_xyz_raw(lab, self.white)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_perfect_white_has_y_100() {
        for ill in Illuminant::ALL {
            let table = IlluminantSpd::standard(ill).weights().unwrap();
            let xyz = table.tristimulus(&[1.0; GRID_LEN]);
            assert_abs_diff_eq!(xyz[1], 100.0, epsilon = 1e-9);
            let lab = table.lab(&[1.0; GRID_LEN]);
            assert_abs_diff_eq!(lab.l, 100.0, epsilon = 1e-9);
            assert_abs_diff_eq!(lab.a, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_integrated_whites_close_to_tabulated() {
        use crate::color::WhitePoint;

        for (ill, wp) in [
            (Illuminant::D50, WhitePoint::D50),
            (Illuminant::D65, WhitePoint::D65),
            (Illuminant::A, WhitePoint::A),
        ] {
            let white = IlluminantSpd::standard(ill).weights().unwrap().white();
            let tab = wp.tristimulus();
            assert_abs_diff_eq!(white[0], tab[0], epsilon = 0.5);
            assert_abs_diff_eq!(white[2], tab[2], epsilon = 0.5);
        }
    }

    #[test]
    fn test_illuminant_a_is_planckian() {
        let a = IlluminantSpd::standard(Illuminant::A);
        assert_abs_diff_eq!(a.power()[18], 100.0, epsilon = 1e-9);
        // Red-heavy: more power at 700 nm than at 400 nm
        assert!(a.power()[32] > 5.0 * a.power()[2]);
    }

    #[test]
    fn test_custom_illuminant_records_missing() {
        let curve = SpectralCurve::new((38..=70).map(|i| (i * 10, 100.0))).unwrap();
        let spd = IlluminantSpd::custom("lab-booth", &curve).unwrap();
        assert_eq!(spd.missing().len(), 8);
        let table = spd.weights().unwrap();
        assert_eq!(table.missing(), spd.missing());
        assert_abs_diff_eq!(table.white()[1], 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_blackbody_range() {
        assert!(IlluminantSpd::blackbody(6500.0).is_ok());
        assert_eq!(
            IlluminantSpd::blackbody(200.0).unwrap_err(),
            SpectralError::InvalidTemperature(200.0)
        );
    }

    #[test]
    fn test_zero_luminance_rejected() {
        let curve = SpectralCurve::new([(380, 0.0), (390, 0.0)]).unwrap();
        let spd = IlluminantSpd::custom("dark", &curve).unwrap();
        assert!(matches!(spd.weights(), Err(SpectralError::ZeroLuminance(_))));
    }
}
