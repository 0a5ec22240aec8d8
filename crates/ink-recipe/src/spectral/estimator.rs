//! Reflectance estimation from a single Lab measurement.
//!
//! Most catalog inks only carry Lab values. The spectral mixing model needs
//! a reflectance curve per ink, so one is reconstructed here. Any curve
//! that integrates to the measured color is a valid metamer; the estimators
//! differ in which metamer they pick, and predictions built on them are
//! flagged as lower confidence than ones built on measured spectra.

use std::fmt;

use super::curve::Spectrum;
use super::data::{wavelength, GRID_LEN, GRID_START};
use super::illuminant::WeightTable;
use crate::color::{det3, invert3, mat_vec, LabColor, Mat3};

/// Residual (ΔE76) above which an estimate is reported as poor.
pub const POOR_FIT_RESIDUAL: f64 = 0.5;

/// A reconstructed reflectance curve and how well it reproduces its Lab.
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub spectrum: Spectrum,
    /// ΔE76 between the requested Lab and the curve's integrated Lab.
    pub residual: f64,
}

/// Strategy for turning Lab into a plausible reflectance curve.
pub trait ReflectanceEstimator: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Estimate a curve whose color under `table` is `lab`.
    fn estimate(&self, lab: LabColor, table: &WeightTable) -> Estimate;
}

/// Hue angle (degrees) to dominant wavelength (nm) anchors for surface
/// colors under daylight. Purples (300..345°) have no spectral dominant
/// wavelength and map to the blue end.
const HUE_ANCHORS: [(f64, f64); 10] = [
    (0.0, 612.0),
    (45.0, 600.0),
    (70.0, 590.0),
    (95.0, 575.0),
    (135.0, 550.0),
    (165.0, 525.0),
    (200.0, 495.0),
    (240.0, 480.0),
    (270.0, 465.0),
    (300.0, 450.0),
];

/// Approximate dominant wavelength in nm for a Lab hue angle.
pub fn dominant_wavelength(hue: f64) -> f64 {
    let h = hue.rem_euclid(360.0);
    if h >= 345.0 {
        return 612.0;
    }
    if h >= 300.0 {
        return 450.0;
    }
    for pair in HUE_ANCHORS.windows(2) {
        let (h0, w0) = pair[0];
        let (h1, w1) = pair[1];
        if h >= h0 && h < h1 {
            return w0 + (w1 - w0) * (h - h0) / (h1 - h0);
        }
    }
    450.0
}

fn residual(lab: LabColor, spectrum: &Spectrum, table: &WeightTable) -> f64 {
    let got = table.lab(spectrum);
    let [dl, da, db] = lab.difference(&got);
    (dl * dl + da * da + db * db).sqrt()
}

/// Smooth sigmoid-of-quadratic reflectance, `R(t) = s(c0·t² + c1·t + c2)`
/// with `s(x) = ½ + x / (2·√(1 + x²))` and `t` the normalized wavelength.
///
/// The three coefficients are solved by damped Gauss-Newton so the curve
/// reproduces the Lab exactly wherever the color is physically realizable.
/// The curve stays inside (0, 1) by construction and peaks (or dips) at a
/// single wavelength, which for chromatic inks lands near the dominant
/// wavelength of their hue.
#[derive(Debug, Clone, Copy, Default)]
pub struct SigmoidEstimator;

impl SigmoidEstimator {
    const MAX_ITERATIONS: usize = 60;
    const TOLERANCE: f64 = 1e-6;
    const STEP: f64 = 1e-4;

    fn curve(c: [f64; 3]) -> Spectrum {
        let mut out = [0.0; GRID_LEN];
        for (i, r) in out.iter_mut().enumerate() {
            let t = (wavelength(i) - GRID_START) as f64 / 400.0;
            let x = c[0] * t * t + c[1] * t + c[2];
            *r = 0.5 + x / (2.0 * (1.0 + x * x).sqrt());
        }
        out
    }

    fn lab_of(c: [f64; 3], table: &WeightTable) -> [f64; 3] {
        table.lab(&Self::curve(c)).to_array()
    }

    fn error(target: [f64; 3], got: [f64; 3]) -> f64 {
        let d = [target[0] - got[0], target[1] - got[1], target[2] - got[2]];
        (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt()
    }

    fn solve(target: [f64; 3], start: [f64; 3], table: &WeightTable) -> ([f64; 3], f64) {
        let mut c = start;
        let mut current = Self::lab_of(c, table);
        let mut err = Self::error(target, current);

        for _ in 0..Self::MAX_ITERATIONS {
            if err < Self::TOLERANCE {
                break;
            }
            let mut jacobian: Mat3 = [[0.0; 3]; 3];
            for j in 0..3 {
                let mut nudged = c;
                nudged[j] += Self::STEP;
                let shifted = Self::lab_of(nudged, table);
                for i in 0..3 {
                    jacobian[i][j] = (shifted[i] - current[i]) / Self::STEP;
                }
            }
            let Some(inverse) = invert3(&jacobian) else {
                break;
            };
            let delta = mat_vec(
                &inverse,
                [
                    target[0] - current[0],
                    target[1] - current[1],
                    target[2] - current[2],
                ],
            );

            let mut scale = 1.0;
            let mut improved = false;
            while scale > 1e-3 {
                let candidate = [
                    c[0] + scale * delta[0],
                    c[1] + scale * delta[1],
                    c[2] + scale * delta[2],
                ];
                let lab = Self::lab_of(candidate, table);
                let e = Self::error(target, lab);
                if e < err {
                    c = candidate;
                    current = lab;
                    err = e;
                    improved = true;
                    break;
                }
                scale *= 0.5;
            }
            if !improved {
                break;
            }
        }
        (c, err)
    }
}

impl ReflectanceEstimator for SigmoidEstimator {
    fn name(&self) -> &'static str {
        "sigmoid"
    }

    fn estimate(&self, lab: LabColor, table: &WeightTable) -> Estimate {
        let target = lab.to_array();
        let (mut best, mut err) = Self::solve(target, [0.0; 3], table);

        if err > 1e-3 && lab.chroma() > 1.0 {
            // Retry from a bump centered on the dominant wavelength
            let t = (dominant_wavelength(lab.hue()) - GRID_START as f64) / 400.0;
            let width = 8.0;
            let seed = [-width, 2.0 * width * t, -width * t * t];
            let (alt, alt_err) = Self::solve(target, seed, table);
            if alt_err < err {
                best = alt;
                err = alt_err;
            }
        }

        if err > POOR_FIT_RESIDUAL {
            tracing::warn!(
                L = lab.l,
                a = lab.a,
                b = lab.b,
                residual = err,
                "Reflectance estimate does not reproduce Lab, color may be unrealizable"
            );
        }

        Estimate {
            spectrum: Self::curve(best),
            residual: err,
        }
    }
}

/// Flat base plus Gaussian bumps at the dominant and complementary
/// wavelengths, amplitudes solved so the curve integrates to the target
/// XYZ, then clipped to the physical range.
///
/// Cheaper than [`SigmoidEstimator`] but clipping makes it inexact for
/// strongly saturated inks.
#[derive(Debug, Clone, Copy)]
pub struct GaussianEstimator {
    /// Bump width (standard deviation) in nm.
    pub sigma: f64,
}

impl Default for GaussianEstimator {
    fn default() -> Self {
        Self { sigma: 45.0 }
    }
}

impl GaussianEstimator {
    fn bump(&self, center: f64) -> Spectrum {
        let mut out = [0.0; GRID_LEN];
        for (i, v) in out.iter_mut().enumerate() {
            let d = (wavelength(i) as f64 - center) / self.sigma;
            *v = (-0.5 * d * d).exp();
        }
        out
    }

    fn flat(lab: LabColor, table: &WeightTable) -> Spectrum {
        let y = table.xyz_of(lab)[1] / table.white()[1];
        [y.clamp(0.001, 1.0); GRID_LEN]
    }
}

impl ReflectanceEstimator for GaussianEstimator {
    fn name(&self) -> &'static str {
        "gaussian"
    }

    fn estimate(&self, lab: LabColor, table: &WeightTable) -> Estimate {
        if lab.chroma() < 1.0 {
            let spectrum = Self::flat(lab, table);
            return Estimate {
                residual: residual(lab, &spectrum, table),
                spectrum,
            };
        }

        let dominant = dominant_wavelength(lab.hue());
        let complementary = if dominant >= 530.0 { 450.0 } else { 610.0 };
        let basis = [[1.0; GRID_LEN], self.bump(dominant), self.bump(complementary)];
        let columns = basis.map(|b| table.tristimulus(&b));
        let m: Mat3 = [
            [columns[0][0], columns[1][0], columns[2][0]],
            [columns[0][1], columns[1][1], columns[2][1]],
            [columns[0][2], columns[1][2], columns[2][2]],
        ];

        let spectrum = match invert3(&m) {
            Some(inverse) if det3(&m).abs() > 1e-9 => {
                let w = mat_vec(&inverse, table.xyz_of(lab));
                let mut out = [0.0; GRID_LEN];
                for (i, r) in out.iter_mut().enumerate() {
                    let v = w[0] * basis[0][i] + w[1] * basis[1][i] + w[2] * basis[2][i];
                    *r = v.clamp(0.001, 1.0);
                }
                out
            }
            _ => {
                tracing::warn!(dominant, "Degenerate Gaussian basis, using flat reflectance");
                Self::flat(lab, table)
            }
        };

        Estimate {
            residual: residual(lab, &spectrum, table),
            spectrum,
        }
    }
}
