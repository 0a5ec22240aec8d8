//! Three-channel Kubelka–Munk on Bradford cone responses.
//!
//! Each ink's Lab is taken to XYZ under the working white and then to
//! Bradford cone space, normalized by the white's own cone response. The
//! three normalized channels act as broad-band reflectances. Saunderson
//! correction converts them to internal reflectance before K/S is formed,
//! and back again after mixing.

use super::{
    ks_from_reflectance, normalized_weights, reflectance_from_ks, MixError, MixPrediction,
    MixingModel, MixingModelKind, Pigment, MIN_REFLECTANCE,
};
use crate::color::{lab_to_xyz_raw, mat_vec, xyz_to_lab_raw, LabColor, WhitePoint, BRADFORD, BRADFORD_INV};
use crate::ink::{ConcentrationTier, Ink};
use crate::spectral::DataQuality;

/// Saunderson surface reflection coefficient.
pub const SAUNDERSON_K1: f64 = 0.01;
/// Saunderson internal reflection coefficient.
pub const SAUNDERSON_K2: f64 = 0.4;

/// Predictions made without any spectral data.
const CONFIDENCE: f64 = 0.6;

#[derive(Debug, Clone)]
pub struct KubelkaMunk {
    white: WhitePoint,
    white_xyz: [f64; 3],
    cone_white: [f64; 3],
}

impl KubelkaMunk {
    pub fn new(white: WhitePoint) -> Self {
        let white_xyz = white.tristimulus();
        Self {
            white,
            white_xyz,
            cone_white: mat_vec(&BRADFORD, white_xyz),
        }
    }

    pub fn white(&self) -> WhitePoint {
        self.white
    }

    /// Normalized cone channels of a Lab color.
    fn channels(&self, lab: LabColor) -> [f64; 3] {
        let cone = mat_vec(&BRADFORD, lab_to_xyz_raw(lab, self.white_xyz));
        [
            cone[0] / self.cone_white[0],
            cone[1] / self.cone_white[1],
            cone[2] / self.cone_white[2],
        ]
    }
}

impl Default for KubelkaMunk {
    fn default() -> Self {
        Self::new(WhitePoint::D50)
    }
}

/// Measured to internal reflectance.
fn inverse_saunderson(measured: f64) -> f64 {
    (measured - SAUNDERSON_K1)
        / (1.0 - SAUNDERSON_K1 - SAUNDERSON_K2 + SAUNDERSON_K2 * measured)
}

/// Internal to measured reflectance.
fn saunderson(internal: f64) -> f64 {
    SAUNDERSON_K1
        + (1.0 - SAUNDERSON_K1) * (1.0 - SAUNDERSON_K2) * internal
            / (1.0 - SAUNDERSON_K2 * internal)
}

/// Scattering estimated from lightness and chroma: light, weakly colored
/// inks scatter most.
pub fn scattering(lab: LabColor) -> f64 {
    let l = lab.l / 100.0;
    0.05 + 0.95 * l * l * (1.0 - (lab.chroma() / 200.0).min(0.5))
}

impl MixingModel for KubelkaMunk {
    fn kind(&self) -> MixingModelKind {
        MixingModelKind::Basic
    }

    fn pigment(&self, ink: &Ink, tier: ConcentrationTier) -> Pigment {
        let lab = ink.lab_at(tier);
        let s = scattering(lab);
        let mut k = Vec::with_capacity(3);
        for (channel, measured) in self.channels(lab).into_iter().enumerate() {
            let mut r = inverse_saunderson(measured);
            if r < MIN_REFLECTANCE {
                tracing::warn!(
                    ink = ink.id(),
                    tier = tier.percent(),
                    channel,
                    reflectance = r,
                    "Internal reflectance below floor, clamping"
                );
                r = MIN_REFLECTANCE;
            }
            k.push(ks_from_reflectance(r.min(1.0)) * s);
        }
        Pigment {
            k,
            s: vec![s; 3],
            emission: None,
            measured: false,
            quality: DataQuality::default(),
        }
    }

    fn mix(&self, parts: &[(&Pigment, f64)]) -> Result<MixPrediction, MixError> {
        let weights = normalized_weights(parts)?;
        let mut channels = [0.0; 3];
        for (c, out) in channels.iter_mut().enumerate() {
            let mut k = 0.0;
            let mut s = 0.0;
            for ((pigment, _), w) in parts.iter().zip(&weights) {
                k += w * pigment.k[c];
                s += w * pigment.s[c];
            }
            *out = saunderson(reflectance_from_ks(k / s)) * self.cone_white[c];
        }
        let xyz = mat_vec(&BRADFORD_INV, channels);
        Ok(MixPrediction {
            lab: xyz_to_lab_raw(xyz, self.white_xyz),
            confidence: CONFIDENCE,
            spectral_data_used: false,
            data_quality: DataQuality::default(),
        })
    }
}
