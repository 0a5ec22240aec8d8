//! Kubelka–Munk ink mixing
//!
//! A [`MixingModel`] turns weighted inks into a predicted Lab color. Models
//! split the work in two steps so the recipe search can reuse per-ink
//! optical constants: [`MixingModel::pigment`] derives absorption (K) and
//! scattering (S) for one ink at one tier, and [`MixingModel::mix`] blends
//! prepared pigments.
//!
//! Three variants exist, chosen at construction through [`MixingModelKind`]:
//!
//! - [`KubelkaMunk`] works on three Bradford cone channels derived from Lab.
//! - [`SpectralKubelkaMunk`] works per wavelength on measured or estimated
//!   reflectance curves and integrates under an illuminant.
//! - The fluorescent variant of [`SpectralKubelkaMunk`] adds an emission
//!   term for fluorescent inks.

mod basic;
mod spectral;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::color::{Illuminant, LabColor, Observer, WhitePoint};
use crate::ink::{ConcentrationTier, Ink};
use crate::spectral::{DataQuality, IlluminantSpd, SpectralError};

pub use basic::KubelkaMunk;
pub use spectral::SpectralKubelkaMunk;

/// Smallest internal reflectance fed into K/S.
pub(crate) const MIN_REFLECTANCE: f64 = 1e-4;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MixError {
    #[error("mixture has no components")]
    Empty,

    #[error("component {index} has invalid weight {value}")]
    InvalidWeight { index: usize, value: f64 },

    #[error("component weights sum to zero")]
    ZeroTotal,

    #[error(transparent)]
    Spectral(#[from] SpectralError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MixingModelKind {
    #[default]
    Basic,
    Spectral,
    Fluorescent,
}

impl MixingModelKind {
    pub fn name(&self) -> &'static str {
        match self {
            MixingModelKind::Basic => "basic",
            MixingModelKind::Spectral => "spectral",
            MixingModelKind::Fluorescent => "fluorescent",
        }
    }

    /// Build the model for this kind under a standard illuminant.
    pub fn build(self, illuminant: Illuminant) -> Result<Arc<dyn MixingModel>, MixError> {
        Ok(match self {
            MixingModelKind::Basic => Arc::new(KubelkaMunk::new(WhitePoint::new(
                illuminant,
                Observer::Deg2,
            ))),
            MixingModelKind::Spectral => Arc::new(SpectralKubelkaMunk::new(
                &IlluminantSpd::standard(illuminant),
            )?),
            MixingModelKind::Fluorescent => Arc::new(SpectralKubelkaMunk::fluorescent(
                &IlluminantSpd::standard(illuminant),
            )?),
        })
    }
}

impl fmt::Display for MixingModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MixingModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" | "km" => Ok(MixingModelKind::Basic),
            "spectral" => Ok(MixingModelKind::Spectral),
            "fluorescent" => Ok(MixingModelKind::Fluorescent),
            _ => Err(format!(
                "unknown mixing model '{s}', expected basic, spectral or fluorescent"
            )),
        }
    }
}

/// One ink in a mixture. Weights are relative and need not sum to 1.
#[derive(Debug, Clone, Copy)]
pub struct MixComponent<'a> {
    pub ink: &'a Ink,
    pub tier: ConcentrationTier,
    pub weight: f64,
}

impl<'a> MixComponent<'a> {
    pub fn new(ink: &'a Ink, tier: ConcentrationTier, weight: f64) -> Self {
        Self { ink, tier, weight }
    }
}

/// Optical constants of one ink at one tier, prepared by a model.
///
/// Only meaningful to the model that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Pigment {
    pub(crate) k: Vec<f64>,
    pub(crate) s: Vec<f64>,
    pub(crate) emission: Option<Vec<f64>>,
    pub(crate) measured: bool,
    pub(crate) quality: DataQuality,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MixPrediction {
    pub lab: LabColor,
    /// How far the prediction can be trusted, 0..=1.
    pub confidence: f64,
    /// True when at least one measured reflectance curve went into the mix.
    pub spectral_data_used: bool,
    #[serde(skip_serializing_if = "DataQuality::is_complete")]
    pub data_quality: DataQuality,
}

pub trait MixingModel: Send + Sync + fmt::Debug {
    fn kind(&self) -> MixingModelKind;

    /// Derive K and S for `ink` at `tier`.
    fn pigment(&self, ink: &Ink, tier: ConcentrationTier) -> Pigment;

    /// Blend prepared pigments by relative weight.
    fn mix(&self, parts: &[(&Pigment, f64)]) -> Result<MixPrediction, MixError>;

    /// Predict the color of a mixture in one call.
    fn predict(&self, components: &[MixComponent<'_>]) -> Result<MixPrediction, MixError> {
        let pigments: Vec<Pigment> = components
            .iter()
            .map(|c| self.pigment(c.ink, c.tier))
            .collect();
        let parts: Vec<(&Pigment, f64)> = pigments
            .iter()
            .zip(components)
            .map(|(p, c)| (p, c.weight))
            .collect();
        self.mix(&parts)
    }
}

/// Weights normalized to sum to 1.
pub(crate) fn normalized_weights(parts: &[(&Pigment, f64)]) -> Result<Vec<f64>, MixError> {
    if parts.is_empty() {
        return Err(MixError::Empty);
    }
    let mut total = 0.0;
    for (index, &(_, value)) in parts.iter().enumerate() {
        if !value.is_finite() || value < 0.0 {
            return Err(MixError::InvalidWeight { index, value });
        }
        total += value;
    }
    if total <= 0.0 {
        return Err(MixError::ZeroTotal);
    }
    Ok(parts.iter().map(|&(_, w)| w / total).collect())
}

/// Kubelka–Munk K/S of an opaque layer with internal reflectance `r`.
#[inline]
pub(crate) fn ks_from_reflectance(r: f64) -> f64 {
    (1.0 - r) * (1.0 - r) / (2.0 * r)
}

/// Inverse of [`ks_from_reflectance`].
#[inline]
pub(crate) fn reflectance_from_ks(ks: f64) -> f64 {
    1.0 + ks - ((1.0 + ks) * (1.0 + ks) - 1.0).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_ks_inverse() {
        for r in [1e-4, 0.05, 0.3, 0.5, 0.9, 1.0] {
            assert_abs_diff_eq!(reflectance_from_ks(ks_from_reflectance(r)), r, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("Spectral".parse::<MixingModelKind>().unwrap(), MixingModelKind::Spectral);
        assert_eq!("km".parse::<MixingModelKind>().unwrap(), MixingModelKind::Basic);
        assert!("ryb".parse::<MixingModelKind>().is_err());
        assert_eq!(
            serde_json::to_string(&MixingModelKind::Fluorescent).unwrap(),
            "\"fluorescent\""
        );
    }

    #[test]
    fn test_weights_validated() {
        let p = Pigment {
            k: vec![0.1],
            s: vec![1.0],
            emission: None,
            measured: false,
            quality: DataQuality::default(),
        };
        assert_eq!(normalized_weights(&[]), Err(MixError::Empty));
        assert_eq!(normalized_weights(&[(&p, 0.0)]), Err(MixError::ZeroTotal));
        assert!(matches!(
            normalized_weights(&[(&p, 1.0), (&p, -1.0)]),
            Err(MixError::InvalidWeight { index: 1, .. })
        ));
        assert_eq!(normalized_weights(&[(&p, 1.0), (&p, 3.0)]).unwrap(), vec![0.25, 0.75]);
    }

    #[test]
    fn test_build_every_kind() {
        for kind in [
            MixingModelKind::Basic,
            MixingModelKind::Spectral,
            MixingModelKind::Fluorescent,
        ] {
            let model = kind.build(Illuminant::D50).unwrap();
            assert_eq!(model.kind(), kind);
        }
    }
}
