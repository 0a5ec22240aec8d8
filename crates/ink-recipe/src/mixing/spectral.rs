//! Per-wavelength Kubelka–Munk on reflectance curves.

use std::sync::Arc;

use super::{
    ks_from_reflectance, normalized_weights, reflectance_from_ks, MixError, MixPrediction,
    MixingModel, MixingModelKind, Pigment, MIN_REFLECTANCE,
};
use crate::ink::{ConcentrationTier, Ink, InkType};
use crate::spectral::{
    dominant_wavelength, wavelength, DataQuality, IlluminantSpd, ReflectanceEstimator,
    SigmoidEstimator, SpectralError, WeightTable, GRID_LEN,
};

const CONFIDENCE_MEASURED: f64 = 0.9;
const CONFIDENCE_ESTIMATED: f64 = 0.7;
const MISSING_DATA_PENALTY: f64 = 0.2;

/// Peak extra reflectance from fluorescent emission at full share.
const EMISSION_GAIN: f64 = 0.3;
/// Width (standard deviation, nm) of the emission band.
const EMISSION_WIDTH: f64 = 25.0;
/// Ceiling for apparent reflectance of fluorescent mixes.
pub const MAX_FLUORESCENT_REFLECTANCE: f64 = 1.3;

/// Spectral Kubelka–Munk under one illuminant.
///
/// Inks with a measured curve at the requested tier use it, all others get
/// a curve reconstructed from Lab by the configured estimator. With
/// `fluorescent` set, fluorescent inks also add an emission band at their
/// dominant wavelength, so mixes containing them may exceed reflectance 1.
#[derive(Debug, Clone)]
pub struct SpectralKubelkaMunk {
    table: WeightTable,
    estimator: Arc<dyn ReflectanceEstimator>,
    fluorescent: bool,
}

impl SpectralKubelkaMunk {
    pub fn new(illuminant: &IlluminantSpd) -> Result<Self, SpectralError> {
        Ok(Self {
            table: illuminant.weights()?,
            estimator: Arc::new(SigmoidEstimator),
            fluorescent: false,
        })
    }

    /// Spectral model with the fluorescent emission term enabled.
    pub fn fluorescent(illuminant: &IlluminantSpd) -> Result<Self, SpectralError> {
        Ok(Self {
            fluorescent: true,
            ..Self::new(illuminant)?
        })
    }

    /// Replace the reflectance estimator used for inks without measured curves.
    pub fn with_estimator(mut self, estimator: Arc<dyn ReflectanceEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn table(&self) -> &WeightTable {
        &self.table
    }

    fn emission(hue: f64) -> Vec<f64> {
        let center = dominant_wavelength(hue);
        (0..GRID_LEN)
            .map(|i| {
                let d = (wavelength(i) as f64 - center) / EMISSION_WIDTH;
                EMISSION_GAIN * (-0.5 * d * d).exp()
            })
            .collect()
    }
}

impl MixingModel for SpectralKubelkaMunk {
    fn kind(&self) -> MixingModelKind {
        if self.fluorescent {
            MixingModelKind::Fluorescent
        } else {
            MixingModelKind::Spectral
        }
    }

    fn pigment(&self, ink: &Ink, tier: ConcentrationTier) -> Pigment {
        let mut quality = DataQuality::default();
        quality.add_illuminant_gaps(self.table.missing());

        let (reflectance, measured) = match ink.spectrum_at(tier) {
            Some(curve) => {
                let mut resampled = curve.resample();
                if !resampled.missing.is_empty() {
                    tracing::warn!(
                        ink = ink.id(),
                        tier = tier.percent(),
                        missing = ?resampled.missing,
                        "Reflectance curve incomplete, filling gaps from the Lab estimate"
                    );
                    let estimate = self.estimator.estimate(ink.lab_at(tier), &self.table);
                    for (i, value) in resampled.values.iter_mut().enumerate() {
                        if resampled.missing.binary_search(&wavelength(i)).is_ok() {
                            *value = estimate.spectrum[i];
                        }
                    }
                }
                quality.add_reflectance_gaps(&resampled.missing);
                (resampled.values, true)
            }
            None => {
                let estimate = self.estimator.estimate(ink.lab_at(tier), &self.table);
                tracing::debug!(
                    ink = ink.id(),
                    tier = tier.percent(),
                    estimator = self.estimator.name(),
                    residual = estimate.residual,
                    "Estimated reflectance from Lab"
                );
                (estimate.spectrum, false)
            }
        };

        let k = reflectance
            .iter()
            .map(|&r| ks_from_reflectance(r.clamp(MIN_REFLECTANCE, 1.0)))
            .collect();
        let emission = (self.fluorescent && ink.ink_type() == InkType::Fluorescent)
            .then(|| Self::emission(ink.lab_at(tier).hue()));

        Pigment {
            k,
            s: vec![1.0; GRID_LEN],
            emission,
            measured,
            quality,
        }
    }

    fn mix(&self, parts: &[(&Pigment, f64)]) -> Result<MixPrediction, MixError> {
        let weights = normalized_weights(parts)?;
        let mut reflectance = [0.0; GRID_LEN];
        for (i, r) in reflectance.iter_mut().enumerate() {
            let ks: f64 = parts
                .iter()
                .zip(&weights)
                .map(|((pigment, _), w)| w * pigment.k[i] / pigment.s[i])
                .sum();
            *r = reflectance_from_ks(ks);
        }

        let mut emitting = false;
        for ((pigment, _), w) in parts.iter().zip(&weights) {
            if let Some(emission) = &pigment.emission {
                emitting = true;
                for (r, e) in reflectance.iter_mut().zip(emission) {
                    *r += w * e;
                }
            }
        }
        if emitting {
            for r in reflectance.iter_mut() {
                *r = r.min(MAX_FLUORESCENT_REFLECTANCE);
            }
        }

        let mut quality = DataQuality::default();
        for (pigment, _) in parts {
            quality.merge(&pigment.quality);
        }
        let all_measured = parts.iter().all(|(p, _)| p.measured);
        let mut confidence = if all_measured {
            CONFIDENCE_MEASURED
        } else {
            CONFIDENCE_ESTIMATED
        };
        if !quality.is_complete() {
            confidence -= MISSING_DATA_PENALTY;
        }

        Ok(MixPrediction {
            lab: self.table.lab(&reflectance),
            confidence,
            spectral_data_used: parts.iter().any(|(p, _)| p.measured),
            data_quality: quality,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{delta_e_unchecked, DeltaEMethod, Illuminant, LabColor};
    use crate::mixing::MixComponent;
    use crate::spectral::SpectralCurve;

    fn d50() -> IlluminantSpd {
        IlluminantSpd::standard(Illuminant::D50)
    }

    fn ink(id: &str, ink_type: InkType, l: f64, a: f64, b: f64) -> Ink {
        Ink::full_strength(id, id, ink_type, LabColor::new(l, a, b)).unwrap()
    }

    fn de(a: LabColor, b: LabColor) -> f64 {
        delta_e_unchecked(a, b, DeltaEMethod::Ciede2000, None)
    }

    #[test]
    fn test_estimated_single_ink_reproduces_lab() {
        let model = SpectralKubelkaMunk::new(&d50()).unwrap();
        let magenta = ink("magenta", InkType::Process, 48.0, 74.0, -3.0);
        let pred = model
            .predict(&[MixComponent::new(&magenta, ConcentrationTier::FULL, 1.0)])
            .unwrap();
        assert!(de(pred.lab, magenta.full()) < 0.05, "{:?}", pred.lab);
        assert_eq!(pred.confidence, CONFIDENCE_ESTIMATED);
        assert!(!pred.spectral_data_used);
    }

    #[test]
    fn test_measured_curve_raises_confidence() {
        let model = SpectralKubelkaMunk::new(&d50()).unwrap();
        let grey = ink("grey", InkType::Process, 50.0, 0.0, 0.0)
            .with_spectrum(ConcentrationTier::FULL, SpectralCurve::from_grid(&[0.2; GRID_LEN]))
            .unwrap();
        let pred = model
            .predict(&[MixComponent::new(&grey, ConcentrationTier::FULL, 1.0)])
            .unwrap();
        assert_eq!(pred.confidence, CONFIDENCE_MEASURED);
        assert!(pred.spectral_data_used);
        assert!(pred.data_quality.is_complete());
    }

    #[test]
    fn test_missing_wavelengths_lower_confidence() {
        let model = SpectralKubelkaMunk::new(&d50()).unwrap();
        let curve = SpectralCurve::new((40..=70).map(|i| (i * 10, 0.3))).unwrap();
        let partial = ink("partial", InkType::Spot, 50.0, 0.0, 0.0)
            .with_spectrum(ConcentrationTier::FULL, curve)
            .unwrap();
        let pred = model
            .predict(&[MixComponent::new(&partial, ConcentrationTier::FULL, 1.0)])
            .unwrap();
        assert!((pred.confidence - (CONFIDENCE_MEASURED - MISSING_DATA_PENALTY)).abs() < 1e-12);
        assert_eq!(pred.data_quality.missing_reflectance.first(), Some(&380));
    }

    #[test]
    fn test_missing_wavelengths_follow_ink_color() {
        let model = SpectralKubelkaMunk::new(&d50()).unwrap();
        let curve = SpectralCurve::new((38..=60).map(|i| (i * 10, 0.8))).unwrap();
        let light = ink("light", InkType::Spot, 90.0, 0.0, 0.0)
            .with_spectrum(ConcentrationTier::FULL, curve)
            .unwrap();
        let pred = model
            .predict(&[MixComponent::new(&light, ConcentrationTier::FULL, 1.0)])
            .unwrap();
        assert!(pred.lab.l > 80.0, "{:?}", pred.lab);
        assert!(pred.lab.chroma() < 15.0, "{:?}", pred.lab);
        assert_eq!(pred.data_quality.missing_reflectance.first(), Some(&610));
        assert!(pred.spectral_data_used);
    }

    #[test]
    fn test_magenta_yellow_makes_red() {
        let model = SpectralKubelkaMunk::new(&d50()).unwrap();
        let magenta = ink("magenta", InkType::Process, 48.0, 74.0, -3.0);
        let yellow = ink("yellow", InkType::Process, 89.0, -5.0, 93.0);
        let pred = model
            .predict(&[
                MixComponent::new(&magenta, ConcentrationTier::FULL, 1.0),
                MixComponent::new(&yellow, ConcentrationTier::FULL, 1.0),
            ])
            .unwrap();
        assert!(pred.lab.a > 20.0 && pred.lab.b > 20.0, "{:?}", pred.lab);
    }

    #[test]
    fn test_fluorescent_boost_only_for_fluorescent_inks() {
        let spectral = SpectralKubelkaMunk::new(&d50()).unwrap();
        let fluo = SpectralKubelkaMunk::fluorescent(&d50()).unwrap();
        assert_eq!(fluo.kind(), MixingModelKind::Fluorescent);

        let process = ink("p", InkType::Process, 60.0, 60.0, 30.0);
        let neon = ink("n", InkType::Fluorescent, 60.0, 60.0, 30.0);

        let a = spectral
            .predict(&[MixComponent::new(&process, ConcentrationTier::FULL, 1.0)])
            .unwrap();
        let b = fluo
            .predict(&[MixComponent::new(&process, ConcentrationTier::FULL, 1.0)])
            .unwrap();
        assert!(de(a.lab, b.lab) < 1e-9);

        let c = fluo
            .predict(&[MixComponent::new(&neon, ConcentrationTier::FULL, 1.0)])
            .unwrap();
        assert!(c.lab.l > a.lab.l);
    }
}
