//! Ink definitions

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::CatalogError;
use super::tier::ConcentrationTier;
use crate::color::LabColor;
use crate::spectral::SpectralCurve;

/// Lab of the bare substrate, used as the tier-0 end when interpolating
/// below the lowest measured let-down.
pub const SUBSTRATE_WHITE: LabColor = LabColor::new(95.0, 0.0, -2.0);

/// Lightness at or above which a low-chroma ink counts as white.
pub const WHITE_MIN_LIGHTNESS: f64 = 90.0;
/// Chroma at or below which a light ink counts as white.
pub const WHITE_MAX_CHROMA: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InkType {
    #[default]
    Process,
    Spot,
    Metallic,
    Fluorescent,
    Medium,
    Custom,
}

impl InkType {
    pub const ALL: [InkType; 6] = [
        InkType::Process,
        InkType::Spot,
        InkType::Metallic,
        InkType::Fluorescent,
        InkType::Medium,
        InkType::Custom,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            InkType::Process => "process",
            InkType::Spot => "spot",
            InkType::Metallic => "metallic",
            InkType::Fluorescent => "fluorescent",
            InkType::Medium => "medium",
            InkType::Custom => "custom",
        }
    }

    /// Relative cost surcharge over plain process ink.
    pub fn premium(&self) -> f64 {
        match self {
            InkType::Metallic | InkType::Fluorescent => 0.5,
            InkType::Custom => 0.2,
            InkType::Spot => 0.1,
            InkType::Process | InkType::Medium => 0.0,
        }
    }
}

impl fmt::Display for InkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InkType {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        InkType::ALL
            .into_iter()
            .find(|t| t.name() == lower)
            .ok_or_else(|| CatalogError::UnknownType(s.to_string()))
    }
}

/// A catalog ink with its measured let-downs.
///
/// Construction guarantees a tier-100 measurement and valid Lab values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawInk")]
pub struct Ink {
    id: String,
    name: String,
    #[serde(rename = "type")]
    ink_type: InkType,
    concentrations: BTreeMap<ConcentrationTier, LabColor>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    spectra: BTreeMap<ConcentrationTier, SpectralCurve>,
}

#[derive(Deserialize)]
struct RawInk {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type", default)]
    ink_type: InkType,
    concentrations: BTreeMap<ConcentrationTier, LabColor>,
    #[serde(default)]
    spectra: BTreeMap<ConcentrationTier, SpectralCurve>,
}

impl TryFrom<RawInk> for Ink {
    type Error = CatalogError;

    fn try_from(raw: RawInk) -> Result<Self, Self::Error> {
        let name = raw.name.unwrap_or_else(|| raw.id.clone());
        let mut ink = Ink::new(raw.id, name, raw.ink_type, raw.concentrations)?;
        for (tier, curve) in raw.spectra {
            ink = ink.with_spectrum(tier, curve)?;
        }
        Ok(ink)
    }
}

impl Ink {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        ink_type: InkType,
        concentrations: BTreeMap<ConcentrationTier, LabColor>,
    ) -> Result<Self, CatalogError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(CatalogError::EmptyId);
        }
        if !concentrations.contains_key(&ConcentrationTier::FULL) {
            return Err(CatalogError::MissingFullStrength(id));
        }
        for lab in concentrations.values() {
            lab.validate().map_err(|source| CatalogError::Color {
                id: id.clone(),
                source,
            })?;
        }
        Ok(Self {
            id,
            name: name.into(),
            ink_type,
            concentrations,
            spectra: BTreeMap::new(),
        })
    }

    /// Convenience constructor for an ink measured only at full strength.
    pub fn full_strength(
        id: impl Into<String>,
        name: impl Into<String>,
        ink_type: InkType,
        lab: LabColor,
    ) -> Result<Self, CatalogError> {
        Self::new(
            id,
            name,
            ink_type,
            BTreeMap::from([(ConcentrationTier::FULL, lab)]),
        )
    }

    /// Attach a measured reflectance curve for one tier.
    pub fn with_spectrum(
        mut self,
        tier: ConcentrationTier,
        curve: SpectralCurve,
    ) -> Result<Self, CatalogError> {
        curve.validate().map_err(|source| CatalogError::Spectral {
            id: self.id.clone(),
            source,
        })?;
        self.spectra.insert(tier, curve);
        Ok(self)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ink_type(&self) -> InkType {
        self.ink_type
    }

    pub fn concentrations(&self) -> &BTreeMap<ConcentrationTier, LabColor> {
        &self.concentrations
    }

    pub fn measured_tiers(&self) -> impl Iterator<Item = ConcentrationTier> + '_ {
        self.concentrations.keys().copied()
    }

    /// Full-strength Lab.
    pub fn full(&self) -> LabColor {
        // Presence of tier 100 is checked on construction
        self.concentrations
            .get(&ConcentrationTier::FULL)
            .copied()
            .unwrap_or(SUBSTRATE_WHITE)
    }

    /// Lab at `tier`, measured if available, otherwise linearly
    /// interpolated between the neighbouring measured tiers. Below the
    /// lowest measured tier the substrate white stands in for tier 0.
    pub fn lab_at(&self, tier: ConcentrationTier) -> LabColor {
        if let Some(lab) = self.concentrations.get(&tier) {
            return *lab;
        }
        let below = self.concentrations.range(..tier).next_back();
        let above = self.concentrations.range(tier..).next();

        let (lo_pct, lo_lab) = below
            .map(|(t, l)| (t.percent() as f64, *l))
            .unwrap_or((0.0, SUBSTRATE_WHITE));
        let Some((hi, hi_lab)) = above else {
            return self.full();
        };
        let hi_pct = hi.percent() as f64;
        let t = (tier.percent() as f64 - lo_pct) / (hi_pct - lo_pct);
        LabColor::new(
            lo_lab.l + t * (hi_lab.l - lo_lab.l),
            lo_lab.a + t * (hi_lab.a - lo_lab.a),
            lo_lab.b + t * (hi_lab.b - lo_lab.b),
        )
    }

    /// True if `tier` was measured rather than interpolated.
    pub fn is_measured(&self, tier: ConcentrationTier) -> bool {
        self.concentrations.contains_key(&tier)
    }

    /// Measured reflectance at exactly `tier`, if any.
    pub fn spectrum_at(&self, tier: ConcentrationTier) -> Option<&SpectralCurve> {
        self.spectra.get(&tier)
    }

    pub fn has_spectra(&self) -> bool {
        !self.spectra.is_empty()
    }

    /// Opaque or mixing white: very light and nearly neutral at full strength.
    pub fn is_white(&self) -> bool {
        let lab = self.full();
        lab.l >= WHITE_MIN_LIGHTNESS && lab.chroma() <= WHITE_MAX_CHROMA
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn tier(p: u32) -> ConcentrationTier {
        ConcentrationTier::new(p).unwrap()
    }

    fn magenta() -> Ink {
        Ink::new(
            "magenta",
            "Process Magenta",
            InkType::Process,
            BTreeMap::from([
                (tier(100), LabColor::new(48.0, 74.0, -3.0)),
                (tier(50), LabColor::new(66.0, 44.0, -4.0)),
            ]),
        )
        .unwrap()
    }

    #[test]
    fn test_requires_full_strength() {
        let err = Ink::new(
            "m",
            "m",
            InkType::Process,
            BTreeMap::from([(tier(50), LabColor::new(60.0, 40.0, 0.0))]),
        )
        .unwrap_err();
        assert_eq!(err, CatalogError::MissingFullStrength("m".into()));
    }

    #[test]
    fn test_rejects_invalid_lab() {
        let err = Ink::full_strength("x", "x", InkType::Spot, LabColor::new(120.0, 0.0, 0.0));
        assert!(matches!(err, Err(CatalogError::Color { .. })));
    }

    #[test]
    fn test_interpolates_between_tiers() {
        let ink = magenta();
        let lab = ink.lab_at(tier(75));
        assert_abs_diff_eq!(lab.l, 57.0, epsilon = 1e-9);
        assert_abs_diff_eq!(lab.a, 59.0, epsilon = 1e-9);
        assert!(!ink.is_measured(tier(75)));
        assert!(ink.is_measured(tier(50)));
    }

    #[test]
    fn test_interpolates_toward_substrate() {
        let ink = magenta();
        let lab = ink.lab_at(tier(25));
        assert_abs_diff_eq!(lab.l, (95.0 + 66.0) / 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(lab.a, 22.0, epsilon = 1e-9);
    }

    #[test]
    fn test_white_detection() {
        let white =
            Ink::full_strength("white", "Opaque White", InkType::Spot, LabColor::new(95.0, 0.0, -2.0))
                .unwrap();
        assert!(white.is_white());
        assert!(!magenta().is_white());
    }

    #[test]
    fn test_deserialize_from_yaml_shape() {
        let json = r#"{
            "id": "cyan",
            "type": "process",
            "concentrations": {"100": {"L": 55, "a": -37, "b": -50}}
        }"#;
        let ink: Ink = serde_json::from_str(json).unwrap();
        assert_eq!(ink.name(), "cyan");
        assert_eq!(ink.ink_type(), InkType::Process);
        assert_eq!(ink.full(), LabColor::new(55.0, -37.0, -50.0));

        let missing = r#"{"id": "c", "concentrations": {"50": {"L": 55, "a": 0, "b": 0}}}"#;
        assert!(serde_json::from_str::<Ink>(missing).is_err());
    }

    #[test]
    fn test_type_parsing_and_premium() {
        assert_eq!("Fluorescent".parse::<InkType>().unwrap(), InkType::Fluorescent);
        assert!("glitter".parse::<InkType>().is_err());
        assert_eq!(InkType::Metallic.premium(), 0.5);
        assert_eq!(InkType::Process.premium(), 0.0);
    }
}
