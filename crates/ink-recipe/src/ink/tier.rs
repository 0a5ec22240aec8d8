//! Concentration tiers

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::CatalogError;

/// Pre-diluted reference strength of an ink, as a percentage of full
/// strength. Always in `1..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct ConcentrationTier(u8);

impl ConcentrationTier {
    /// Full-strength ink.
    pub const FULL: Self = Self(100);

    pub fn new(percent: u32) -> Result<Self, CatalogError> {
        if (1..=100).contains(&percent) {
            Ok(Self(percent as u8))
        } else {
            Err(CatalogError::InvalidTier(percent))
        }
    }

    #[inline]
    pub fn percent(self) -> u32 {
        self.0 as u32
    }

    /// Strength as a fraction of full strength.
    #[inline]
    pub fn fraction(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl Default for ConcentrationTier {
    fn default() -> Self {
        Self::FULL
    }
}

impl TryFrom<u32> for ConcentrationTier {
    type Error = CatalogError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ConcentrationTier> for u32 {
    fn from(tier: ConcentrationTier) -> Self {
        tier.percent()
    }
}

impl fmt::Display for ConcentrationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl FromStr for ConcentrationTier {
    type Err = CatalogError;

    /// Accepts `50` or `50%`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().trim_end_matches('%');
        let value = digits
            .parse::<u32>()
            .map_err(|_| CatalogError::InvalidTier(0))?;
        Self::new(value)
    }
}
