//! Recipe value types
//!
//! A [`Recipe`] is immutable once built. Construction normalizes the
//! ratios to exactly 100 at 0.1 resolution, so every recipe handed out by
//! the engine is ready to weigh out.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::color::{DeltaEMethod, LabColor};
use crate::ink::{ConcentrationTier, InkType};
use crate::mixing::MixingModelKind;

/// Ratio resolution after normalization, in percent.
pub const RATIO_STEP: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecipeError {
    #[error("recipe has no inks")]
    Empty,

    #[error("ink '{0}' appears more than once")]
    DuplicateInk(String),

    #[error("ink '{ink_id}' has invalid ratio {value}")]
    InvalidRatio { ink_id: String, value: f64 },

    #[error("ratios sum to zero")]
    ZeroTotal,
}

/// One ink's share of a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InkRatio {
    pub ink_id: String,
    /// Share in percent.
    pub ratio: f64,
    #[serde(rename = "concentrationTier", alias = "concentration", default)]
    pub tier: ConcentrationTier,
}

impl InkRatio {
    pub fn new(ink_id: impl Into<String>, ratio: f64, tier: ConcentrationTier) -> Self {
        Self {
            ink_id: ink_id.into(),
            ratio,
            tier,
        }
    }
}

/// Scale ratios to sum to 100, round to [`RATIO_STEP`] and put the
/// rounding residue on the largest share. Entries that round to zero are
/// dropped.
pub fn normalize_ratios(ratios: Vec<InkRatio>) -> Result<Vec<InkRatio>, RecipeError> {
    if ratios.is_empty() {
        return Err(RecipeError::Empty);
    }
    let mut seen = HashSet::with_capacity(ratios.len());
    let mut total = 0.0;
    for r in &ratios {
        if !seen.insert(r.ink_id.as_str()) {
            return Err(RecipeError::DuplicateInk(r.ink_id.clone()));
        }
        if !r.ratio.is_finite() || r.ratio < 0.0 {
            return Err(RecipeError::InvalidRatio {
                ink_id: r.ink_id.clone(),
                value: r.ratio,
            });
        }
        total += r.ratio;
    }
    if total <= 0.0 {
        return Err(RecipeError::ZeroTotal);
    }

    // Work in whole steps so every ratio lands exactly on the grid.
    let steps = (100.0 / RATIO_STEP).round() as i64;
    let per_percent = (1.0 / RATIO_STEP).round();
    let mut units: Vec<(InkRatio, i64)> = ratios
        .into_iter()
        .map(|r| {
            let n = (r.ratio / total * steps as f64).round() as i64;
            (r, n)
        })
        .filter(|(_, n)| *n > 0)
        .collect();
    if units.is_empty() {
        return Err(RecipeError::ZeroTotal);
    }

    let residue = steps - units.iter().map(|(_, n)| n).sum::<i64>();
    if let Some((_, largest)) = units.iter_mut().max_by_key(|(_, n)| *n) {
        *largest += residue;
    }
    let out = units
        .into_iter()
        .map(|(r, n)| InkRatio {
            ratio: n as f64 / per_percent,
            ..r
        })
        .collect();
    Ok(out)
}

/// Total ink coverage: percentage of full-strength pigment deposited.
pub fn coverage(ratios: &[InkRatio]) -> f64 {
    ratios
        .iter()
        .map(|r| r.ratio * r.tier.fraction())
        .sum()
}

/// Relative cost surcharge of a mix of `(ratio, tier, type)` shares.
/// Diluted tiers and premium ink types cost more.
pub fn cost_penalty(shares: impl IntoIterator<Item = (f64, ConcentrationTier, InkType)>) -> f64 {
    shares
        .into_iter()
        .map(|(ratio, tier, ink_type)| {
            (ratio / 100.0) * ((100.0 - tier.percent() as f64) / 100.0 + ink_type.premium())
        })
        .sum()
}

/// How a recipe was produced and how well it is expected to match.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeScore {
    pub target: LabColor,
    pub mixed: LabColor,
    pub delta_e: f64,
    pub method: DeltaEMethod,
    pub optimizer: String,
    pub model: MixingModelKind,
    pub cost_index: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    inks: Vec<InkRatio>,
    target: LabColor,
    mixed: LabColor,
    delta_e: f64,
    method: DeltaEMethod,
    optimizer: String,
    model: MixingModelKind,
    cost_index: f64,
    confidence: f64,
}

impl Recipe {
    /// Normalize `ratios` and attach the score.
    pub fn new(ratios: Vec<InkRatio>, score: RecipeScore) -> Result<Self, RecipeError> {
        let inks = normalize_ratios(ratios)?;
        Ok(Self {
            inks,
            target: score.target,
            mixed: score.mixed,
            delta_e: score.delta_e,
            method: score.method,
            optimizer: score.optimizer,
            model: score.model,
            cost_index: score.cost_index,
            confidence: score.confidence.clamp(0.0, 1.0),
        })
    }

    pub fn inks(&self) -> &[InkRatio] {
        &self.inks
    }

    pub fn ink_ids(&self) -> impl Iterator<Item = &str> {
        self.inks.iter().map(|r| r.ink_id.as_str())
    }

    pub fn ratio_of(&self, ink_id: &str) -> Option<f64> {
        self.inks
            .iter()
            .find(|r| r.ink_id == ink_id)
            .map(|r| r.ratio)
    }

    pub fn target(&self) -> LabColor {
        self.target
    }

    /// Predicted color of the mix.
    pub fn mixed(&self) -> LabColor {
        self.mixed
    }

    pub fn delta_e(&self) -> f64 {
        self.delta_e
    }

    pub fn method(&self) -> DeltaEMethod {
        self.method
    }

    pub fn optimizer(&self) -> &str {
        &self.optimizer
    }

    pub fn model(&self) -> MixingModelKind {
        self.model
    }

    pub fn cost_index(&self) -> f64 {
        self.cost_index
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn coverage(&self) -> f64 {
        coverage(&self.inks)
    }
}
