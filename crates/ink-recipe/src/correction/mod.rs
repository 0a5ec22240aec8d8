//! Correction and feasibility engine
//!
//! Given a target, the measured color of a printed sample and the recipe
//! that produced it, work out which inks to add and how much. One call is
//! one correction cycle:
//!
//! ```text
//! Measured -> Analyzed -> Feasible -> Amended -> Predicted
//!                      \-> Infeasible -> Reported
//! ```
//!
//! Predictions for the amended recipe carry the model's observed bias: the
//! difference between the measured sample and what the model predicted for
//! the original recipe is added to the model's prediction for the amended
//! one.

mod phase;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::color::{delta_e, delta_e_unchecked, ColorError, DeltaEMethod, LabColor};
use crate::ink::{ConcentrationTier, Ink, InkCatalog};
use crate::mixing::{MixError, MixPrediction, MixingModel, Pigment};
use crate::recipe::{cost_penalty, coverage, InkRatio, Recipe, RecipeError, RecipeScore};

pub use phase::{CorrectionPhase, PhaseTrail};

/// Largest share of the amended batch all additions together may take.
const MAX_FRACTION: f64 = 0.9;
/// Smallest move along an axis, in Lab units per unit fraction, for an
/// ink to be picked for that axis.
const MIN_SENSITIVITY: f64 = 0.5;
/// Common scale range searched when refining the additions.
const SCALE_RANGE: (f64, f64) = (0.0, 3.0);
const GOLDEN_ITERATIONS: usize = 60;
const OPTIMIZER_TAG: &str = "correction";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CorrectionError {
    #[error("illegal correction transition {from} -> {to}")]
    InvalidTransition {
        from: CorrectionPhase,
        to: CorrectionPhase,
    },

    #[error(transparent)]
    Color(#[from] ColorError),

    #[error("recipe ink '{0}' is not in the catalog")]
    UnknownInk(String),

    #[error(transparent)]
    Recipe(#[from] RecipeError),

    #[error(transparent)]
    Mix(#[from] MixError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionSettings {
    /// Per-axis error below which an axis is left alone.
    pub axis_threshold: f64,
    pub max_correctable_delta_e: f64,
    /// Ceiling on total additions, in parts per 100 of the batch.
    pub max_addition_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tac_limit: Option<f64>,
}

impl Default for CorrectionSettings {
    fn default() -> Self {
        Self {
            axis_threshold: 1.0,
            max_correctable_delta_e: 20.0,
            max_addition_percent: 50.0,
            tac_limit: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    #[serde(rename = "L")]
    L,
    #[serde(rename = "a")]
    A,
    #[serde(rename = "b")]
    B,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::L, Axis::A, Axis::B];

    fn index(self) -> usize {
        match self {
            Axis::L => 0,
            Axis::A => 1,
            Axis::B => 2,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Axis::L => "L",
            Axis::A => "a",
            Axis::B => "b",
        })
    }
}

/// A Lab difference `(dL, da, db)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LabDelta {
    #[serde(rename = "dL")]
    pub dl: f64,
    pub da: f64,
    pub db: f64,
}

impl LabDelta {
    pub fn from_array(v: [f64; 3]) -> Self {
        Self {
            dl: v[0],
            da: v[1],
            db: v[2],
        }
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.dl, self.da, self.db]
    }

    fn scaled(self, f: f64) -> Self {
        Self::from_array(self.to_array().map(|x| x * f))
    }
}

/// Kind of special ink that would be needed when the catalog cannot move
/// an axis in the required direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpecialInkCategory {
    OpaqueWhite,
    ToningBlack,
    FluorescentRed,
    GreenSpecial,
    FluorescentYellow,
    VioletBlueSpecial,
}

impl SpecialInkCategory {
    /// Category that moves `axis` in the direction of `sign`.
    pub fn for_direction(axis: Axis, positive: bool) -> Self {
        match (axis, positive) {
            (Axis::L, true) => SpecialInkCategory::OpaqueWhite,
            (Axis::L, false) => SpecialInkCategory::ToningBlack,
            (Axis::A, true) => SpecialInkCategory::FluorescentRed,
            (Axis::A, false) => SpecialInkCategory::GreenSpecial,
            (Axis::B, true) => SpecialInkCategory::FluorescentYellow,
            (Axis::B, false) => SpecialInkCategory::VioletBlueSpecial,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InfeasibleReason {
    ColorDifferenceTooLarge,
    NoSuitableInks,
    TacLimitReached,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Feasibility {
    Feasible,
    Infeasible {
        reason: InfeasibleReason,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        categories: Vec<SpecialInkCategory>,
    },
}

impl Feasibility {
    pub fn is_feasible(&self) -> bool {
        matches!(self, Feasibility::Feasible)
    }
}

/// Ink to add, in parts per 100 parts of the existing batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionSuggestion {
    pub ink_id: String,
    pub add_amount: f64,
    pub expected_impact: LabDelta,
    pub axes: Vec<Axis>,
    #[serde(rename = "concentrationTier", default)]
    pub tier: ConcentrationTier,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionAnalysis {
    pub delta_e: f64,
    /// `target - actual`
    pub error: LabDelta,
    pub feasibility: Feasibility,
    pub suggestions: Vec<CorrectionSuggestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amended: Option<Recipe>,
    /// Model prediction for the amended recipe, bias corrected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted: Option<LabColor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted_delta_e: Option<f64>,
    pub phases: PhaseTrail,
}

/// Linear estimate of the color after applying `suggestions` to a sample
/// measuring `actual`. Not clamped to the Lab domain.
pub fn predict_corrected_color(actual: LabColor, suggestions: &[CorrectionSuggestion]) -> LabColor {
    let mut out = actual.to_array();
    for s in suggestions {
        for (o, d) in out.iter_mut().zip(s.expected_impact.to_array()) {
            *o += d;
        }
    }
    LabColor::from_array(out)
}

/// Inputs for one correction cycle.
pub struct Correction<'a> {
    pub target: LabColor,
    pub actual: LabColor,
    /// The recipe that produced the measured sample.
    pub recipe: &'a [InkRatio],
    /// Every ink the recipe may reference.
    pub inks: &'a [Ink],
    /// Inks that may be added.
    pub addable: &'a [Ink],
    pub settings: &'a CorrectionSettings,
    pub model: &'a dyn MixingModel,
    pub method: DeltaEMethod,
}

/// One ink of a batch with its optical constants.
#[derive(Clone)]
struct Part<'a> {
    ink: &'a Ink,
    tier: ConcentrationTier,
    parts: f64,
    pigment: Pigment,
}

/// A suggested addition together with what is needed to re-mix it.
struct Planned<'a> {
    ink: &'a Ink,
    tier: ConcentrationTier,
    /// Ink color minus the measured sample.
    vector: [f64; 3],
    amount: f64,
    axes: Vec<Axis>,
}

impl Planned<'_> {
    fn impact(&self, amount: f64) -> LabDelta {
        LabDelta::from_array(self.vector).scaled(amount / (100.0 + amount))
    }

    fn suggestion(&self) -> CorrectionSuggestion {
        CorrectionSuggestion {
            ink_id: self.ink.id().to_string(),
            add_amount: self.amount,
            expected_impact: self.impact(self.amount),
            axes: self.axes.clone(),
            tier: self.tier,
        }
    }
}

impl<'a> Correction<'a> {
    pub fn analyze(&self) -> Result<CorrectionAnalysis, CorrectionError> {
        self.target.validate()?;
        self.actual.validate()?;
        let original = self.original_parts()?;

        let mut phases = PhaseTrail::new();
        let error = self.target.difference(&self.actual);
        let de = delta_e(self.target, self.actual, self.method, None)?;
        phases.advance(CorrectionPhase::Analyzed)?;

        let mut analysis = CorrectionAnalysis {
            delta_e: de,
            error: LabDelta::from_array(error),
            feasibility: Feasibility::Feasible,
            suggestions: Vec::new(),
            amended: None,
            predicted: None,
            predicted_delta_e: None,
            phases,
        };

        if de > self.settings.max_correctable_delta_e {
            return self.report(analysis, InfeasibleReason::ColorDifferenceTooLarge, Vec::new());
        }

        let mut planned: Vec<Planned<'a>> = Vec::new();
        let mut missing = Vec::new();
        for axis in Axis::ALL {
            let e = error[axis.index()];
            if e.abs() <= self.settings.axis_threshold {
                continue;
            }
            match self.pick(axis, e) {
                Some(pick) => merge(&mut planned, pick),
                None => missing.push(SpecialInkCategory::for_direction(axis, e > 0.0)),
            }
        }
        if !missing.is_empty() {
            return self.report(analysis, InfeasibleReason::NoSuitableInks, missing);
        }

        solve_amounts(&mut planned, error);

        let bias = self.model_bias(&original)?;
        let pigments: Vec<Pigment> = planned
            .iter()
            .map(|p| self.model.pigment(p.ink, p.tier))
            .collect();
        let scale = if planned.is_empty() {
            1.0
        } else {
            self.refine_scale(&original, &planned, &pigments, bias)
        };
        for p in planned.iter_mut() {
            p.amount = round_tenth(p.amount * scale);
        }
        let kept: Vec<(Planned<'a>, Pigment)> = planned
            .into_iter()
            .zip(pigments)
            .filter(|(p, _)| p.amount > 0.0)
            .collect();
        analysis.suggestions = kept.iter().map(|(p, _)| p.suggestion()).collect();

        let amended_parts = amend(&original, kept.iter().map(|(p, pig)| (p, pig, p.amount)));
        let total_parts: f64 = amended_parts.iter().map(|p| p.parts).sum();
        let amended_ratios: Vec<InkRatio> = amended_parts
            .iter()
            .map(|p| InkRatio::new(p.ink.id(), p.parts * 100.0 / total_parts, p.tier))
            .collect();

        let total_addition: f64 = analysis.suggestions.iter().map(|s| s.add_amount).sum();
        let amended_coverage = coverage(&amended_ratios);
        let over_tac = match self.settings.tac_limit {
            Some(limit) => amended_coverage > limit + 1e-9,
            None => false,
        };
        if total_addition > self.settings.max_addition_percent || over_tac {
            tracing::info!(
                total_addition,
                coverage = amended_coverage,
                "Correction exceeds addition or coverage limits"
            );
            return self.report(analysis, InfeasibleReason::TacLimitReached, Vec::new());
        }
        analysis.phases.advance(CorrectionPhase::Feasible)?;

        let prediction = mix(self.model, &amended_parts)?;
        let predicted = shift(prediction.lab, bias);
        let predicted_de = delta_e_unchecked(self.target, predicted, self.method, None);
        let cost_index = 1.0
            + cost_penalty(
                amended_ratios
                    .iter()
                    .zip(&amended_parts)
                    .map(|(r, p)| (r.ratio, r.tier, p.ink.ink_type())),
            );
        let amended = Recipe::new(
            amended_ratios,
            RecipeScore {
                target: self.target,
                mixed: predicted,
                delta_e: predicted_de,
                method: self.method,
                optimizer: OPTIMIZER_TAG.to_string(),
                model: self.model.kind(),
                cost_index,
                confidence: prediction.confidence,
            },
        )?;
        analysis.amended = Some(amended);
        analysis.phases.advance(CorrectionPhase::Amended)?;

        analysis.predicted = Some(predicted);
        analysis.predicted_delta_e = Some(predicted_de);
        analysis.phases.advance(CorrectionPhase::Predicted)?;

        tracing::info!(
            delta_e = de,
            predicted_delta_e = predicted_de,
            suggestions = analysis.suggestions.len(),
            "Correction analyzed"
        );
        Ok(analysis)
    }

    fn report(
        &self,
        mut analysis: CorrectionAnalysis,
        reason: InfeasibleReason,
        categories: Vec<SpecialInkCategory>,
    ) -> Result<CorrectionAnalysis, CorrectionError> {
        tracing::info!(?reason, ?categories, delta_e = analysis.delta_e, "Correction infeasible");
        analysis.phases.advance(CorrectionPhase::Infeasible)?;
        analysis.feasibility = Feasibility::Infeasible { reason, categories };
        analysis.phases.advance(CorrectionPhase::Reported)?;
        Ok(analysis)
    }

    /// Tier an ink is added at: its tier in the recipe, else full strength.
    fn tier_for(&self, ink: &Ink) -> ConcentrationTier {
        self.recipe
            .iter()
            .find(|r| r.ink_id == ink.id())
            .map(|r| r.tier)
            .unwrap_or(ConcentrationTier::FULL)
    }

    /// Best ink for moving `axis` by `error`: the largest move along the
    /// axis relative to its side effects on the other two.
    fn pick(&self, axis: Axis, error: f64) -> Option<Planned<'a>> {
        let k = axis.index();
        let mut best: Option<(f64, Planned<'a>)> = None;
        for ink in self.addable {
            let tier = self.tier_for(ink);
            let v = ink.lab_at(tier).difference(&self.actual);
            let m = v[k] * error.signum();
            if m < MIN_SENSITIVITY {
                continue;
            }
            let side: f64 = (0..3)
                .filter(|&i| i != k)
                .map(|i| v[i] * v[i])
                .sum::<f64>()
                .sqrt();
            let score = m / (1.0 + side);
            if best.as_ref().map_or(true, |(s, _)| score > *s) {
                best = Some((
                    score,
                    Planned {
                        ink,
                        tier,
                        vector: v,
                        amount: 0.0,
                        axes: vec![axis],
                    },
                ));
            }
        }
        best.map(|(_, p)| p)
    }

    fn original_parts(&self) -> Result<Vec<Part<'a>>, CorrectionError> {
        if self.recipe.is_empty() {
            return Err(RecipeError::Empty.into());
        }
        self.recipe
            .iter()
            .map(|r| {
                let ink = self
                    .inks
                    .iter()
                    .find(|i| i.id() == r.ink_id)
                    .ok_or_else(|| CorrectionError::UnknownInk(r.ink_id.clone()))?;
                Ok(Part {
                    ink,
                    tier: r.tier,
                    parts: r.ratio,
                    pigment: self.model.pigment(ink, r.tier),
                })
            })
            .collect()
    }

    /// Measured minus predicted for the original recipe.
    fn model_bias(&self, original: &[Part<'_>]) -> Result<[f64; 3], CorrectionError> {
        let predicted = mix(self.model, original)?;
        Ok(self.actual.difference(&predicted.lab))
    }

    /// Golden-section search for the common scale on all additions that
    /// minimizes the predicted Delta E of the amended batch. When the
    /// linear plan fits the addition budget the scale stays within it.
    fn refine_scale(
        &self,
        original: &[Part<'a>],
        planned: &[Planned<'a>],
        pigments: &[Pigment],
        bias: [f64; 3],
    ) -> f64 {
        let objective = |s: f64| -> f64 {
            let parts = amend(
                original,
                planned.iter().zip(pigments).map(|(p, pig)| (p, pig, p.amount * s)),
            );
            match mix(self.model, &parts) {
                Ok(p) => delta_e_unchecked(self.target, shift(p.lab, bias), self.method, None),
                Err(_) => f64::INFINITY,
            }
        };
        let total: f64 = planned.iter().map(|p| p.amount).sum();
        let budget = self.settings.max_addition_percent / total;
        let hi = if budget >= 1.0 {
            SCALE_RANGE.1.min(budget)
        } else {
            SCALE_RANGE.1
        };
        let scale = golden_section(objective, SCALE_RANGE.0, hi);
        tracing::debug!(scale, "Refined correction scale");
        scale
    }
}

/// Fold a per-axis pick into the plan: one entry per ink, axes accumulate.
fn merge<'a>(planned: &mut Vec<Planned<'a>>, pick: Planned<'a>) {
    match planned.iter_mut().find(|p| p.ink.id() == pick.ink.id()) {
        Some(existing) => existing.axes.extend(pick.axes),
        None => planned.push(pick),
    }
}

/// Set the addition of every planned ink at once.
///
/// Mixing a fraction `w` of an ink into the batch moves its color by about
/// `w * vector`, so the fractions are the non-negative least-squares fit of
/// `sum(w_i * vector_i) = error`. Their sum is capped at [`MAX_FRACTION`]
/// and converted to parts per 100 parts of batch.
fn solve_amounts(planned: &mut [Planned<'_>], error: [f64; 3]) {
    let n = planned.len();
    let mut best: Option<(f64, Vec<f64>)> = None;
    for mask in 1..(1usize << n) {
        let active: Vec<usize> = (0..n).filter(|i| mask & (1 << i) != 0).collect();
        let columns: Vec<[f64; 3]> = active.iter().map(|&i| planned[i].vector).collect();
        let Some(w) = least_squares(&columns, error) else {
            continue;
        };
        if w.iter().any(|&x| x <= 0.0) {
            continue;
        }
        let mut fit = [0.0; 3];
        for (col, x) in columns.iter().zip(&w) {
            for k in 0..3 {
                fit[k] += col[k] * x;
            }
        }
        let residual: f64 = (0..3).map(|k| (error[k] - fit[k]).powi(2)).sum();
        if best.as_ref().map_or(true, |(r, _)| residual < *r) {
            let mut full = vec![0.0; n];
            for (&i, x) in active.iter().zip(w) {
                full[i] = x;
            }
            best = Some((residual, full));
        }
    }

    let mut fractions = best.map(|(_, w)| w).unwrap_or_else(|| vec![0.0; n]);
    let total: f64 = fractions.iter().sum();
    if total > MAX_FRACTION {
        for w in fractions.iter_mut() {
            *w *= MAX_FRACTION / total;
        }
    }
    let total = total.min(MAX_FRACTION);
    for (p, w) in planned.iter_mut().zip(fractions) {
        p.amount = 100.0 * w / (1.0 - total);
    }
}

/// Least-squares coefficients of `rhs` over at most three columns, from the
/// normal equations. `None` when the columns are degenerate.
fn least_squares(columns: &[[f64; 3]], rhs: [f64; 3]) -> Option<Vec<f64>> {
    let n = columns.len();
    let dot = |a: &[f64; 3], b: &[f64; 3]| a[0] * b[0] + a[1] * b[1] + a[2] * b[2];
    let mut m: Vec<Vec<f64>> = columns
        .iter()
        .map(|ci| {
            let mut row: Vec<f64> = columns.iter().map(|cj| dot(ci, cj)).collect();
            row.push(dot(ci, &rhs));
            row
        })
        .collect();

    for col in 0..n {
        let pivot = (col..n).max_by(|&a, &b| m[a][col].abs().total_cmp(&m[b][col].abs()))?;
        if m[pivot][col].abs() < 1e-12 {
            return None;
        }
        m.swap(col, pivot);
        let pivot_row = m[col].clone();
        for (row, values) in m.iter_mut().enumerate() {
            if row != col {
                let factor = values[col] / pivot_row[col];
                for k in col..=n {
                    values[k] -= factor * pivot_row[k];
                }
            }
        }
    }
    Some((0..n).map(|i| m[i][n] / m[i][i]).collect())
}

/// The original batch plus additions. An addition of an ink already in
/// the batch goes onto its existing entry.
fn amend<'a, 'p>(
    original: &[Part<'a>],
    additions: impl Iterator<Item = (&'p Planned<'a>, &'p Pigment, f64)>,
) -> Vec<Part<'a>>
where
    'a: 'p,
{
    let mut parts = original.to_vec();
    for (plan, pigment, amount) in additions {
        match parts.iter_mut().find(|p| p.ink.id() == plan.ink.id()) {
            Some(existing) => existing.parts += amount,
            None => parts.push(Part {
                ink: plan.ink,
                tier: plan.tier,
                parts: amount,
                pigment: pigment.clone(),
            }),
        }
    }
    parts
}

fn mix(model: &dyn MixingModel, parts: &[Part<'_>]) -> Result<MixPrediction, MixError> {
    let weighted: Vec<(&Pigment, f64)> = parts.iter().map(|p| (&p.pigment, p.parts)).collect();
    model.mix(&weighted)
}

fn shift(lab: LabColor, by: [f64; 3]) -> LabColor {
    let v = lab.to_array();
    LabColor::from_array([v[0] + by[0], v[1] + by[1], v[2] + by[2]])
}

fn round_tenth(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Minimize a unimodal `f` on `[lo, hi]`.
fn golden_section(f: impl Fn(f64) -> f64, mut lo: f64, mut hi: f64) -> f64 {
    let ratio = (5f64.sqrt() - 1.0) / 2.0;
    let mut x1 = hi - ratio * (hi - lo);
    let mut x2 = lo + ratio * (hi - lo);
    let mut f1 = f(x1);
    let mut f2 = f(x2);
    for _ in 0..GOLDEN_ITERATIONS {
        if f1 <= f2 {
            hi = x2;
            x2 = x1;
            f2 = f1;
            x1 = hi - ratio * (hi - lo);
            f1 = f(x1);
        } else {
            lo = x1;
            x1 = x2;
            f1 = f2;
            x2 = lo + ratio * (hi - lo);
            f2 = f(x2);
        }
    }
    (lo + hi) / 2.0
}
