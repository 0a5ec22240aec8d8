//! Recipe optimization search
//!
//! The search runs in three stages:
//!
//! 1. **Enumerate**: rank candidate inks by relevance to the target, then
//!    expand every ink subset up to `maxInkCount` into one branch per tier
//!    assignment (see [`combinations`]).
//! 2. **Optimize**: each branch runs a seeded ensemble search over its
//!    ratio simplex. Branches run on rayon when there are more than
//!    [`PARALLEL_THRESHOLD`] of them.
//! 3. **Rank**: branch winners become normalized [`Recipe`]s, duplicates
//!    are dropped and the rest is sorted by Delta E.
//!
//! Constraint problems never surface as errors. An empty outcome carries
//! a [`NoResultReason`] instead. A mixing model failure that leaves the
//! search without any recipe is returned as [`OptimizeError::Mix`].

mod cache;
mod cancel;
pub mod combinations;
mod constraints;
mod ensemble;

use std::collections::HashMap;
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

use crate::color::{delta_e_unchecked, ColorError, DeltaEMethod, DeltaEWeights, LabColor};
use crate::ink::{ConcentrationTier, Ink, RegionTable};
use crate::mixing::{MixError, MixingModel, Pigment};
use crate::recipe::{cost_penalty, InkRatio, Recipe, RecipeScore};

pub use cache::{CacheKey, RecipeCache, DEFAULT_CAPACITY, DEFAULT_TTL};
pub use cancel::CancelToken;
pub use constraints::{ConstraintError, OptimizationConstraints, SearchOptions};

use ensemble::{search_branch, BranchResult, Member, Objective, Rejection};

/// Branch count above which branches are evaluated in parallel.
pub const PARALLEL_THRESHOLD: usize = 8;
/// Ratios within this many percentage points count as the same recipe.
pub const DUPLICATE_TOLERANCE: f64 = 1.0;

const OPTIMIZER_TAG: &str = "ensemble";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptimizeError {
    #[error("invalid target: {0}")]
    Target(#[from] ColorError),

    #[error(transparent)]
    Constraint(#[from] ConstraintError),

    #[error("mixing model failed: {0}")]
    Mix(#[from] MixError),
}

/// Why a search produced no recipes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoResultReason {
    EmptyCatalog,
    NoAllowedTiers,
    NoCombination,
    TacImpossible,
}

impl NoResultReason {
    pub fn code(&self) -> &'static str {
        match self {
            NoResultReason::EmptyCatalog => "EMPTY_CATALOG",
            NoResultReason::NoAllowedTiers => "NO_ALLOWED_TIERS",
            NoResultReason::NoCombination => "NO_COMBINATION",
            NoResultReason::TacImpossible => "TAC_IMPOSSIBLE",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchStats {
    pub candidates: usize,
    pub branches: usize,
    pub evaluations: usize,
    pub skipped_tac: usize,
    pub truncated: bool,
    pub elapsed_ms: u64,
    pub cache_hit: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationOutcome {
    /// Best first.
    pub recipes: Vec<Recipe>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<NoResultReason>,
    /// Search stopped early; `recipes` holds the best found so far.
    pub cancelled: bool,
    pub stats: SearchStats,
}

impl OptimizationOutcome {
    fn empty(reason: NoResultReason, stats: SearchStats) -> Self {
        Self {
            recipes: Vec::new(),
            reason: Some(reason),
            cancelled: false,
            stats,
        }
    }

    pub fn best(&self) -> Option<&Recipe> {
        self.recipes.first()
    }
}

/// One search request over a fixed ink list.
pub struct Search<'a> {
    pub target: LabColor,
    pub inks: &'a [Ink],
    pub constraints: &'a OptimizationConstraints,
    pub options: &'a SearchOptions,
    pub model: &'a dyn MixingModel,
    pub method: DeltaEMethod,
    pub weights: Option<DeltaEWeights>,
    pub regions: &'a RegionTable,
    pub cancel: &'a CancelToken,
}

impl Search<'_> {
    pub fn run(&self) -> Result<OptimizationOutcome, OptimizeError> {
        self.target.validate()?;
        self.constraints.validate()?;
        self.options.validate()?;
        let started = Instant::now();

        let enumeration = match combinations::enumerate(
            self.inks,
            self.target,
            self.constraints,
            self.regions,
            self.options.max_branches,
        ) {
            Ok(e) => e,
            Err(reason) => {
                tracing::debug!(reason = reason.code(), "No branches to search");
                return Ok(OptimizationOutcome::empty(reason, SearchStats::default()));
            }
        };
        tracing::debug!(
            candidates = enumeration.candidates,
            branches = enumeration.branches.len(),
            skipped_tac = enumeration.skipped_tac,
            "Enumerated search branches"
        );

        let pigments = self.prepare_pigments(&enumeration.branches);
        let objective = Objective {
            target: self.target,
            method: self.method,
            weights: self.weights,
            model: self.model,
            constraints: self.constraints,
        };

        let run_branch = |branch: &combinations::Branch| -> (Vec<(usize, ConcentrationTier)>, BranchResult) {
            let members: Vec<Member<'_>> = branch
                .members
                .iter()
                .filter_map(|&(i, tier)| {
                    pigments.get(&(i, tier)).map(|pigment| Member {
                        ink: &self.inks[i],
                        tier,
                        pigment,
                    })
                })
                .collect();
            let result = search_branch(&objective, &members, self.options, self.cancel);
            (branch.members.clone(), result)
        };

        let results: Vec<_> = if enumeration.branches.len() > PARALLEL_THRESHOLD {
            enumeration.branches.par_iter().map(run_branch).collect()
        } else {
            enumeration.branches.iter().map(run_branch).collect()
        };

        let mut stats = SearchStats {
            candidates: enumeration.candidates,
            branches: enumeration.branches.len(),
            skipped_tac: enumeration.skipped_tac,
            truncated: enumeration.truncated || enumeration.capped,
            ..Default::default()
        };
        let mut cancelled = false;
        let mut recipes = Vec::new();
        let mut tac_only = true;
        let mut first_error: Option<MixError> = None;
        for (members, result) in results {
            stats.evaluations += result.evaluations;
            cancelled |= result.interrupted;
            if let Some(err) = result.error {
                tac_only = false;
                first_error.get_or_insert(err);
            }
            let Some(best) = result.best else {
                if result.tac_rejections == 0 {
                    tac_only = false;
                }
                continue;
            };
            match self.assemble(&members, &best.weights, &pigments) {
                Ok(recipe) => recipes.push(recipe),
                Err(Rejection::Tac) => {}
                Err(Rejection::Model(err)) => {
                    tac_only = false;
                    first_error.get_or_insert(err);
                }
                Err(Rejection::Rounding) => tac_only = false,
            }
        }

        let recipes = rank(recipes, self.options.max_results);
        stats.elapsed_ms = started.elapsed().as_millis() as u64;

        if cancelled {
            tracing::warn!(
                found = recipes.len(),
                "Search interrupted, returning best results so far"
            );
        }
        tracing::debug!(
            found = recipes.len(),
            best = recipes.first().map(Recipe::delta_e),
            evaluations = stats.evaluations,
            elapsed_ms = stats.elapsed_ms,
            "Search finished"
        );

        let reason = match (recipes.is_empty() && !cancelled, first_error) {
            (false, _) => None,
            (true, Some(err)) => {
                tracing::warn!(error = %err, "Mixing model rejected every candidate");
                return Err(OptimizeError::Mix(err));
            }
            (true, None) if tac_only => Some(NoResultReason::TacImpossible),
            (true, None) => Some(NoResultReason::NoCombination),
        };
        Ok(OptimizationOutcome {
            recipes,
            reason,
            cancelled,
            stats,
        })
    }

    fn prepare_pigments(
        &self,
        branches: &[combinations::Branch],
    ) -> HashMap<(usize, ConcentrationTier), Pigment> {
        let mut needed: Vec<(usize, ConcentrationTier)> = branches
            .iter()
            .flat_map(|b| b.members.iter().copied())
            .collect();
        needed.sort();
        needed.dedup();
        needed
            .into_par_iter()
            .map(|(i, tier)| ((i, tier), self.model.pigment(&self.inks[i], tier)))
            .collect()
    }

    /// Turn branch weights into a normalized recipe and re-predict its
    /// color with the rounded ratios.
    fn assemble(
        &self,
        members: &[(usize, ConcentrationTier)],
        weights: &[f64],
        pigments: &HashMap<(usize, ConcentrationTier), Pigment>,
    ) -> Result<Recipe, Rejection> {
        let ratios: Vec<InkRatio> = members
            .iter()
            .zip(weights)
            .map(|(&(i, tier), &w)| InkRatio::new(self.inks[i].id(), 100.0 * w, tier))
            .collect();
        let mut ratios =
            crate::recipe::normalize_ratios(ratios).map_err(|_| Rejection::Rounding)?;
        if let Some(limit) = self.constraints.tac_limit {
            ratios = repair_tac(ratios, limit).ok_or(Rejection::Tac)?;
        }

        let lookup = |r: &InkRatio| {
            members
                .iter()
                .find(|&&(i, tier)| self.inks[i].id() == r.ink_id && tier == r.tier)
                .map(|&(i, _)| i)
        };
        let mut parts = Vec::with_capacity(ratios.len());
        let mut shares = Vec::with_capacity(ratios.len());
        for r in &ratios {
            let i = lookup(r).ok_or(Rejection::Rounding)?;
            let pigment = pigments.get(&(i, r.tier)).ok_or(Rejection::Rounding)?;
            parts.push((pigment, r.ratio));
            shares.push((r.ratio, r.tier, self.inks[i].ink_type()));
        }
        let prediction = self.model.mix(&parts).map_err(Rejection::Model)?;
        let delta_e = delta_e_unchecked(self.target, prediction.lab, self.method, self.weights);

        Recipe::new(
            ratios,
            RecipeScore {
                target: self.target,
                mixed: prediction.lab,
                delta_e,
                method: self.method,
                optimizer: OPTIMIZER_TAG.to_string(),
                model: self.model.kind(),
                cost_index: 1.0 + cost_penalty(shares),
                confidence: prediction.confidence,
            },
        )
        .map_err(|_| Rejection::Rounding)
    }
}

/// Shift 0.1-point steps from the strongest to the weakest tier until
/// rounded ratios fit under the TAC ceiling.
fn repair_tac(mut ratios: Vec<InkRatio>, limit: f64) -> Option<Vec<InkRatio>> {
    const MAX_STEPS: usize = 20;
    for _ in 0..MAX_STEPS {
        if crate::recipe::coverage(&ratios) <= limit + 1e-9 {
            return Some(ratios);
        }
        let strong = ratios
            .iter()
            .enumerate()
            .filter(|(_, r)| r.ratio >= 0.1)
            .max_by_key(|(_, r)| r.tier)
            .map(|(i, _)| i)?;
        let weak = ratios
            .iter()
            .enumerate()
            .min_by_key(|(_, r)| r.tier)
            .map(|(i, _)| i)?;
        if ratios[strong].tier == ratios[weak].tier {
            return None;
        }
        ratios[strong].ratio = ((ratios[strong].ratio - 0.1) * 10.0).round() / 10.0;
        ratios[weak].ratio = ((ratios[weak].ratio + 0.1) * 10.0).round() / 10.0;
    }
    (crate::recipe::coverage(&ratios) <= limit + 1e-9).then_some(ratios)
}

fn same_recipe(a: &Recipe, b: &Recipe) -> bool {
    a.inks().len() == b.inks().len()
        && a.inks().iter().all(|ra| {
            b.ratio_of(&ra.ink_id)
                .is_some_and(|rb| (ra.ratio - rb).abs() <= DUPLICATE_TOLERANCE)
        })
}

/// Sort by Delta E, then confidence, then cost, dropping near-duplicates.
fn rank(mut recipes: Vec<Recipe>, max_results: usize) -> Vec<Recipe> {
    recipes.sort_by(|a, b| {
        a.delta_e()
            .total_cmp(&b.delta_e())
            .then_with(|| b.confidence().total_cmp(&a.confidence()))
            .then_with(|| a.cost_index().total_cmp(&b.cost_index()))
    });
    let mut kept: Vec<Recipe> = Vec::with_capacity(max_results);
    for recipe in recipes {
        if kept.len() == max_results {
            break;
        }
        if !kept.iter().any(|k| same_recipe(k, &recipe)) {
            kept.push(recipe);
        }
    }
    kept
}
