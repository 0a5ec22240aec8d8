//! Search constraints and tuning options.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ink::ConcentrationTier;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstraintError {
    #[error("maxInkCount must be at least 1")]
    MaxInkCount,

    #[error("costWeight {0} outside 0..=1")]
    CostWeight(f64),

    #[error("tacLimit {0} must be positive")]
    TacLimit(f64),

    #[error("search option '{0}' must be positive")]
    Option(&'static str),
}

/// Practical limits a recipe must respect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OptimizationConstraints {
    pub max_ink_count: usize,
    pub allowed_tiers: BTreeSet<ConcentrationTier>,
    pub include_white: bool,
    /// Trade-off between accuracy (0) and cost (1).
    pub cost_weight: f64,
    /// Hard ceiling on total ink coverage, in percent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tac_limit: Option<f64>,
}

impl Default for OptimizationConstraints {
    fn default() -> Self {
        Self {
            max_ink_count: 4,
            allowed_tiers: BTreeSet::from([ConcentrationTier::FULL]),
            include_white: false,
            cost_weight: 0.0,
            tac_limit: None,
        }
    }
}

impl OptimizationConstraints {
    pub fn validate(&self) -> Result<(), ConstraintError> {
        if self.max_ink_count == 0 {
            return Err(ConstraintError::MaxInkCount);
        }
        if !(0.0..=1.0).contains(&self.cost_weight) {
            return Err(ConstraintError::CostWeight(self.cost_weight));
        }
        if let Some(tac) = self.tac_limit {
            if !(tac > 0.0 && tac.is_finite()) {
                return Err(ConstraintError::TacLimit(tac));
            }
        }
        Ok(())
    }

    /// True when `coverage` respects the TAC ceiling.
    pub fn within_tac(&self, coverage: f64) -> bool {
        match self.tac_limit {
            Some(limit) => coverage <= limit + 1e-9,
            None => true,
        }
    }
}

/// Tuning knobs for the ratio search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Iteration budget per branch.
    pub iterations: usize,
    /// Particles per branch.
    pub population: usize,
    /// Iterations without meaningful improvement before a branch stops.
    pub patience: usize,
    /// Minimum score improvement that resets patience.
    pub epsilon: f64,
    pub seed: u64,
    pub max_results: usize,
    /// Upper bound on enumerated (subset, tier assignment) branches.
    pub max_branches: usize,
    /// Wall-clock cutoff. Never part of the cache key.
    #[serde(skip)]
    pub deadline: Option<Instant>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            iterations: 300,
            population: 12,
            patience: 40,
            epsilon: 1e-4,
            seed: 42,
            max_results: 5,
            max_branches: 4000,
            deadline: None,
        }
    }
}

impl SearchOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn validate(&self) -> Result<(), ConstraintError> {
        for (name, value) in [
            ("iterations", self.iterations),
            ("population", self.population),
            ("max_results", self.max_results),
            ("max_branches", self.max_branches),
        ] {
            if value == 0 {
                return Err(ConstraintError::Option(name));
            }
        }
        if !(self.epsilon >= 0.0) {
            return Err(ConstraintError::Option("epsilon"));
        }
        Ok(())
    }

    pub(crate) fn expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}
