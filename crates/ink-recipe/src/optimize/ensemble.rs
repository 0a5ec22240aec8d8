//! Seeded ensemble search over the ratio simplex of one branch.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::color::{delta_e_unchecked, DeltaEMethod, DeltaEWeights, LabColor};
use crate::ink::{ConcentrationTier, Ink};
use crate::mixing::{MixError, MixPrediction, MixingModel, Pigment};
use crate::recipe::cost_penalty;

use super::cancel::CancelToken;
use super::constraints::{OptimizationConstraints, SearchOptions};

const INITIAL_STEP: f64 = 0.15;
const STEP_DECAY: f64 = 0.985;
const MIN_STEP: f64 = 0.002;
/// Pull toward the best particle, scaled by a uniform draw.
const ATTRACTION: f64 = 0.4;

/// Everything a branch needs besides its own inks.
pub(crate) struct Objective<'a> {
    pub target: LabColor,
    pub method: DeltaEMethod,
    pub weights: Option<DeltaEWeights>,
    pub model: &'a dyn MixingModel,
    pub constraints: &'a OptimizationConstraints,
}

pub(crate) struct Member<'a> {
    pub ink: &'a Ink,
    pub tier: ConcentrationTier,
    pub pigment: &'a Pigment,
}

#[derive(Debug, Clone)]
pub(crate) struct Evaluated {
    /// Simplex weights, summing to 1.
    pub weights: Vec<f64>,
    pub score: f64,
    pub delta_e: f64,
    pub prediction: MixPrediction,
}

/// Why a weight vector got no score.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Rejection {
    Tac,
    Model(MixError),
    /// Rounded ratios no longer form a valid recipe.
    Rounding,
}

#[derive(Debug, Default)]
pub(crate) struct BranchResult {
    pub best: Option<Evaluated>,
    pub evaluations: usize,
    pub interrupted: bool,
    pub tac_rejections: usize,
    /// First error the mixing model raised in this branch.
    pub error: Option<MixError>,
}

impl Objective<'_> {
    /// Score a weight vector. Fails when it breaks the TAC ceiling or the
    /// model rejects it.
    pub fn evaluate(&self, members: &[Member<'_>], weights: &[f64]) -> Result<Evaluated, Rejection> {
        let coverage: f64 = members
            .iter()
            .zip(weights)
            .map(|(m, w)| 100.0 * w * m.tier.fraction())
            .sum();
        if !self.constraints.within_tac(coverage) {
            return Err(Rejection::Tac);
        }
        let parts: Vec<(&Pigment, f64)> = members
            .iter()
            .zip(weights)
            .map(|(m, &w)| (m.pigment, w))
            .collect();
        let prediction = self.model.mix(&parts).map_err(Rejection::Model)?;
        let delta_e = delta_e_unchecked(self.target, prediction.lab, self.method, self.weights);
        let penalty = cost_penalty(
            members
                .iter()
                .zip(weights)
                .map(|(m, &w)| (100.0 * w, m.tier, m.ink.ink_type())),
        );
        Ok(Evaluated {
            weights: weights.to_vec(),
            score: delta_e * (1.0 + self.constraints.cost_weight * penalty),
            delta_e,
            prediction,
        })
    }
}

/// RNG seed for a branch, independent of which other branches exist.
pub(crate) fn branch_seed(seed: u64, members: &[Member<'_>]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for m in members {
        m.ink.id().hash(&mut hasher);
        m.tier.hash(&mut hasher);
    }
    seed ^ hasher.finish()
}

fn standard_normal(rng: &mut StdRng) -> f64 {
    // Box-Muller
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

fn random_simplex(rng: &mut StdRng, n: usize) -> Vec<f64> {
    let raw: Vec<f64> = (0..n)
        .map(|_| -rng.gen_range(f64::EPSILON..1.0).ln())
        .collect();
    let total: f64 = raw.iter().sum();
    raw.into_iter().map(|x| x / total).collect()
}

/// Clamp negatives and renormalize; degenerate input becomes the centroid.
fn project(weights: &mut [f64]) {
    for w in weights.iter_mut() {
        if !w.is_finite() || *w < 0.0 {
            *w = 0.0;
        }
    }
    let total: f64 = weights.iter().sum();
    let n = weights.len() as f64;
    for w in weights.iter_mut() {
        *w = if total > 1e-12 { *w / total } else { 1.0 / n };
    }
}

struct Particle {
    weights: Vec<f64>,
    score: f64,
}

pub(crate) fn search_branch(
    objective: &Objective<'_>,
    members: &[Member<'_>],
    options: &SearchOptions,
    cancel: &CancelToken,
) -> BranchResult {
    let n = members.len();
    let mut result = BranchResult::default();
    let consider = |result: &mut BranchResult, weights: &[f64]| -> f64 {
        result.evaluations += 1;
        match objective.evaluate(members, weights) {
            Ok(eval) => {
                let score = eval.score;
                if result.best.as_ref().map_or(true, |b| score < b.score) {
                    result.best = Some(eval);
                }
                score
            }
            Err(Rejection::Tac) => {
                result.tac_rejections += 1;
                f64::INFINITY
            }
            Err(Rejection::Model(err)) => {
                result.error.get_or_insert(err);
                f64::INFINITY
            }
            Err(Rejection::Rounding) => f64::INFINITY,
        }
    };

    if n == 1 {
        consider(&mut result, &[1.0]);
        return result;
    }

    let mut rng = StdRng::seed_from_u64(branch_seed(options.seed, members));

    let mut starts: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();
    starts.push(vec![1.0 / n as f64; n]);
    while starts.len() < options.population.max(n + 1) {
        starts.push(random_simplex(&mut rng, n));
    }
    let mut particles: Vec<Particle> = starts
        .into_iter()
        .map(|weights| {
            let score = consider(&mut result, &weights);
            Particle { weights, score }
        })
        .collect();

    let mut stale = 0;
    let mut step = INITIAL_STEP;
    for _ in 0..options.iterations {
        if cancel.is_cancelled() || options.expired() {
            result.interrupted = true;
            break;
        }
        let before = best_score(&result);
        let leader = result.best.as_ref().map(|b| b.weights.clone());

        for particle in particles.iter_mut() {
            let pull: f64 = rng.gen::<f64>() * ATTRACTION;
            let mut candidate: Vec<f64> = particle
                .weights
                .iter()
                .enumerate()
                .map(|(i, &w)| {
                    let toward = leader.as_ref().map_or(0.0, |l| l[i] - w);
                    w + step * standard_normal(&mut rng) + pull * toward
                })
                .collect();
            project(&mut candidate);
            let score = consider(&mut result, &candidate);
            if score < particle.score {
                particle.weights = candidate;
                particle.score = score;
            }
        }

        let after = best_score(&result);
        if before - after < options.epsilon {
            stale += 1;
            if stale >= options.patience {
                break;
            }
        } else {
            stale = 0;
        }
        step = (step * STEP_DECAY).max(MIN_STEP);
    }

    result
}

fn best_score(result: &BranchResult) -> f64 {
    result.best.as_ref().map_or(f64::INFINITY, |b| b.score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ink::InkType;
    use crate::mixing::KubelkaMunk;

    fn ink(id: &str, l: f64, a: f64, b: f64) -> Ink {
        Ink::full_strength(id, id, InkType::Process, LabColor::new(l, a, b)).unwrap()
    }

    #[test]
    fn test_project() {
        let mut w = vec![-0.5, 1.0, 3.0];
        project(&mut w);
        assert_eq!(w, vec![0.0, 0.25, 0.75]);
        let mut w = vec![-1.0, -1.0];
        project(&mut w);
        assert_eq!(w, vec![0.5, 0.5]);
    }

    #[test]
    fn test_random_simplex_sums_to_one() {
        let mut rng = StdRng::seed_from_u64(7);
        for n in 2..6 {
            let w = random_simplex(&mut rng, n);
            assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
            assert!(w.iter().all(|&x| x >= 0.0));
        }
    }

    #[test]
    fn test_finds_known_mix() {
        let model = KubelkaMunk::default();
        let black = ink("black", 16.0, 0.0, 0.0);
        let white = ink("white", 95.0, 0.0, -2.0);
        let tier = ConcentrationTier::FULL;
        let pb = model.pigment(&black, tier);
        let pw = model.pigment(&white, tier);
        let target = model.mix(&[(&pb, 0.2), (&pw, 0.8)]).unwrap().lab;

        let constraints = OptimizationConstraints::default();
        let objective = Objective {
            target,
            method: DeltaEMethod::Ciede2000,
            weights: None,
            model: &model,
            constraints: &constraints,
        };
        let members = [
            Member { ink: &black, tier, pigment: &pb },
            Member { ink: &white, tier, pigment: &pw },
        ];
        let result = search_branch(&objective, &members, &SearchOptions::default(), &CancelToken::new());
        let best = result.best.unwrap();
        assert!(best.delta_e < 0.1, "delta e {}", best.delta_e);
        assert!((best.weights[0] - 0.2).abs() < 0.02);
        assert!(!result.interrupted);
    }

    #[test]
    fn test_cancelled_branch_keeps_initial_best() {
        let model = KubelkaMunk::default();
        let black = ink("black", 16.0, 0.0, 0.0);
        let white = ink("white", 95.0, 0.0, -2.0);
        let tier = ConcentrationTier::FULL;
        let pb = model.pigment(&black, tier);
        let pw = model.pigment(&white, tier);
        let constraints = OptimizationConstraints::default();
        let objective = Objective {
            target: LabColor::new(50.0, 0.0, 0.0),
            method: DeltaEMethod::Ciede2000,
            weights: None,
            model: &model,
            constraints: &constraints,
        };
        let members = [
            Member { ink: &black, tier, pigment: &pb },
            Member { ink: &white, tier, pigment: &pw },
        ];
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = search_branch(&objective, &members, &SearchOptions::default(), &cancel);
        assert!(result.interrupted);
        assert!(result.best.is_some());
        assert_eq!(result.evaluations, SearchOptions::default().population);
    }

    #[test]
    fn test_rejections_are_counted() {
        let model = KubelkaMunk::default();
        let black = ink("black", 16.0, 0.0, 0.0);
        let tier = ConcentrationTier::FULL;
        let pb = model.pigment(&black, tier);
        let constraints = OptimizationConstraints {
            tac_limit: Some(50.0),
            ..Default::default()
        };
        let objective = Objective {
            target: LabColor::new(20.0, 0.0, 0.0),
            method: DeltaEMethod::Ciede2000,
            weights: None,
            model: &model,
            constraints: &constraints,
        };
        let members = [Member { ink: &black, tier, pigment: &pb }];
        assert_eq!(objective.evaluate(&members, &[1.0]).unwrap_err(), Rejection::Tac);

        let result = search_branch(&objective, &members, &SearchOptions::default(), &CancelToken::new());
        assert!(result.best.is_none());
        assert_eq!(result.tac_rejections, 1);
        assert!(result.error.is_none());
    }

    #[test]
    fn test_seed_depends_only_on_branch() {
        let model = KubelkaMunk::default();
        let a = ink("a", 50.0, 0.0, 0.0);
        let b = ink("b", 60.0, 0.0, 0.0);
        let tier = ConcentrationTier::FULL;
        let p = model.pigment(&a, tier);
        let one = [Member { ink: &a, tier, pigment: &p }];
        let two = [Member { ink: &b, tier, pigment: &p }];
        assert_eq!(branch_seed(42, &one), branch_seed(42, &one));
        assert_ne!(branch_seed(42, &one), branch_seed(42, &two));
    }
}
