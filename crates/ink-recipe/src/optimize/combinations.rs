//! Candidate selection and branch enumeration.
//!
//! A branch is one ink subset with one tier per ink. Branches are
//! independent of each other, which is what lets the search fan them out.

use crate::color::LabColor;
use crate::ink::{ColorRegion, ConcentrationTier, Ink, RegionTable};

use super::constraints::OptimizationConstraints;
use super::NoResultReason;

/// Non-white candidates kept when the full pool would exceed the branch
/// limit.
pub const MAX_CANDIDATES: usize = 10;

const NEUTRAL_CHROMA: f64 = 8.0;
const HUE_WEIGHT: f64 = 0.6;
const LIGHTNESS_WEIGHT: f64 = 0.25;
const PREFERRED_BONUS: f64 = 0.15;

/// One ink subset with a tier per member. Indices point into the ink
/// slice the enumeration ran over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Branch {
    pub members: Vec<(usize, ConcentrationTier)>,
}

impl Branch {
    pub fn min_tier(&self) -> Option<ConcentrationTier> {
        self.members.iter().map(|&(_, t)| t).min()
    }
}

#[derive(Debug, Default)]
pub(crate) struct Enumeration {
    pub branches: Vec<Branch>,
    /// Inks that survived filtering and truncation, white included.
    pub candidates: usize,
    pub truncated: bool,
    pub skipped_tac: usize,
    pub capped: bool,
}

/// How useful an ink is likely to be for reaching `target`, roughly 0..=1.
pub fn relevance(ink: &Ink, target: LabColor, regions: &RegionTable) -> f64 {
    let lab = ink.full();
    let hue = if target.chroma() < NEUTRAL_CHROMA {
        1.0 - (lab.chroma() / 100.0).min(1.0)
    } else if lab.chroma() < NEUTRAL_CHROMA {
        0.5
    } else {
        let diff = (lab.hue() - target.hue()).abs();
        1.0 - diff.min(360.0 - diff) / 180.0
    };
    let lightness = 1.0 - (lab.l - target.l).abs() / 100.0;
    let preferred = if regions.is_preferred(target, ink.id()) {
        PREFERRED_BONUS
    } else {
        0.0
    };
    HUE_WEIGHT * hue + LIGHTNESS_WEIGHT * lightness + preferred
}

/// The whitest ink among whites.
fn best_white(inks: &[Ink]) -> Option<usize> {
    inks.iter()
        .enumerate()
        .filter(|(_, ink)| ink.is_white())
        .max_by(|(_, a), (_, b)| {
            let score = |i: &Ink| i.full().l - i.full().chroma();
            score(a).total_cmp(&score(b))
        })
        .map(|(i, _)| i)
}

/// Branches `n` inks yield with up to `k` members and `tiers` tiers each.
fn branch_estimate(n: usize, k: usize, tiers: usize) -> f64 {
    let mut total = 0.0;
    let mut choose = 1.0;
    for j in 1..=k.min(n) {
        choose = choose * (n - j + 1) as f64 / j as f64;
        total += choose * (tiers as f64).powi(j as i32);
    }
    total
}

/// Cut a relevance-ranked pool down to [`MAX_CANDIDATES`]. The darkest and
/// lightest inks and the most relevant ink of every hue region always
/// stay, so a larger catalog never loses the inks a smaller one had for
/// lightness or hue.
fn reduce_pool(ranked: &[(usize, f64)], inks: &[Ink]) -> Vec<usize> {
    let lightness = |&(i, _): &(usize, f64)| inks[i].full().l;
    let mut keep = vec![false; ranked.len()];
    if let Some((pos, _)) = ranked
        .iter()
        .enumerate()
        .min_by(|x, y| lightness(x.1).total_cmp(&lightness(y.1)))
    {
        keep[pos] = true;
    }
    if let Some((pos, _)) = ranked
        .iter()
        .enumerate()
        .max_by(|x, y| lightness(x.1).total_cmp(&lightness(y.1)))
    {
        keep[pos] = true;
    }
    let mut seen: Vec<ColorRegion> = Vec::new();
    for (pos, &(i, _)) in ranked.iter().enumerate() {
        let region = ColorRegion::of(inks[i].full());
        if !seen.contains(&region) {
            seen.push(region);
            keep[pos] = true;
        }
    }
    let mut kept = keep.iter().filter(|&&k| k).count();
    for k in keep.iter_mut() {
        if kept >= MAX_CANDIDATES {
            break;
        }
        if !*k {
            *k = true;
            kept += 1;
        }
    }
    ranked
        .iter()
        .zip(keep)
        .filter(|(_, k)| *k)
        .map(|(&(i, _), _)| i)
        .collect()
}

/// All k-subsets of `0..n` in lexicographic order.
fn subsets(n: usize, k: usize) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    if k == 0 || k > n {
        return out;
    }
    let mut idx: Vec<usize> = (0..k).collect();
    loop {
        out.push(idx.clone());
        let mut i = k;
        while i > 0 && idx[i - 1] == n - k + i - 1 {
            i -= 1;
        }
        if i == 0 {
            return out;
        }
        idx[i - 1] += 1;
        for j in i..k {
            idx[j] = idx[j - 1] + 1;
        }
    }
}

pub(crate) fn enumerate(
    inks: &[Ink],
    target: LabColor,
    constraints: &OptimizationConstraints,
    regions: &RegionTable,
    max_branches: usize,
) -> Result<Enumeration, NoResultReason> {
    if inks.is_empty() {
        return Err(NoResultReason::EmptyCatalog);
    }
    let tiers: Vec<ConcentrationTier> = constraints.allowed_tiers.iter().copied().collect();
    if tiers.is_empty() {
        return Err(NoResultReason::NoAllowedTiers);
    }

    let white = if constraints.include_white {
        best_white(inks)
    } else {
        None
    };

    let mut ranked: Vec<(usize, f64)> = inks
        .iter()
        .enumerate()
        .filter(|(_, ink)| !ink.is_white())
        .map(|(i, ink)| (i, relevance(ink, target, regions)))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| inks[a.0].id().cmp(inks[b.0].id())));
    let truncated = ranked.len() > MAX_CANDIDATES
        && branch_estimate(ranked.len(), constraints.max_ink_count, tiers.len())
            > max_branches as f64;
    let pool: Vec<usize> = if truncated {
        let pool = reduce_pool(&ranked, inks);
        tracing::debug!(
            dropped = ranked.len() - pool.len(),
            "Reducing candidate pool to the most relevant inks"
        );
        pool
    } else {
        ranked.into_iter().map(|(i, _)| i).collect()
    };
    // Subsets larger than the pool do not exist
    let max_k = constraints
        .max_ink_count
        .min(pool.len() + usize::from(white.is_some()));

    let mut subsets_of_inks: Vec<Vec<usize>> = Vec::new();
    match white {
        Some(w) => {
            subsets_of_inks.push(vec![w]);
            for k in 1..max_k {
                for s in subsets(pool.len(), k) {
                    let mut members: Vec<usize> = s.into_iter().map(|i| pool[i]).collect();
                    members.push(w);
                    subsets_of_inks.push(members);
                }
            }
        }
        None => {
            for k in 1..=max_k {
                for s in subsets(pool.len(), k) {
                    subsets_of_inks.push(s.into_iter().map(|i| pool[i]).collect());
                }
            }
        }
    }
    if subsets_of_inks.is_empty() {
        return Err(NoResultReason::NoCombination);
    }

    let mut out = Enumeration {
        candidates: pool.len() + usize::from(white.is_some()),
        truncated,
        ..Default::default()
    };

    'outer: for members in &subsets_of_inks {
        let mut choice = vec![0usize; members.len()];
        loop {
            let branch = Branch {
                members: members
                    .iter()
                    .zip(&choice)
                    .map(|(&ink, &t)| (ink, tiers[t]))
                    .collect(),
            };
            // Cheapest coverage puts everything on the weakest tier
            let feasible = branch
                .min_tier()
                .is_some_and(|t| constraints.within_tac(t.percent() as f64));
            if feasible {
                if out.branches.len() >= max_branches {
                    out.capped = true;
                    break 'outer;
                }
                out.branches.push(branch);
            } else {
                out.skipped_tac += 1;
            }

            // Advance the tier odometer
            let mut pos = 0;
            loop {
                if pos == choice.len() {
                    continue 'outer;
                }
                choice[pos] += 1;
                if choice[pos] < tiers.len() {
                    break;
                }
                choice[pos] = 0;
                pos += 1;
            }
        }
    }

    if out.capped {
        tracing::warn!(max_branches, "Branch limit reached, search space truncated");
    }
    if out.branches.is_empty() {
        return Err(if out.skipped_tac > 0 {
            NoResultReason::TacImpossible
        } else {
            NoResultReason::NoCombination
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ink::{ColorRegion, InkType};
    use std::collections::BTreeSet;

    fn ink(id: &str, l: f64, a: f64, b: f64) -> Ink {
        Ink::full_strength(id, id, InkType::Process, LabColor::new(l, a, b)).unwrap()
    }

    fn cmykw() -> Vec<Ink> {
        vec![
            ink("cyan", 55.0, -37.0, -50.0),
            ink("magenta", 48.0, 74.0, -3.0),
            ink("yellow", 89.0, -5.0, 93.0),
            ink("black", 16.0, 0.0, 0.0),
            ink("white", 95.0, 0.0, -2.0),
        ]
    }

    fn tier(p: u32) -> ConcentrationTier {
        ConcentrationTier::new(p).unwrap()
    }

    #[test]
    fn test_subsets() {
        assert_eq!(subsets(4, 2).len(), 6);
        assert_eq!(subsets(3, 3), vec![vec![0, 1, 2]]);
        assert!(subsets(2, 3).is_empty());
    }

    #[test]
    fn test_excludes_white_by_default() {
        let inks = cmykw();
        let c = OptimizationConstraints::default();
        let e = enumerate(&inks, LabColor::new(50.0, 60.0, 40.0), &c, &RegionTable::new(), 4000)
            .unwrap();
        // 4 + 6 + 4 + 1 subsets of the four non-white inks
        assert_eq!(e.branches.len(), 15);
        assert!(e.branches.iter().all(|b| b.members.iter().all(|&(i, _)| i != 4)));
    }

    #[test]
    fn test_white_forced_into_every_branch() {
        let inks = cmykw();
        let c = OptimizationConstraints {
            max_ink_count: 2,
            include_white: true,
            ..Default::default()
        };
        let e = enumerate(&inks, LabColor::new(70.0, 20.0, 10.0), &c, &RegionTable::new(), 4000)
            .unwrap();
        // white alone plus white with each of four inks
        assert_eq!(e.branches.len(), 5);
        assert!(e.branches.iter().all(|b| b.members.iter().any(|&(i, _)| i == 4)));
    }

    #[test]
    fn test_tier_assignments_multiply() {
        let inks = cmykw();
        let c = OptimizationConstraints {
            max_ink_count: 2,
            allowed_tiers: BTreeSet::from([tier(50), tier(100)]),
            ..Default::default()
        };
        let e = enumerate(&inks, LabColor::new(50.0, 0.0, 0.0), &c, &RegionTable::new(), 4000)
            .unwrap();
        assert_eq!(e.branches.len(), 4 * 2 + 6 * 4);
    }

    #[test]
    fn test_tac_skips_branches() {
        let inks = cmykw();
        let c = OptimizationConstraints {
            max_ink_count: 1,
            allowed_tiers: BTreeSet::from([tier(50), tier(100)]),
            tac_limit: Some(60.0),
            ..Default::default()
        };
        let e = enumerate(&inks, LabColor::new(50.0, 0.0, 0.0), &c, &RegionTable::new(), 4000)
            .unwrap();
        assert_eq!(e.branches.len(), 4);
        assert_eq!(e.skipped_tac, 4);

        let c = OptimizationConstraints {
            tac_limit: Some(10.0),
            ..c
        };
        assert_eq!(
            enumerate(&inks, LabColor::new(50.0, 0.0, 0.0), &c, &RegionTable::new(), 4000)
                .unwrap_err(),
            NoResultReason::TacImpossible
        );
    }

    #[test]
    fn test_failure_reasons() {
        let c = OptimizationConstraints::default();
        let target = LabColor::new(50.0, 0.0, 0.0);
        let regions = RegionTable::new();
        assert_eq!(
            enumerate(&[], target, &c, &regions, 10).unwrap_err(),
            NoResultReason::EmptyCatalog
        );
        let no_tiers = OptimizationConstraints {
            allowed_tiers: BTreeSet::new(),
            ..Default::default()
        };
        assert_eq!(
            enumerate(&cmykw(), target, &no_tiers, &regions, 10).unwrap_err(),
            NoResultReason::NoAllowedTiers
        );
        let only_white = vec![ink("white", 95.0, 0.0, -2.0)];
        assert_eq!(
            enumerate(&only_white, target, &c, &regions, 10).unwrap_err(),
            NoResultReason::NoCombination
        );
    }

    #[test]
    fn test_truncates_to_most_relevant() {
        let mut inks = Vec::new();
        for i in 0..14 {
            let hue = (i as f64) * 25.0_f64.to_radians();
            inks.push(ink(&format!("ink{i}"), 50.0, 50.0 * hue.cos(), 50.0 * hue.sin()));
        }
        let c = OptimizationConstraints {
            max_ink_count: 1,
            ..Default::default()
        };
        let e = enumerate(&inks, LabColor::new(50.0, 50.0, 0.0), &c, &RegionTable::new(), 8)
            .unwrap();
        assert!(e.truncated);
        assert_eq!(e.candidates, MAX_CANDIDATES);
        // The ink sitting on the target hue survives
        assert!(e.branches.iter().any(|b| b.members[0].0 == 0));
    }

    #[test]
    fn test_small_catalogs_are_not_reduced() {
        let mut inks = Vec::new();
        for i in 0..14 {
            inks.push(ink(&format!("red{i}"), 45.0 + i as f64, 60.0, 30.0));
        }
        inks.push(ink("black", 16.0, 0.0, 0.0));
        let c = OptimizationConstraints {
            max_ink_count: 2,
            ..Default::default()
        };
        let e = enumerate(&inks, LabColor::new(25.0, 30.0, 15.0), &c, &RegionTable::new(), 4000)
            .unwrap();
        assert!(!e.truncated);
        assert_eq!(e.candidates, 15);
        assert!(e.branches.iter().any(|b| b.members.iter().any(|&(i, _)| i == 14)));
    }

    #[test]
    fn test_reduced_pool_keeps_lightness_extremes() {
        let mut inks = Vec::new();
        for i in 0..20 {
            inks.push(ink(&format!("red{i}"), 40.0 + i as f64, 60.0, 30.0));
        }
        inks.push(ink("black", 16.0, 0.0, 0.0));
        let c = OptimizationConstraints {
            max_ink_count: 3,
            ..Default::default()
        };
        let e = enumerate(&inks, LabColor::new(45.0, 60.0, 30.0), &c, &RegionTable::new(), 100)
            .unwrap();
        assert!(e.truncated);
        assert_eq!(e.candidates, MAX_CANDIDATES);
        let used = |id: usize| e.branches.iter().any(|b| b.members.iter().any(|&(i, _)| i == id));
        assert!(used(20), "black dropped");
        assert!(used(19), "lightest red dropped");
    }

    #[test]
    fn test_huge_ink_count_is_bounded_by_catalog() {
        let inks = cmykw();
        let c = OptimizationConstraints {
            max_ink_count: usize::MAX,
            ..Default::default()
        };
        let e = enumerate(&inks, LabColor::new(50.0, 0.0, 0.0), &c, &RegionTable::new(), 4000)
            .unwrap();
        assert_eq!(e.branches.len(), 15);

        let c = OptimizationConstraints {
            include_white: true,
            ..c
        };
        let e = enumerate(&inks, LabColor::new(50.0, 0.0, 0.0), &c, &RegionTable::new(), 4000)
            .unwrap();
        // white alone plus white with every non-empty subset of the rest
        assert_eq!(e.branches.len(), 16);
    }

    #[test]
    fn test_preferred_ink_ranks_higher() {
        let inks = cmykw();
        let target = LabColor::new(50.0, 60.0, 5.0);
        let mut regions = RegionTable::new();
        let before = relevance(&inks[2], target, &regions);
        regions.set(ColorRegion::Red, vec!["yellow".into()]);
        assert!(relevance(&inks[2], target, &regions) > before);
    }

    #[test]
    fn test_branch_cap() {
        let inks = cmykw();
        let c = OptimizationConstraints::default();
        let e = enumerate(&inks, LabColor::new(50.0, 0.0, 0.0), &c, &RegionTable::new(), 7)
            .unwrap();
        assert_eq!(e.branches.len(), 7);
        assert!(e.capped);
    }
}
