//! LRU result cache with time-to-live.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::color::{DeltaEMethod, LabColor};
use crate::mixing::MixingModelKind;

use super::constraints::{OptimizationConstraints, SearchOptions};
use super::OptimizationOutcome;

pub const DEFAULT_CAPACITY: usize = 256;
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

/// Identity of a search request. Floats are compared bitwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    target: [u64; 3],
    ink_ids: Vec<String>,
    max_ink_count: usize,
    tiers: Vec<u32>,
    include_white: bool,
    cost_weight: u64,
    tac_limit: Option<u64>,
    model: MixingModelKind,
    method: DeltaEMethod,
    search: [u64; 7],
}

impl CacheKey {
    pub fn new(
        target: LabColor,
        ink_ids: impl IntoIterator<Item = impl Into<String>>,
        constraints: &OptimizationConstraints,
        model: MixingModelKind,
        method: DeltaEMethod,
        options: &SearchOptions,
    ) -> Self {
        let mut ink_ids: Vec<String> = ink_ids.into_iter().map(Into::into).collect();
        ink_ids.sort();
        Self {
            target: target.to_array().map(f64::to_bits),
            ink_ids,
            max_ink_count: constraints.max_ink_count,
            tiers: constraints.allowed_tiers.iter().map(|t| t.percent()).collect(),
            include_white: constraints.include_white,
            cost_weight: constraints.cost_weight.to_bits(),
            tac_limit: constraints.tac_limit.map(f64::to_bits),
            model,
            method,
            search: [
                options.iterations as u64,
                options.population as u64,
                options.patience as u64,
                options.epsilon.to_bits(),
                options.seed,
                options.max_results as u64,
                options.max_branches as u64,
            ],
        }
    }
}

struct Entry {
    stored: Instant,
    outcome: OptimizationOutcome,
}

/// Bounded cache of search outcomes, owned by the engine.
pub struct RecipeCache {
    capacity: usize,
    ttl: Duration,
    /// `None` when the capacity is zero and nothing is stored.
    entries: Option<Mutex<LruCache<CacheKey, Entry>>>,
}

impl RecipeCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity,
            ttl,
            entries: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    fn lock(&self) -> Option<MutexGuard<'_, LruCache<CacheKey, Entry>>> {
        // A panic while holding the lock leaves only cached data behind
        self.entries
            .as_ref()
            .map(|m| m.lock().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn get(&self, key: &CacheKey) -> Option<OptimizationOutcome> {
        let mut entries = self.lock()?;
        let expired = entries.peek(key)?.stored.elapsed() > self.ttl;
        if expired {
            entries.pop(key);
            return None;
        }
        entries.get(key).map(|e| e.outcome.clone())
    }

    /// Store an outcome. Cancelled outcomes are partial and never stored.
    pub fn insert(&self, key: CacheKey, outcome: OptimizationOutcome) {
        if outcome.cancelled {
            return;
        }
        if let Some(mut entries) = self.lock() {
            entries.put(
                key,
                Entry {
                    stored: Instant::now(),
                    outcome,
                },
            );
        }
    }

    pub fn len(&self) -> usize {
        self.lock().map_or(0, |entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Some(mut entries) = self.lock() {
            entries.clear();
        }
    }
}

impl Default for RecipeCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}

impl std::fmt::Debug for RecipeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecipeCache")
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .field("len", &self.len())
            .finish()
    }
}
