//! RecipeEngine: the calculation facade over catalog, mixing model,
//! search and correction.

use std::sync::Arc;
use std::time::Duration;

use crate::color::{DeltaEMethod, DeltaEWeights, Illuminant, LabColor};
use crate::correction::{
    predict_corrected_color, Correction, CorrectionAnalysis, CorrectionSettings,
    CorrectionSuggestion,
};
use crate::ink::{CatalogError, Ink, InkCatalog, InkSet, RegionTable};
use crate::mixing::{MixComponent, MixPrediction, MixingModel, MixingModelKind};
use crate::optimize::{
    CacheKey, CancelToken, OptimizationConstraints, OptimizationOutcome, RecipeCache, Search,
    SearchOptions,
};
use crate::recipe::InkRatio;
use crate::spectral::{
    default_illuminants, metamerism_index, IlluminantSpd, MetamerismReport, SpectralCurve,
};

use super::EngineError;

/// High-level entry point bundling an ink catalog with a mixing model and
/// the settings every operation shares.
///
/// - Constructor takes the catalog and defaults to the basic model under D50
/// - Configuration methods consume and return `self`
/// - Operations take `&self`, so one engine serves many requests; the
///   recipe cache is the only shared mutable state
///
/// ```
/// use ink_recipe::{Ink, InkSet, InkType, LabColor, OptimizationConstraints, RecipeEngine};
///
/// let inks = InkSet::new(vec![
///     Ink::full_strength("black", "Black", InkType::Process, LabColor::new(16.0, 0.0, 0.0)).unwrap(),
///     Ink::full_strength("white", "White", InkType::Process, LabColor::new(95.0, 0.0, -2.0)).unwrap(),
/// ])
/// .unwrap();
///
/// let engine = RecipeEngine::new(inks);
/// let constraints = OptimizationConstraints { include_white: true, ..Default::default() };
/// let outcome = engine
///     .calculate_optimized_recipes(LabColor::new(50.0, 0.0, -1.0), &constraints)
///     .unwrap();
/// assert!(outcome.best().is_some());
/// ```
#[derive(Debug)]
pub struct RecipeEngine {
    catalog: InkSet,
    model: Arc<dyn MixingModel>,
    illuminant: Illuminant,
    method: DeltaEMethod,
    weights: Option<DeltaEWeights>,
    regions: RegionTable,
    options: SearchOptions,
    correction: CorrectionSettings,
    cache: RecipeCache,
}

impl RecipeEngine {
    pub fn new(catalog: InkSet) -> Self {
        let illuminant = Illuminant::D50;
        Self {
            catalog,
            model: Arc::new(crate::mixing::KubelkaMunk::default()),
            illuminant,
            method: DeltaEMethod::default(),
            weights: None,
            regions: RegionTable::new(),
            options: SearchOptions::default(),
            correction: CorrectionSettings::default(),
            cache: RecipeCache::default(),
        }
    }

    /// Select the mixing model and the illuminant it predicts under.
    pub fn model(mut self, kind: MixingModelKind, illuminant: Illuminant) -> Result<Self, EngineError> {
        self.model = kind.build(illuminant)?;
        self.illuminant = illuminant;
        Ok(self)
    }

    #[inline]
    pub fn method(mut self, method: DeltaEMethod) -> Self {
        self.method = method;
        self
    }

    /// Parametric factors for CIE94, CIEDE2000 and CMC.
    #[inline]
    pub fn weights(mut self, weights: DeltaEWeights) -> Self {
        self.weights = Some(weights);
        self
    }

    #[inline]
    pub fn regions(mut self, regions: RegionTable) -> Self {
        self.regions = regions;
        self
    }

    #[inline]
    pub fn search_options(mut self, options: SearchOptions) -> Self {
        self.options = options;
        self
    }

    #[inline]
    pub fn correction_settings(mut self, settings: CorrectionSettings) -> Self {
        self.correction = settings;
        self
    }

    #[inline]
    pub fn cache(mut self, cache: RecipeCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn catalog(&self) -> &InkSet {
        &self.catalog
    }

    pub fn model_kind(&self) -> MixingModelKind {
        self.model.kind()
    }

    pub fn illuminant(&self) -> Illuminant {
        self.illuminant
    }

    pub fn delta_e_method(&self) -> DeltaEMethod {
        self.method
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    pub fn settings(&self) -> &CorrectionSettings {
        &self.correction
    }

    pub fn recipe_cache(&self) -> &RecipeCache {
        &self.cache
    }

    /// Search over the inks named in `ink_ids`.
    pub fn calculate_recipe(
        &self,
        target: LabColor,
        ink_ids: &[String],
        constraints: &OptimizationConstraints,
    ) -> Result<OptimizationOutcome, EngineError> {
        self.calculate_recipe_with(target, ink_ids, constraints, &CancelToken::new(), None)
    }

    /// Like [`calculate_recipe`](Self::calculate_recipe), interruptible by
    /// `cancel` and bounded by `timeout`. An interrupted search returns its
    /// partial outcome flagged `cancelled`.
    pub fn calculate_recipe_with(
        &self,
        target: LabColor,
        ink_ids: &[String],
        constraints: &OptimizationConstraints,
        cancel: &CancelToken,
        timeout: Option<Duration>,
    ) -> Result<OptimizationOutcome, EngineError> {
        let mut ids: Vec<String> = ink_ids.to_vec();
        ids.sort();
        ids.dedup();
        let inks = self.catalog.select(&ids)?;
        self.search(target, inks, constraints, cancel, timeout)
    }

    /// Search over the whole catalog.
    pub fn calculate_optimized_recipes(
        &self,
        target: LabColor,
        constraints: &OptimizationConstraints,
    ) -> Result<OptimizationOutcome, EngineError> {
        self.calculate_optimized_recipes_with(target, constraints, &CancelToken::new(), None)
    }

    pub fn calculate_optimized_recipes_with(
        &self,
        target: LabColor,
        constraints: &OptimizationConstraints,
        cancel: &CancelToken,
        timeout: Option<Duration>,
    ) -> Result<OptimizationOutcome, EngineError> {
        let inks = self.catalog.inks().to_vec();
        self.search(target, inks, constraints, cancel, timeout)
    }

    fn search(
        &self,
        target: LabColor,
        inks: Vec<Ink>,
        constraints: &OptimizationConstraints,
        cancel: &CancelToken,
        timeout: Option<Duration>,
    ) -> Result<OptimizationOutcome, EngineError> {
        target.validate()?;
        constraints.validate()?;

        let key = CacheKey::new(
            target,
            inks.iter().map(|i| i.id().to_string()),
            constraints,
            self.model.kind(),
            self.method,
            &self.options,
        );
        // Weighted Delta E changes scores, so only the default weights hit the cache
        if self.weights.is_none() {
            if let Some(mut hit) = self.cache.get(&key) {
                tracing::debug!(lab = ?target.to_array(), "Recipe cache hit");
                hit.stats.cache_hit = true;
                return Ok(hit);
            }
        }

        let mut options = self.options.clone();
        if let Some(timeout) = timeout {
            options = options.with_timeout(timeout);
        }
        let outcome = Search {
            target,
            inks: &inks,
            constraints,
            options: &options,
            model: self.model.as_ref(),
            method: self.method,
            weights: self.weights,
            regions: &self.regions,
            cancel,
        }
        .run()?;

        if self.weights.is_none() {
            self.cache.insert(key, outcome.clone());
        }
        Ok(outcome)
    }

    /// Analyze a measured sample against its target using the engine's
    /// correction settings. `ink_ids` limits the inks that may be added;
    /// empty means the whole catalog.
    pub fn analyze_correction(
        &self,
        target: LabColor,
        actual: LabColor,
        recipe: &[InkRatio],
        ink_ids: &[String],
    ) -> Result<CorrectionAnalysis, EngineError> {
        self.analyze_correction_with(target, actual, recipe, ink_ids, &self.correction)
    }

    pub fn analyze_correction_with(
        &self,
        target: LabColor,
        actual: LabColor,
        recipe: &[InkRatio],
        ink_ids: &[String],
        settings: &CorrectionSettings,
    ) -> Result<CorrectionAnalysis, EngineError> {
        let mut inks = if ink_ids.is_empty() {
            self.catalog.inks().to_vec()
        } else {
            self.catalog.select(ink_ids)?
        };
        // Recipe inks must be known to re-mix the batch even when they are
        // not offered for additions.
        let mut recipe_only = Vec::new();
        for ratio in recipe {
            if inks.iter().any(|i| i.id() == ratio.ink_id) {
                continue;
            }
            let ink = self
                .catalog
                .get(&ratio.ink_id)
                .ok_or_else(|| CatalogError::UnknownInk(ratio.ink_id.clone()))?;
            recipe_only.push(ink.clone());
        }

        let addable = inks.len();
        inks.extend(recipe_only);
        let analysis = Correction {
            target,
            actual,
            recipe,
            inks: &inks,
            addable: &inks[..addable],
            settings,
            model: self.model.as_ref(),
            method: self.method,
        }
        .analyze()?;
        Ok(analysis)
    }

    /// Linear estimate of the color after applying `suggestions`.
    pub fn predict_corrected_color(
        &self,
        actual: LabColor,
        suggestions: &[CorrectionSuggestion],
    ) -> LabColor {
        predict_corrected_color(actual, suggestions)
    }

    /// Compare two reflectance curves under `illuminants`, or under D65,
    /// D50 and F11 when none are given.
    pub fn metamerism(
        &self,
        a: &SpectralCurve,
        b: &SpectralCurve,
        illuminants: &[Illuminant],
    ) -> Result<MetamerismReport, EngineError> {
        let spds = if illuminants.is_empty() {
            default_illuminants()
        } else {
            illuminants.iter().map(|&i| IlluminantSpd::standard(i)).collect()
        };
        Ok(metamerism_index(a, b, &spds)?)
    }

    /// Predict the color of weighted catalog inks with the engine's model.
    pub fn predict_mix(&self, components: &[InkRatio]) -> Result<MixPrediction, EngineError> {
        let inks = components
            .iter()
            .map(|c| {
                self.catalog
                    .get(&c.ink_id)
                    .ok_or_else(|| CatalogError::UnknownInk(c.ink_id.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let mix: Vec<MixComponent<'_>> = inks
            .iter()
            .zip(components)
            .map(|(ink, c)| MixComponent::new(ink, c.tier, c.ratio))
            .collect();
        Ok(self.model.predict(&mix)?)
    }
}
