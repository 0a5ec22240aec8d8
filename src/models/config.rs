use crate::assets::{AssetCategory, AssetLoader};
use ink_recipe::correction::CorrectionSettings;
use ink_recipe::{
    ConcentrationTier, DeltaEMethod, EngineError, Illuminant, InkSet, MixingModelKind,
    OptimizationConstraints, RecipeCache, RecipeEngine, RegionTable, SearchOptions,
};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::time::Duration;

/// Application configuration loaded from config.yaml
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub search: SearchConfig,
    pub cache: CacheConfig,
    pub correction: CorrectionSettings,
    /// Constraints used when a request sends none
    pub defaults: DefaultsConfig,
    /// Preferred ink ids per color region
    pub regions: RegionTable,
}

/// Mixing model, illuminant and Delta E formula
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub model: MixingModelKind,
    #[serde(default = "default_illuminant")]
    pub illuminant: Illuminant,
    pub method: DeltaEMethod,
}

fn default_illuminant() -> Illuminant {
    Illuminant::D50
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: MixingModelKind::default(),
            illuminant: default_illuminant(),
            method: DeltaEMethod::default(),
        }
    }
}

/// Ratio search tuning
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    pub iterations: usize,
    pub population: usize,
    pub patience: usize,
    pub seed: u64,
    pub max_results: usize,
    pub max_branches: usize,
    /// Per-request wall-clock limit in milliseconds (0 disables it)
    pub timeout_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let options = SearchOptions::default();
        Self {
            iterations: options.iterations,
            population: options.population,
            patience: options.patience,
            seed: options.seed,
            max_results: options.max_results,
            max_branches: options.max_branches,
            timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub capacity: usize,
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: ink_recipe::optimize::DEFAULT_CAPACITY,
            ttl_secs: ink_recipe::optimize::DEFAULT_TTL.as_secs(),
        }
    }
}

/// Default optimization constraints, snake_case like the rest of the file
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DefaultsConfig {
    pub max_ink_count: usize,
    pub allowed_tiers: BTreeSet<ConcentrationTier>,
    pub include_white: bool,
    pub cost_weight: f64,
    pub tac_limit: Option<f64>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        let c = OptimizationConstraints::default();
        Self {
            max_ink_count: c.max_ink_count,
            allowed_tiers: c.allowed_tiers,
            include_white: c.include_white,
            cost_weight: c.cost_weight,
            tac_limit: c.tac_limit,
        }
    }
}

impl AppConfig {
    /// Load configuration from AssetLoader (embedded or external)
    pub fn load_from_assets(loader: &AssetLoader) -> Self {
        match loader.read_string(AssetCategory::Config) {
            Ok(content) => Self::parse(&content),
            Err(e) => {
                tracing::warn!(%e, "Failed to read config, using defaults");
                Self::default()
            }
        }
    }

    /// Parse YAML, falling back to defaults when it is malformed
    pub fn parse(content: &str) -> Self {
        match serde_yaml::from_str::<Self>(content) {
            Ok(config) => {
                tracing::info!(
                    model = %config.engine.model,
                    illuminant = %config.engine.illuminant,
                    method = %config.engine.method,
                    "Loaded configuration"
                );
                config
            }
            Err(e) => {
                tracing::warn!(%e, "Failed to parse config, using defaults");
                Self::default()
            }
        }
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            iterations: self.search.iterations,
            population: self.search.population,
            patience: self.search.patience,
            seed: self.search.seed,
            max_results: self.search.max_results,
            max_branches: self.search.max_branches,
            ..Default::default()
        }
    }

    /// Request deadline, `None` when disabled
    pub fn timeout(&self) -> Option<Duration> {
        (self.search.timeout_ms > 0).then(|| Duration::from_millis(self.search.timeout_ms))
    }

    pub fn default_constraints(&self) -> OptimizationConstraints {
        OptimizationConstraints {
            max_ink_count: self.defaults.max_ink_count,
            allowed_tiers: self.defaults.allowed_tiers.clone(),
            include_white: self.defaults.include_white,
            cost_weight: self.defaults.cost_weight,
            tac_limit: self.defaults.tac_limit,
        }
    }

    /// Build the engine for `catalog` with this configuration.
    pub fn build_engine(&self, catalog: InkSet) -> Result<RecipeEngine, EngineError> {
        let engine = RecipeEngine::new(catalog)
            .model(self.engine.model, self.engine.illuminant)?
            .method(self.engine.method)
            .regions(self.regions.clone())
            .search_options(self.search_options())
            .correction_settings(self.correction.clone())
            .cache(RecipeCache::new(
                self.cache.capacity,
                Duration::from_secs(self.cache.ttl_secs),
            ));
        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ink_recipe::ink::ColorRegion;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.engine.model, MixingModelKind::Basic);
        assert_eq!(config.engine.illuminant, Illuminant::D50);
        assert_eq!(config.engine.method, DeltaEMethod::Ciede2000);
        assert_eq!(config.search_options(), SearchOptions::default());
        assert_eq!(config.default_constraints(), OptimizationConstraints::default());
        assert_eq!(config.timeout(), Some(Duration::from_secs(10)));
        assert!(config.regions.is_empty());
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
engine:
  model: spectral
  illuminant: D65
  method: cmc
search:
  iterations: 50
  timeout_ms: 0
correction:
  max_addition_percent: 25.0
defaults:
  max_ink_count: 3
  allowed_tiers: [50, 100]
  tac_limit: 240
regions:
  red: [warm-red, magenta]
"#;

        let config = AppConfig::parse(yaml);

        assert_eq!(config.engine.model, MixingModelKind::Spectral);
        assert_eq!(config.engine.illuminant, Illuminant::D65);
        assert_eq!(config.engine.method, DeltaEMethod::Cmc);
        assert_eq!(config.search.iterations, 50);
        // Unset keys keep their defaults
        assert_eq!(config.search.population, 12);
        assert_eq!(config.timeout(), None);
        assert_eq!(config.correction.max_addition_percent, 25.0);
        assert_eq!(config.correction.axis_threshold, 1.0);

        let constraints = config.default_constraints();
        assert_eq!(constraints.max_ink_count, 3);
        assert_eq!(constraints.allowed_tiers.len(), 2);
        assert_eq!(constraints.tac_limit, Some(240.0));
        assert_eq!(
            config.regions.preferred(ColorRegion::Red),
            &["warm-red".to_string(), "magenta".to_string()]
        );
    }

    #[test]
    fn test_malformed_config_falls_back() {
        let config = AppConfig::parse("engine: [not, a, map]");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_invalid_tier_rejected() {
        let config = AppConfig::parse("defaults:\n  allowed_tiers: [0]\n");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_embedded_config_parses() {
        let config = AppConfig::load_from_assets(&AssetLoader::default());
        assert!(!config.regions.is_empty());
        assert_eq!(config.search.timeout_ms, 10_000);
    }

    #[test]
    fn test_build_engine() {
        let config = AppConfig::parse("engine:\n  model: fluorescent\n  illuminant: F11\n");
        let engine = config.build_engine(InkSet::default()).unwrap();
        assert_eq!(engine.model_kind(), MixingModelKind::Fluorescent);
        assert_eq!(engine.illuminant(), Illuminant::F11);
    }
}
