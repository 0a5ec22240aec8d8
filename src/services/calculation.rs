use crate::error::ApiError;
use ink_recipe::correction::CorrectionSettings;
use ink_recipe::{
    CancelToken, CorrectionAnalysis, CorrectionSuggestion, Illuminant, InkRatio, LabColor,
    MetamerismReport, OptimizationConstraints, OptimizationOutcome, RecipeEngine, SpectralCurve,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Runs engine calculations off the async runtime.
///
/// Searches are CPU bound, so every call moves to the blocking pool. Each
/// call gets its own cancel token which fires when the request future is
/// dropped, so a disconnected client stops its search early.
#[derive(Clone)]
pub struct CalculationService {
    engine: Arc<RecipeEngine>,
    timeout: Option<Duration>,
}

/// Cancels the token when dropped unless disarmed.
struct CancelOnDrop(Option<CancelToken>);

impl CancelOnDrop {
    fn disarm(mut self) {
        self.0 = None;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(token) = self.0.take() {
            token.cancel();
        }
    }
}

impl CalculationService {
    pub fn new(engine: Arc<RecipeEngine>, timeout: Option<Duration>) -> Self {
        Self { engine, timeout }
    }

    pub fn engine(&self) -> &RecipeEngine {
        &self.engine
    }

    async fn run_blocking<T, F>(&self, op: &'static str, f: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&RecipeEngine, &CancelToken) -> Result<T, ApiError> + Send + 'static,
    {
        let engine = self.engine.clone();
        let token = CancelToken::new();
        let guard = CancelOnDrop(Some(token.clone()));
        let start = Instant::now();

        let result = tokio::task::spawn_blocking(move || f(&engine, &token)).await;
        guard.disarm();

        tracing::debug!(
            op,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Calculation finished"
        );
        result?
    }

    /// Search over the given inks.
    pub async fn calculate(
        &self,
        target: LabColor,
        ink_ids: Vec<String>,
        constraints: OptimizationConstraints,
    ) -> Result<OptimizationOutcome, ApiError> {
        let timeout = self.timeout;
        let outcome = self
            .run_blocking("calculate", move |engine, cancel| {
                Ok(engine.calculate_recipe_with(target, &ink_ids, &constraints, cancel, timeout)?)
            })
            .await?;
        log_outcome(&outcome);
        Ok(outcome)
    }

    /// Search over the whole catalog.
    pub async fn optimize(
        &self,
        target: LabColor,
        constraints: OptimizationConstraints,
    ) -> Result<OptimizationOutcome, ApiError> {
        let timeout = self.timeout;
        let outcome = self
            .run_blocking("optimize", move |engine, cancel| {
                Ok(engine.calculate_optimized_recipes_with(target, &constraints, cancel, timeout)?)
            })
            .await?;
        log_outcome(&outcome);
        Ok(outcome)
    }

    /// Analyze a measured batch. `settings` overrides the configured
    /// correction limits for this call.
    pub async fn analyze_correction(
        &self,
        target: LabColor,
        actual: LabColor,
        recipe: Vec<InkRatio>,
        ink_ids: Vec<String>,
        settings: Option<CorrectionSettings>,
    ) -> Result<CorrectionAnalysis, ApiError> {
        let analysis = self
            .run_blocking("correction", move |engine, _| {
                let settings = settings.unwrap_or_else(|| engine.settings().clone());
                Ok(engine.analyze_correction_with(target, actual, &recipe, &ink_ids, &settings)?)
            })
            .await?;
        tracing::info!(
            delta_e = analysis.delta_e,
            feasible = analysis.feasibility.is_feasible(),
            suggestions = analysis.suggestions.len(),
            "Correction analyzed"
        );
        Ok(analysis)
    }

    pub fn predict_corrected_color(
        &self,
        actual: LabColor,
        suggestions: &[CorrectionSuggestion],
    ) -> LabColor {
        self.engine.predict_corrected_color(actual, suggestions)
    }

    pub async fn metamerism(
        &self,
        a: SpectralCurve,
        b: SpectralCurve,
        illuminants: Vec<Illuminant>,
    ) -> Result<MetamerismReport, ApiError> {
        self.run_blocking("metamerism", move |engine, _| {
            Ok(engine.metamerism(&a, &b, &illuminants)?)
        })
        .await
    }
}

fn log_outcome(outcome: &OptimizationOutcome) {
    match outcome.best() {
        Some(best) => tracing::info!(
            recipes = outcome.recipes.len(),
            best_delta_e = best.delta_e(),
            cancelled = outcome.cancelled,
            cache_hit = outcome.stats.cache_hit,
            "Recipe search completed"
        ),
        None => tracing::info!(
            reason = outcome.reason.map(|r| r.code()).unwrap_or("NONE"),
            cancelled = outcome.cancelled,
            "Recipe search found nothing"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ink_recipe::{ConcentrationTier, Ink, InkSet, InkType};

    fn service() -> CalculationService {
        let ink = |id: &str, lab: LabColor| {
            Ink::full_strength(id, id, InkType::Process, lab).unwrap()
        };
        let catalog = InkSet::new(vec![
            ink("cyan", LabColor::new(55.0, -37.0, -50.0)),
            ink("magenta", LabColor::new(48.0, 74.0, -3.0)),
            ink("yellow", LabColor::new(89.0, -5.0, 93.0)),
            ink("black", LabColor::new(16.0, 0.0, 0.0)),
        ])
        .unwrap();
        CalculationService::new(
            Arc::new(RecipeEngine::new(catalog)),
            Some(Duration::from_secs(30)),
        )
    }

    #[tokio::test]
    async fn test_calculate_runs_search() {
        let outcome = service()
            .calculate(
                LabColor::new(50.0, 60.0, 40.0),
                vec!["magenta".into(), "yellow".into(), "black".into()],
                OptimizationConstraints::default(),
            )
            .await
            .unwrap();

        assert!(!outcome.recipes.is_empty());
        assert!(!outcome.cancelled);
    }

    #[tokio::test]
    async fn test_unknown_ink_is_not_found() {
        let err = service()
            .calculate(
                LabColor::new(50.0, 0.0, 0.0),
                vec!["teal".into()],
                OptimizationConstraints::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::UnknownInk(_)));
    }

    #[tokio::test]
    async fn test_correction_settings_override() {
        let strict = CorrectionSettings {
            max_correctable_delta_e: 1.0,
            ..Default::default()
        };
        let analysis = service()
            .analyze_correction(
                LabColor::new(50.0, 0.0, 0.0),
                LabColor::new(55.0, 3.0, -2.0),
                vec![
                    InkRatio::new("black", 60.0, ConcentrationTier::FULL),
                    InkRatio::new("cyan", 40.0, ConcentrationTier::FULL),
                ],
                Vec::new(),
                Some(strict),
            )
            .await
            .unwrap();

        assert!(!analysis.feasibility.is_feasible());
        assert!(analysis.amended.is_none());
    }

    #[test]
    fn test_cancel_on_drop() {
        let token = CancelToken::new();
        drop(CancelOnDrop(Some(token.clone())));
        assert!(token.is_cancelled());

        let token = CancelToken::new();
        CancelOnDrop(Some(token.clone())).disarm();
        assert!(!token.is_cancelled());
    }
}
