use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
};
use ink_recipe::correction::CorrectionSettings;
use ink_recipe::{CorrectionAnalysis, CorrectionSuggestion, InkRatio, LabColor};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::services::CalculationService;

/// Recipe the measured batch was mixed from
#[derive(Debug, Deserialize, ToSchema)]
pub struct BatchRecipe {
    /// `[{inkId, ratio, concentration}]`
    #[schema(value_type = Vec<Object>)]
    pub inks: Vec<InkRatio>,
}

/// Per-request correction limits; unset fields keep the configured values
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionLimits {
    pub axis_threshold: Option<f64>,
    pub max_correctable_delta_e: Option<f64>,
    /// Largest total addition, in parts per 100 parts of batch
    pub max_addition_percent: Option<f64>,
    /// Coverage ceiling for the amended recipe
    pub tac_limit: Option<f64>,
}

impl CorrectionLimits {
    fn apply(self, base: &CorrectionSettings) -> CorrectionSettings {
        CorrectionSettings {
            axis_threshold: self.axis_threshold.unwrap_or(base.axis_threshold),
            max_correctable_delta_e: self
                .max_correctable_delta_e
                .unwrap_or(base.max_correctable_delta_e),
            max_addition_percent: self
                .max_addition_percent
                .unwrap_or(base.max_addition_percent),
            tac_limit: self.tac_limit.or(base.tac_limit),
        }
    }
}

/// Body of /api/corrections/analyze
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[schema(value_type = Object)]
    pub target: LabColor,
    /// Measured color of the batch
    #[schema(value_type = Object)]
    pub actual: LabColor,
    pub recipe: BatchRecipe,
    /// Inks that may be added; the whole catalog when absent
    #[serde(default)]
    pub ink_ids: Vec<String>,
    #[serde(default)]
    pub constraints: Option<CorrectionLimits>,
}

/// Body of /api/corrections/predict
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PredictRequest {
    #[schema(value_type = Object)]
    pub actual: LabColor,
    #[schema(value_type = Vec<Object>)]
    pub suggestions: Vec<CorrectionSuggestion>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PredictResponse {
    #[schema(value_type = Object)]
    pub predicted: LabColor,
}

/// Analyze a measured batch against its target
///
/// Returns the Delta E, the per-axis error, a feasibility verdict, ink
/// additions and the amended recipe with its predicted color.
#[utoipa::path(
    post,
    path = "/api/corrections/analyze",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Correction analysis (feasible or not)"),
        (status = 400, description = "Invalid colors or recipe"),
        (status = 404, description = "Unknown ink id"),
    ),
    tag = "Corrections"
)]
pub async fn handle_analyze_correction(
    State(calculation): State<Arc<CalculationService>>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<CorrectionAnalysis>, ApiError> {
    let Json(request) = payload?;
    let settings = request
        .constraints
        .map(|limits| limits.apply(calculation.engine().settings()));

    tracing::info!(
        lab = ?request.target.to_array(),
        actual = ?request.actual.to_array(),
        recipe_inks = request.recipe.inks.len(),
        "Correction analysis requested"
    );

    let analysis = calculation
        .analyze_correction(
            request.target,
            request.actual,
            request.recipe.inks,
            request.ink_ids,
            settings,
        )
        .await?;
    Ok(Json(analysis))
}

/// Predict the color after applying suggested additions
#[utoipa::path(
    post,
    path = "/api/corrections/predict",
    request_body = PredictRequest,
    responses(
        (status = 200, description = "Predicted color", body = PredictResponse),
        (status = 400, description = "Invalid request"),
    ),
    tag = "Corrections"
)]
pub async fn handle_predict_correction(
    State(calculation): State<Arc<CalculationService>>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let Json(request) = payload?;
    let predicted = calculation.predict_corrected_color(request.actual, &request.suggestions);
    Ok(Json(PredictResponse { predicted }))
}
