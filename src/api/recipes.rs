use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
};
use chrono::Utc;
use ink_recipe::optimize::SearchStats;
use ink_recipe::{LabColor, NoResultReason, OptimizationConstraints, OptimizationOutcome};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::models::{AppConfig, RecipeRecord};
use crate::services::CalculationService;

/// Body of /api/recipes/calculate
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CalculateRequest {
    /// Target color `{"L", "a", "b"}`
    #[schema(value_type = Object)]
    pub target: LabColor,
    /// Inks the search may use
    pub ink_ids: Vec<String>,
    /// Falls back to the configured defaults when absent
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub constraints: Option<OptimizationConstraints>,
}

/// Body of /api/recipes/optimize
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeRequest {
    #[schema(value_type = Object)]
    pub target: LabColor,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub constraints: Option<OptimizationConstraints>,
}

/// Ranked recipes, best first
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecipeListResponse {
    #[schema(value_type = Vec<Object>)]
    pub recipes: Vec<RecipeRecord>,
    /// Why nothing was found: EMPTY_CATALOG, NO_ALLOWED_TIERS, NO_COMBINATION or TAC_IMPOSSIBLE
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub reason: Option<NoResultReason>,
    /// The search hit its deadline; recipes are the best found so far
    pub cancelled: bool,
    #[schema(value_type = Object)]
    pub stats: SearchStats,
}

impl From<OptimizationOutcome> for RecipeListResponse {
    fn from(outcome: OptimizationOutcome) -> Self {
        let now = Utc::now();
        Self {
            recipes: outcome
                .recipes
                .iter()
                .map(|r| RecipeRecord::from(r).draft(now))
                .collect(),
            reason: outcome.reason,
            cancelled: outcome.cancelled,
            stats: outcome.stats,
        }
    }
}

/// Calculate recipes from a chosen set of inks
#[utoipa::path(
    post,
    path = "/api/recipes/calculate",
    request_body = CalculateRequest,
    responses(
        (status = 200, description = "Ranked recipes (possibly empty with a reason)", body = RecipeListResponse),
        (status = 400, description = "Invalid target or constraints"),
        (status = 404, description = "Unknown ink id"),
    ),
    tag = "Recipes"
)]
pub async fn handle_calculate(
    State(calculation): State<Arc<CalculationService>>,
    State(config): State<Arc<AppConfig>>,
    payload: Result<Json<CalculateRequest>, JsonRejection>,
) -> Result<Json<RecipeListResponse>, ApiError> {
    let Json(request) = payload?;
    if request.ink_ids.is_empty() {
        return Err(ApiError::BadRequest("inkIds must not be empty".to_string()));
    }
    let constraints = request
        .constraints
        .unwrap_or_else(|| config.default_constraints());

    tracing::info!(
        lab = ?request.target.to_array(),
        inks = request.ink_ids.len(),
        max_inks = constraints.max_ink_count,
        "Recipe calculation requested"
    );

    let outcome = calculation
        .calculate(request.target, request.ink_ids, constraints)
        .await?;
    Ok(Json(outcome.into()))
}

/// Calculate recipes from the whole catalog
#[utoipa::path(
    post,
    path = "/api/recipes/optimize",
    request_body = OptimizeRequest,
    responses(
        (status = 200, description = "Ranked recipes (possibly empty with a reason)", body = RecipeListResponse),
        (status = 400, description = "Invalid target or constraints"),
    ),
    tag = "Recipes"
)]
pub async fn handle_optimize(
    State(calculation): State<Arc<CalculationService>>,
    State(config): State<Arc<AppConfig>>,
    payload: Result<Json<OptimizeRequest>, JsonRejection>,
) -> Result<Json<RecipeListResponse>, ApiError> {
    let Json(request) = payload?;
    let constraints = request
        .constraints
        .unwrap_or_else(|| config.default_constraints());

    tracing::info!(
        lab = ?request.target.to_array(),
        max_inks = constraints.max_ink_count,
        "Catalog-wide optimization requested"
    );

    let outcome = calculation.optimize(request.target, constraints).await?;
    Ok(Json(outcome.into()))
}
