use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
};
use ink_recipe::{Illuminant, MetamerismReport, SpectralCurve};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::services::CalculationService;

/// Body of /api/metamerism
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetamerismRequest {
    /// Reflectance samples `{"380": 0.12, "390": 0.13, ...}`
    #[schema(value_type = Object)]
    pub sample_a: SpectralCurve,
    #[schema(value_type = Object)]
    pub sample_b: SpectralCurve,
    /// A, D50, D65 or F11; D65, D50 and F11 when empty
    #[serde(default)]
    #[schema(value_type = Vec<String>)]
    pub illuminants: Vec<Illuminant>,
}

/// Compare two reflectance curves under several illuminants
#[utoipa::path(
    post,
    path = "/api/metamerism",
    request_body = MetamerismRequest,
    responses(
        (status = 200, description = "Per-illuminant differences and the metamerism index"),
        (status = 400, description = "Invalid spectral data"),
    ),
    tag = "Spectral"
)]
pub async fn handle_metamerism(
    State(calculation): State<Arc<CalculationService>>,
    payload: Result<Json<MetamerismRequest>, JsonRejection>,
) -> Result<Json<MetamerismReport>, ApiError> {
    let Json(request) = payload?;

    let report = calculation
        .metamerism(request.sample_a, request.sample_b, request.illuminants)
        .await?;

    tracing::info!(
        index = report.metamerism_index,
        metameric = report.is_metameric,
        worst = ?report.worst_illuminant,
        "Metamerism evaluated"
    );
    Ok(Json(report))
}
