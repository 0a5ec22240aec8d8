use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use ink_recipe::{Ink, InkType};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::services::CatalogProvider;

/// Query string of /api/inks
#[derive(Debug, Deserialize)]
pub struct InkQuery {
    #[serde(rename = "type")]
    pub ink_type: Option<String>,
}

/// Response from the /api/inks endpoint
#[derive(Debug, Serialize, ToSchema)]
pub struct InkListResponse {
    /// Number of inks returned
    pub count: usize,
    /// Inks with their measured concentration tiers
    #[schema(value_type = Vec<Object>)]
    pub inks: Vec<Ink>,
}

/// List catalog inks
///
/// Optionally filtered by ink type.
#[utoipa::path(
    get,
    path = "/api/inks",
    responses(
        (status = 200, description = "Ink list", body = InkListResponse),
        (status = 400, description = "Unknown ink type"),
    ),
    params(
        ("type" = Option<String>, Query, description = "process, spot, metallic, fluorescent, medium or custom"),
    ),
    tag = "Inks"
)]
pub async fn handle_list_inks(
    State(catalog): State<Arc<dyn CatalogProvider>>,
    Query(query): Query<InkQuery>,
) -> Result<Json<InkListResponse>, ApiError> {
    let inks = match query.ink_type.as_deref() {
        Some(name) => {
            let ink_type: InkType = name
                .parse()
                .map_err(|e: ink_recipe::CatalogError| ApiError::BadRequest(e.to_string()))?;
            catalog.by_type(ink_type).await?
        }
        None => catalog.inks().await?,
    };

    tracing::debug!(count = inks.len(), filter = ?query.ink_type, "Listing inks");

    Ok(Json(InkListResponse {
        count: inks.len(),
        inks,
    }))
}

/// Fetch one ink by id
#[utoipa::path(
    get,
    path = "/api/inks/{id}",
    responses(
        (status = 200, description = "Ink definition"),
        (status = 404, description = "Unknown ink"),
    ),
    params(
        ("id" = String, Path, description = "Ink id"),
    ),
    tag = "Inks"
)]
pub async fn handle_get_ink(
    State(catalog): State<Arc<dyn CatalogProvider>>,
    Path(id): Path<String>,
) -> Result<Json<Ink>, ApiError> {
    catalog
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::UnknownInk(format!("'{id}'")))
}
