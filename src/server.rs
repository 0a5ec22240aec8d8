//! HTTP server setup and configuration.
//!
//! This module provides the router and application state used by both
//! the production server and integration tests.

use axum::{
    extract::FromRef,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::assets::AssetLoader;
use crate::models::{AppConfig, InkCatalogFile};
use crate::services::{CalculationService, CatalogProvider, StaticCatalog};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub calculation: Arc<CalculationService>,
    pub catalog: Arc<dyn CatalogProvider>,
    pub settings: Arc<AppConfig>,
}

impl FromRef<AppState> for Arc<CalculationService> {
    fn from_ref(state: &AppState) -> Self {
        state.calculation.clone()
    }
}

impl FromRef<AppState> for Arc<dyn CatalogProvider> {
    fn from_ref(state: &AppState) -> Self {
        state.catalog.clone()
    }
}

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(state: &AppState) -> Self {
        state.settings.clone()
    }
}

/// Create application state from an asset loader.
pub fn create_app_state(asset_loader: Arc<AssetLoader>) -> anyhow::Result<AppState> {
    let config = AppConfig::load_from_assets(&asset_loader);
    let inks = InkCatalogFile::load_from_assets(&asset_loader);
    create_app_state_from(config, inks)
}

/// Create application state from an already loaded configuration and catalog.
pub fn create_app_state_from(
    config: AppConfig,
    inks: ink_recipe::InkSet,
) -> anyhow::Result<AppState> {
    let engine = config
        .build_engine(inks.clone())
        .map_err(|e| anyhow::anyhow!("Failed to create recipe engine: {e}"))?;
    let calculation = Arc::new(CalculationService::new(Arc::new(engine), config.timeout()));
    let catalog: Arc<dyn CatalogProvider> = Arc::new(StaticCatalog::new(inks));

    Ok(AppState {
        calculation,
        catalog,
        settings: Arc::new(config),
    })
}

/// Build the API router with all endpoints and middleware.
///
/// This is the core router used by both production and tests.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Catalog
        .route("/api/inks", get(api::handle_list_inks))
        .route("/api/inks/:id", get(api::handle_get_ink))
        // Recipe search
        .route("/api/recipes/calculate", post(api::handle_calculate))
        .route("/api/recipes/optimize", post(api::handle_optimize))
        // Correction
        .route("/api/corrections/analyze", post(api::handle_analyze_correction))
        .route("/api/corrections/predict", post(api::handle_predict_correction))
        // Spectral and color helpers
        .route("/api/metamerism", post(api::handle_metamerism))
        .route("/api/colors/convert", post(api::handle_convert_color))
        // Health check
        .route("/health", get(|| async { "OK" }))
        // Add state and tracing
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
