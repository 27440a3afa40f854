//! Public settings reads, served from the settings cache.

use axum::{extract::State, Json};
use domain::models::{SiteSettings, Taxonomy};

use crate::app::AppState;

/// GET /api/v1/settings/taxonomy
pub async fn get_taxonomy(State(state): State<AppState>) -> Json<Taxonomy> {
    Json(state.settings.taxonomy().await)
}

/// GET /api/v1/settings/site
pub async fn get_site_settings(State(state): State<AppState>) -> Json<SiteSettings> {
    Json(state.settings.site().await)
}
