use axum::{Json, extract::State};
use serde_json::{Value, json};

use avitolog_types::api::SettingsResponse;
use avitolog_types::models::DEFAULT_HEADER_TITLE;

use crate::error::ApiError;
use crate::state::{AppState, run_blocking};

/// GET /api/settings
pub async fn get_settings(State(state): State<AppState>) -> Result<Json<SettingsResponse>, ApiError> {
    let db = state.db.clone();
    let header_title = run_blocking(move || db.get_header_title())
        .await?
        .filter(|title| !title.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_HEADER_TITLE.to_string());

    Ok(Json(SettingsResponse { header_title }))
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
