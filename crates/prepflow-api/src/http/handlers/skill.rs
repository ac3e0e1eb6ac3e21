//! Skill catalog handler.

use std::time::Instant;

use axum::extract::State;
use axum::Json;

use prepflow_core::catalog::{CatalogError, SkillCatalog};

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// GET /api/v1/skills - The full catalog, sorted by category then id.
pub async fn list_skills(
    State(state): State<AppState>,
    _auth: Authenticated,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let skills = state.catalog.list_all().await.map_err(|e| match e {
        CatalogError::Storage(msg) => AppError::Internal(msg),
        other => AppError::Internal(other.to_string()),
    })?;
    let elapsed = start.elapsed().as_millis() as u64;

    let data = serde_json::to_value(&skills).map_err(|e| AppError::Internal(e.to_string()))?;
    let resp = ApiResponse::success(data, request_id, elapsed).with_link("self", "/api/v1/skills");

    Ok(Json(resp))
}
