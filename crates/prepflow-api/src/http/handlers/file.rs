//! Document upload handlers.
//!
//! Uploaded bytes (score reports, payment proofs) are stored through the
//! file store and addressed by the returned opaque reference, which the
//! workflow records as `document_ref` / `proof_ref`.

use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use prepflow_core::storage::FileStore;

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub filename: String,
}

/// POST /api/v1/files?filename=... - Store raw bytes, returning an opaque
/// reference.
pub async fn upload_file(
    State(state): State<AppState>,
    _auth: Authenticated,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    if body.is_empty() {
        return Err(AppError::Validation("file body cannot be empty".to_string()));
    }

    let file_ref = state
        .file_store
        .store(&query.filename, &body)
        .await
        .map_err(|e| AppError::Workflow(e.into()))?;
    let elapsed = start.elapsed().as_millis() as u64;

    let resp = ApiResponse::success(json!({ "ref": file_ref }), request_id, elapsed)
        .with_link("self", &format!("/api/v1/files/{file_ref}"));

    Ok(Json(resp))
}

/// GET /api/v1/files/:ref - Retrieve the bytes behind a reference.
pub async fn download_file(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(file_ref): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let data = state
        .file_store
        .retrieve(&file_ref)
        .await
        .map_err(|e| AppError::Workflow(e.into()))?;

    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        data,
    ))
}
