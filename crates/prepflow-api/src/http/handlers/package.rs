//! Package catalog handlers for the REST API.

use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use prepflow_types::billing::{CreatePackageRequest, UpdatePackageRequest};
use prepflow_types::ids::PackageId;

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct PackageListQuery {
    /// Include inactive packages (staff view).
    #[serde(default)]
    pub all: bool,
}

/// GET /api/v1/packages - Active packages; `?all=true` includes inactive.
pub async fn list_packages(
    State(state): State<AppState>,
    _auth: Authenticated,
    Query(query): Query<PackageListQuery>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let packages = if query.all {
        state.billing_service.list_all_packages().await?
    } else {
        state.billing_service.list_active_packages().await?
    };
    let elapsed = start.elapsed().as_millis() as u64;

    let data = serde_json::to_value(&packages).map_err(|e| AppError::Internal(e.to_string()))?;
    let resp =
        ApiResponse::success(data, request_id, elapsed).with_link("self", "/api/v1/packages");

    Ok(Json(resp))
}

/// POST /api/v1/packages - Create a package (staff).
pub async fn create_package(
    State(state): State<AppState>,
    _auth: Authenticated,
    Json(body): Json<CreatePackageRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let package = state
        .billing_service
        .create_package(body, chrono::Utc::now())
        .await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let data = serde_json::to_value(&package).map_err(|e| AppError::Internal(e.to_string()))?;
    let resp = ApiResponse::success(data, request_id, elapsed)
        .with_link("self", &format!("/api/v1/packages/{}", package.id));

    Ok(Json(resp))
}

/// GET /api/v1/packages/:id - Fetch one package.
pub async fn get_package(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<PackageId>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let package = state.billing_service.get_package(&id).await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let data = serde_json::to_value(&package).map_err(|e| AppError::Internal(e.to_string()))?;
    let resp = ApiResponse::success(data, request_id, elapsed)
        .with_link("self", &format!("/api/v1/packages/{id}"));

    Ok(Json(resp))
}

/// PUT /api/v1/packages/:id - Update mutable fields (staff). Validity is
/// immutable and absent from the request shape.
pub async fn update_package(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<PackageId>,
    Json(body): Json<UpdatePackageRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let package = state
        .billing_service
        .update_package(&id, body, chrono::Utc::now())
        .await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let data = serde_json::to_value(&package).map_err(|e| AppError::Internal(e.to_string()))?;
    let resp = ApiResponse::success(data, request_id, elapsed)
        .with_link("self", &format!("/api/v1/packages/{id}"));

    Ok(Json(resp))
}
