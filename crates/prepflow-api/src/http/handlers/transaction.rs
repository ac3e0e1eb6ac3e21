//! Purchase transaction handlers for the REST API.

use std::time::Instant;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use prepflow_core::subscription::SubscriptionWindows;
use prepflow_types::billing::{PurchaseRequest, TransactionDecision};
use prepflow_types::ids::{ParticipantId, StaffId, TransactionId};

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Decision payload: the verifying staff member plus the outcome.
#[derive(Debug, Deserialize)]
pub struct TransactionDecisionBody {
    pub staff_id: StaffId,
    #[serde(flatten)]
    pub decision: TransactionDecision,
}

/// POST /api/v1/transactions - Purchase a package with proof of payment
/// (eligibility-gated).
pub async fn purchase(
    State(state): State<AppState>,
    _auth: Authenticated,
    Json(body): Json<PurchaseRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let transaction = state
        .billing_service
        .purchase(body, chrono::Utc::now())
        .await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let data =
        serde_json::to_value(&transaction).map_err(|e| AppError::Internal(e.to_string()))?;
    let resp = ApiResponse::success(data, request_id, elapsed)
        .with_link("self", &format!("/api/v1/transactions/{}", transaction.id))
        .with_link(
            "decision",
            &format!("/api/v1/transactions/{}/decision", transaction.id),
        );

    Ok(Json(resp))
}

/// GET /api/v1/transactions/:id - Fetch one transaction.
pub async fn get_transaction(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<TransactionId>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let transaction = state.billing_service.get_transaction(&id).await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let data =
        serde_json::to_value(&transaction).map_err(|e| AppError::Internal(e.to_string()))?;
    let resp = ApiResponse::success(data, request_id, elapsed)
        .with_link("self", &format!("/api/v1/transactions/{id}"));

    Ok(Json(resp))
}

/// POST /api/v1/transactions/:id/decision - Verify (approve or reject) a
/// pending transaction. Approval extends the subscription window.
pub async fn decide_transaction(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<TransactionId>,
    Json(body): Json<TransactionDecisionBody>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let transaction = state
        .billing_service
        .verify(&id, &body.staff_id, body.decision, chrono::Utc::now())
        .await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let data =
        serde_json::to_value(&transaction).map_err(|e| AppError::Internal(e.to_string()))?;
    let resp = ApiResponse::success(data, request_id, elapsed)
        .with_link("self", &format!("/api/v1/transactions/{id}"));

    Ok(Json(resp))
}

/// GET /api/v1/participants/:id/transactions - Transaction history, newest
/// first.
pub async fn list_participant_transactions(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(participant_id): Path<ParticipantId>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let transactions = state
        .billing_service
        .list_transactions_for_participant(&participant_id)
        .await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let data =
        serde_json::to_value(&transactions).map_err(|e| AppError::Internal(e.to_string()))?;
    let resp = ApiResponse::success(data, request_id, elapsed).with_link(
        "self",
        &format!("/api/v1/participants/{participant_id}/transactions"),
    );

    Ok(Json(resp))
}

/// GET /api/v1/participants/:id/subscription - The latest subscription
/// window, if any.
pub async fn get_subscription(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(participant_id): Path<ParticipantId>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let window = state
        .windows
        .latest_for(&participant_id)
        .await
        .map_err(|e| AppError::Workflow(e.into()))?;
    let elapsed = start.elapsed().as_millis() as u64;

    let data = serde_json::to_value(&window).map_err(|e| AppError::Internal(e.to_string()))?;
    let resp = ApiResponse::success(data, request_id, elapsed).with_link(
        "self",
        &format!("/api/v1/participants/{participant_id}/subscription"),
    );

    Ok(Json(resp))
}
