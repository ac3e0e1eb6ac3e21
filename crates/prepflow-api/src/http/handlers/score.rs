//! Score ledger handlers for the REST API.

use std::time::Instant;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use prepflow_types::ids::{ParticipantId, ScoreSubmissionId, StaffId};
use prepflow_types::score::{ScoreDecision, SubmitScoreRequest};

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Decision payload: the deciding staff member plus the outcome.
#[derive(Debug, Deserialize)]
pub struct ScoreDecisionBody {
    pub staff_id: StaffId,
    #[serde(flatten)]
    pub decision: ScoreDecision,
}

/// POST /api/v1/scores - Submit an initial test score for review.
pub async fn submit_score(
    State(state): State<AppState>,
    _auth: Authenticated,
    Json(body): Json<SubmitScoreRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let submission = state
        .score_service
        .submit(body, chrono::Utc::now())
        .await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let data = serde_json::to_value(&submission)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let resp = ApiResponse::success(data, request_id, elapsed)
        .with_link("self", &format!("/api/v1/scores/{}", submission.id))
        .with_link("decision", &format!("/api/v1/scores/{}/decision", submission.id));

    Ok(Json(resp))
}

/// GET /api/v1/scores/:id - Fetch one submission.
pub async fn get_score(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<ScoreSubmissionId>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let submission = state.score_service.get(&id).await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let data = serde_json::to_value(&submission)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let resp = ApiResponse::success(data, request_id, elapsed)
        .with_link("self", &format!("/api/v1/scores/{id}"));

    Ok(Json(resp))
}

/// POST /api/v1/scores/:id/decision - Approve or reject a pending
/// submission.
pub async fn decide_score(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<ScoreSubmissionId>,
    Json(body): Json<ScoreDecisionBody>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let submission = state
        .score_service
        .decide(&id, &body.staff_id, body.decision, chrono::Utc::now())
        .await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let data = serde_json::to_value(&submission)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let resp = ApiResponse::success(data, request_id, elapsed)
        .with_link("self", &format!("/api/v1/scores/{id}"));

    Ok(Json(resp))
}

/// GET /api/v1/participants/:id/scores/current - The latest-decided
/// approved submission whose validity window covers now, or null.
pub async fn get_current_score(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(participant_id): Path<ParticipantId>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let submission = state
        .score_service
        .current_approved(&participant_id, chrono::Utc::now())
        .await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let data = serde_json::to_value(&submission)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let resp = ApiResponse::success(data, request_id, elapsed)
        .with_link(
            "self",
            &format!("/api/v1/participants/{participant_id}/scores/current"),
        )
        .with_link(
            "eligibility",
            &format!("/api/v1/participants/{participant_id}/eligibility"),
        );

    Ok(Json(resp))
}

/// GET /api/v1/participants/:id/scores - Submission history, newest first.
pub async fn list_participant_scores(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(participant_id): Path<ParticipantId>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let submissions = state
        .score_service
        .list_for_participant(&participant_id)
        .await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let data = serde_json::to_value(&submissions)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let resp = ApiResponse::success(data, request_id, elapsed)
        .with_link("self", &format!("/api/v1/participants/{participant_id}/scores"));

    Ok(Json(resp))
}
