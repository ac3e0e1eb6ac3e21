//! Study plan handlers for the REST API.

use std::time::Instant;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use prepflow_types::ids::{ParticipantId, StaffId, StudyPlanId};
use prepflow_types::plan::SubmitPlanRequest;
use prepflow_types::skill::SkillId;

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RejectPlanBody {
    pub remark: String,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackBody {
    pub staff_id: StaffId,
    pub granted_skill_ids: Vec<SkillId>,
}

/// POST /api/v1/plans - Submit a study plan (eligibility-gated).
pub async fn submit_plan(
    State(state): State<AppState>,
    _auth: Authenticated,
    Json(body): Json<SubmitPlanRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let plan = state.plan_service.submit(body, chrono::Utc::now()).await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let data = serde_json::to_value(&plan).map_err(|e| AppError::Internal(e.to_string()))?;
    let resp = ApiResponse::success(data, request_id, elapsed)
        .with_link("self", &format!("/api/v1/plans/{}", plan.id))
        .with_link("feedback", &format!("/api/v1/plans/{}/feedback", plan.id))
        .with_link(
            "reconciliation",
            &format!("/api/v1/plans/{}/reconciliation", plan.id),
        );

    Ok(Json(resp))
}

/// GET /api/v1/plans/:id - Fetch one plan.
pub async fn get_plan(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<StudyPlanId>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let plan = state.plan_service.get(&id).await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let data = serde_json::to_value(&plan).map_err(|e| AppError::Internal(e.to_string()))?;
    let resp = ApiResponse::success(data, request_id, elapsed)
        .with_link("self", &format!("/api/v1/plans/{id}"));

    Ok(Json(resp))
}

/// POST /api/v1/plans/:id/reject - Reject a pending plan with a remark.
pub async fn reject_plan(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<StudyPlanId>,
    Json(body): Json<RejectPlanBody>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let plan = state.plan_service.reject(&id, &body.remark).await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let data = serde_json::to_value(&plan).map_err(|e| AppError::Internal(e.to_string()))?;
    let resp = ApiResponse::success(data, request_id, elapsed)
        .with_link("self", &format!("/api/v1/plans/{id}"));

    Ok(Json(resp))
}

/// POST /api/v1/plans/:id/feedback - Give feedback, activating the plan
/// window. Write-once.
pub async fn give_feedback(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<StudyPlanId>,
    Json(body): Json<FeedbackBody>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let feedback = state
        .plan_service
        .give_feedback(&id, &body.staff_id, &body.granted_skill_ids, chrono::Utc::now())
        .await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let data = serde_json::to_value(&feedback).map_err(|e| AppError::Internal(e.to_string()))?;
    let resp = ApiResponse::success(data, request_id, elapsed)
        .with_link("plan", &format!("/api/v1/plans/{id}"))
        .with_link(
            "reconciliation",
            &format!("/api/v1/plans/{id}/reconciliation"),
        );

    Ok(Json(resp))
}

/// POST /api/v1/plans/:id/complete - Move a feedback_given plan past its
/// end date to completed.
pub async fn complete_plan(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<StudyPlanId>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let plan = state
        .plan_service
        .mark_completed(&id, chrono::Utc::now())
        .await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let data = serde_json::to_value(&plan).map_err(|e| AppError::Internal(e.to_string()))?;
    let resp = ApiResponse::success(data, request_id, elapsed)
        .with_link("self", &format!("/api/v1/plans/{id}"));

    Ok(Json(resp))
}

/// GET /api/v1/plans/:id/reconciliation - Requested vs granted skills,
/// grouped by category.
pub async fn plan_reconciliation(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<StudyPlanId>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let reconciliation = state.plan_service.reconciliation(&id).await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let data =
        serde_json::to_value(&reconciliation).map_err(|e| AppError::Internal(e.to_string()))?;
    let resp = ApiResponse::success(data, request_id, elapsed)
        .with_link("plan", &format!("/api/v1/plans/{id}"));

    Ok(Json(resp))
}

/// GET /api/v1/participants/:id/plans - Plan history, newest first.
pub async fn list_participant_plans(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(participant_id): Path<ParticipantId>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let plans = state
        .plan_service
        .list_for_participant(&participant_id)
        .await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let data = serde_json::to_value(&plans).map_err(|e| AppError::Internal(e.to_string()))?;
    let resp = ApiResponse::success(data, request_id, elapsed)
        .with_link("self", &format!("/api/v1/participants/{participant_id}/plans"));

    Ok(Json(resp))
}

/// GET /api/v1/participants/:id/plans/active - The active plan, if any.
pub async fn get_active_plan(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(participant_id): Path<ParticipantId>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let plan = state.plan_service.get_active(&participant_id).await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let data = serde_json::to_value(&plan).map_err(|e| AppError::Internal(e.to_string()))?;
    let resp = ApiResponse::success(data, request_id, elapsed).with_link(
        "self",
        &format!("/api/v1/participants/{participant_id}/plans/active"),
    );

    Ok(Json(resp))
}
