//! Eligibility report handler.

use std::time::Instant;

use axum::extract::{Path, State};
use axum::Json;

use prepflow_core::eligibility;
use prepflow_types::ids::ParticipantId;

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// GET /api/v1/participants/:id/eligibility - Both gates, evaluated now.
///
/// Always recomputed; never cached (score validity and plan windows are
/// time-dependent).
pub async fn get_eligibility(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(participant_id): Path<ParticipantId>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();
    let now = chrono::Utc::now();

    let current_score = state
        .score_service
        .current_approved(&participant_id, now)
        .await?;
    let plans = state
        .plan_service
        .list_for_participant(&participant_id)
        .await?;

    let report = eligibility::evaluate(current_score.as_ref(), &plans, now);
    let elapsed = start.elapsed().as_millis() as u64;

    let data = serde_json::to_value(&report).map_err(|e| AppError::Internal(e.to_string()))?;
    let resp = ApiResponse::success(data, request_id, elapsed)
        .with_link(
            "self",
            &format!("/api/v1/participants/{participant_id}/eligibility"),
        )
        .with_link("scores", &format!("/api/v1/participants/{participant_id}/scores"))
        .with_link("plans", &format!("/api/v1/participants/{participant_id}/plans"));

    Ok(Json(resp))
}
