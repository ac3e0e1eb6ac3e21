//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use prepflow_types::error::WorkflowError;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Workflow taxonomy errors from the core services.
    Workflow(WorkflowError),
    /// Authentication failure.
    Unauthorized(String),
    /// Validation error raised at the HTTP layer.
    Validation(String),
    /// Generic internal error.
    Internal(String),
}

impl From<WorkflowError> for AppError {
    fn from(e: WorkflowError) -> Self {
        AppError::Workflow(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            AppError::Workflow(e) => {
                let status = match e {
                    WorkflowError::Validation(_) => StatusCode::BAD_REQUEST,
                    WorkflowError::Ineligible(_) => StatusCode::FORBIDDEN,
                    WorkflowError::Conflict(_) => StatusCode::CONFLICT,
                    WorkflowError::InvalidState(_) => StatusCode::CONFLICT,
                    WorkflowError::NotFound(_) => StatusCode::NOT_FOUND,
                    WorkflowError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                let details = match e {
                    WorkflowError::Ineligible(reason) => {
                        Some(json!({ "reason": reason.code() }))
                    }
                    _ => None,
                };
                (status, e.kind(), e.to_string(), details)
            }
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone(), None)
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone(), None)
            }
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg.clone(),
                None,
            ),
        };

        let body = json!({
            "data": null,
            "meta": {
                "request_id": "",
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "response_time_ms": 0
            },
            "errors": [{
                "code": code,
                "message": message,
                "details": details,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
