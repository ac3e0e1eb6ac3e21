use thiserror::Error;

use std::fmt;

/// Machine-checkable reason codes for a false eligibility gate, so callers
/// can render targeted guidance without string-matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EligibilityReason {
    /// No approved score submission is currently inside its validity window.
    NoValidScore,
    /// No study plan has reached FeedbackGiven (or Completed) yet.
    NoFeedbackYet,
}

impl EligibilityReason {
    pub fn code(&self) -> &'static str {
        match self {
            EligibilityReason::NoValidScore => "NO_VALID_SCORE",
            EligibilityReason::NoFeedbackYet => "NO_FEEDBACK_YET",
        }
    }
}

impl fmt::Display for EligibilityReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// The workflow error taxonomy.
///
/// All four caller-facing kinds are always surfaced, never swallowed; the
/// core performs no automatic retries of its own mutating operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Malformed or out-of-range input; recoverable by correcting input.
    #[error("{0}")]
    Validation(String),

    /// A guard predicate is false; recoverable by completing a prior stage.
    #[error("not eligible: {0}")]
    Ineligible(EligibilityReason),

    /// A concurrent or pre-existing record blocks the action.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Attempted transition from a state that does not allow it, including
    /// double-decision. Never retried automatically.
    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("storage error: {0}")]
    Storage(String),
}

impl WorkflowError {
    /// Stable machine-readable kind for the API error envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkflowError::Validation(_) => "VALIDATION_ERROR",
            WorkflowError::Ineligible(_) => "INELIGIBLE",
            WorkflowError::Conflict(_) => "CONFLICT",
            WorkflowError::InvalidState(_) => "INVALID_STATE",
            WorkflowError::NotFound(_) => "NOT_FOUND",
            WorkflowError::Storage(_) => "STORAGE_ERROR",
        }
    }
}

/// Errors from repository operations (used by trait definitions in
/// prepflow-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<RepositoryError> for WorkflowError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => WorkflowError::NotFound("record"),
            RepositoryError::Conflict(msg) => WorkflowError::Conflict(msg),
            other => WorkflowError::Storage(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_codes() {
        assert_eq!(EligibilityReason::NoValidScore.code(), "NO_VALID_SCORE");
        assert_eq!(EligibilityReason::NoFeedbackYet.code(), "NO_FEEDBACK_YET");
    }

    #[test]
    fn test_reason_serializes_as_code() {
        let json = serde_json::to_string(&EligibilityReason::NoValidScore).unwrap();
        assert_eq!(json, "\"NO_VALID_SCORE\"");
    }

    #[test]
    fn test_workflow_error_kinds() {
        assert_eq!(
            WorkflowError::Validation("score out of range".into()).kind(),
            "VALIDATION_ERROR"
        );
        assert_eq!(
            WorkflowError::Ineligible(EligibilityReason::NoFeedbackYet).kind(),
            "INELIGIBLE"
        );
        assert_eq!(
            WorkflowError::InvalidState("already decided".into()).kind(),
            "INVALID_STATE"
        );
    }

    #[test]
    fn test_repository_error_conversion() {
        let err: WorkflowError = RepositoryError::Conflict("active plan exists".into()).into();
        assert!(matches!(err, WorkflowError::Conflict(_)));

        let err: WorkflowError = RepositoryError::Query("syntax error".into()).into();
        assert!(matches!(err, WorkflowError::Storage(_)));
    }
}
