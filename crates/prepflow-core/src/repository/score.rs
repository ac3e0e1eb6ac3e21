//! Score ledger repository trait definition.

use chrono::{DateTime, Utc};
use prepflow_types::error::RepositoryError;
use prepflow_types::ids::{ParticipantId, ScoreSubmissionId};
use prepflow_types::score::ScoreSubmission;

/// Repository trait for score submission persistence.
///
/// Implementations live in prepflow-infra (e.g., SqliteScoreRepository).
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait ScoreRepository: Send + Sync {
    /// Insert a new Pending submission. Returns the created record.
    fn create(
        &self,
        submission: &ScoreSubmission,
    ) -> impl std::future::Future<Output = Result<ScoreSubmission, RepositoryError>> + Send;

    /// Get a submission by ID.
    fn get(
        &self,
        id: &ScoreSubmissionId,
    ) -> impl std::future::Future<Output = Result<Option<ScoreSubmission>, RepositoryError>> + Send;

    /// All submissions for a participant, newest first.
    fn list_for_participant(
        &self,
        participant_id: &ParticipantId,
    ) -> impl std::future::Future<Output = Result<Vec<ScoreSubmission>, RepositoryError>> + Send;

    /// The latest-decided Approved submission whose validity window covers
    /// `now`, if any.
    fn latest_valid_approved(
        &self,
        participant_id: &ParticipantId,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Option<ScoreSubmission>, RepositoryError>> + Send;

    /// Persist a decision on a Pending submission.
    ///
    /// The write must be guarded on the stored status still being Pending
    /// inside a single transaction, so two concurrent staff decisions
    /// cannot both land. Losing the race yields `Conflict`.
    fn decide(
        &self,
        submission: &ScoreSubmission,
    ) -> impl std::future::Future<Output = Result<ScoreSubmission, RepositoryError>> + Send;
}
