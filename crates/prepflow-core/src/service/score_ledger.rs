//! Score ledger service.
//!
//! Stage one of the workflow: participants submit an initial test score
//! with a document reference; staff approve it with an explicit validity
//! window or reject it with a remark. The validity window is a staff
//! decision, never computed by policy, so downstream eligibility always
//! re-checks wall-clock time against the stored value.

use chrono::{DateTime, Utc};

use prepflow_types::error::WorkflowError;
use prepflow_types::event::WorkflowEvent;
use prepflow_types::ids::{ParticipantId, ScoreSubmissionId, StaffId};
use prepflow_types::score::{ScoreDecision, ScoreStatus, ScoreSubmission, SubmitScoreRequest};

use crate::event::EventBus;
use crate::repository::score::ScoreRepository;

/// Plausibility bounds for submitted scores, configuration-supplied.
#[derive(Debug, Clone, Copy)]
pub struct ScorePolicy {
    pub min: i32,
    pub max: i32,
}

impl Default for ScorePolicy {
    fn default() -> Self {
        // TOEFL ITP paper band.
        Self { min: 310, max: 677 }
    }
}

/// Service owning score submissions and their approval/expiry state.
pub struct ScoreLedgerService<R: ScoreRepository> {
    repo: R,
    events: EventBus,
    policy: ScorePolicy,
}

impl<R: ScoreRepository> ScoreLedgerService<R> {
    pub fn new(repo: R, events: EventBus, policy: ScorePolicy) -> Self {
        Self {
            repo,
            events,
            policy,
        }
    }

    /// Submit an initial score for staff review.
    ///
    /// Always creates a Pending submission; multiple pending submissions
    /// per participant are allowed, so no duplicate check is performed.
    pub async fn submit(
        &self,
        request: SubmitScoreRequest,
        now: DateTime<Utc>,
    ) -> Result<ScoreSubmission, WorkflowError> {
        if request.score < self.policy.min || request.score > self.policy.max {
            return Err(WorkflowError::Validation(format!(
                "score {} outside plausible range {}..={}",
                request.score, self.policy.min, self.policy.max
            )));
        }
        if request.test_name.trim().is_empty() {
            return Err(WorkflowError::Validation(
                "test name cannot be empty".to_string(),
            ));
        }
        if request.document_ref.trim().is_empty() {
            return Err(WorkflowError::Validation(
                "document reference cannot be empty".to_string(),
            ));
        }

        let submission = ScoreSubmission {
            id: ScoreSubmissionId::new(),
            participant_id: request.participant_id,
            test_name: request.test_name.trim().to_string(),
            score: request.score,
            document_ref: request.document_ref,
            submitted_at: now,
            status: ScoreStatus::Pending,
            decided_at: None,
            valid_until: None,
            rejection_remark: None,
        };

        let submission = self.repo.create(&submission).await?;
        tracing::info!(
            submission_id = %submission.id,
            participant_id = %submission.participant_id,
            score = submission.score,
            "score submitted"
        );

        self.events.publish(WorkflowEvent::ScoreSubmitted {
            submission_id: submission.id,
            participant_id: submission.participant_id,
        });

        Ok(submission)
    }

    /// Decide a pending submission, permanently.
    ///
    /// Approval requires `valid_until > now`; rejection requires a
    /// non-empty remark. A submission that is no longer Pending cannot be
    /// re-decided: a stale read surfaces as `InvalidState`, and a lost race
    /// against a concurrent decision is caught by the repository's guarded
    /// write.
    pub async fn decide(
        &self,
        submission_id: &ScoreSubmissionId,
        staff_id: &StaffId,
        decision: ScoreDecision,
        now: DateTime<Utc>,
    ) -> Result<ScoreSubmission, WorkflowError> {
        let mut submission = self
            .repo
            .get(submission_id)
            .await?
            .ok_or(WorkflowError::NotFound("score submission"))?;

        if submission.status != ScoreStatus::Pending {
            return Err(WorkflowError::InvalidState(format!(
                "submission is {}, only pending submissions can be decided",
                submission.status
            )));
        }

        let approved = match decision {
            ScoreDecision::Approve { valid_until } => {
                if valid_until <= now {
                    return Err(WorkflowError::Validation(
                        "valid_until must be in the future".to_string(),
                    ));
                }
                submission.status = ScoreStatus::Approved;
                submission.valid_until = Some(valid_until);
                true
            }
            ScoreDecision::Reject { remark } => {
                if remark.trim().is_empty() {
                    return Err(WorkflowError::Validation(
                        "rejection remark cannot be empty".to_string(),
                    ));
                }
                submission.status = ScoreStatus::Rejected;
                submission.rejection_remark = Some(remark);
                false
            }
        };
        submission.decided_at = Some(now);

        let submission = self.repo.decide(&submission).await.map_err(|e| match e {
            prepflow_types::error::RepositoryError::Conflict(_) => WorkflowError::InvalidState(
                "submission was decided concurrently".to_string(),
            ),
            other => other.into(),
        })?;

        tracing::info!(
            submission_id = %submission.id,
            staff_id = %staff_id,
            approved,
            "score decided"
        );

        self.events.publish(WorkflowEvent::ScoreDecided {
            submission_id: submission.id,
            participant_id: submission.participant_id,
            staff_id: *staff_id,
            approved,
        });

        Ok(submission)
    }

    /// Fetch a submission by id.
    pub async fn get(
        &self,
        submission_id: &ScoreSubmissionId,
    ) -> Result<ScoreSubmission, WorkflowError> {
        self.repo
            .get(submission_id)
            .await?
            .ok_or(WorkflowError::NotFound("score submission"))
    }

    /// The participant's current approved submission: the latest-decided
    /// approval whose validity window covers `now`, or none (including the
    /// case where the only approval has expired).
    pub async fn current_approved(
        &self,
        participant_id: &ParticipantId,
        now: DateTime<Utc>,
    ) -> Result<Option<ScoreSubmission>, WorkflowError> {
        Ok(self.repo.latest_valid_approved(participant_id, now).await?)
    }

    /// Submission history for a participant, newest first.
    pub async fn list_for_participant(
        &self,
        participant_id: &ParticipantId,
    ) -> Result<Vec<ScoreSubmission>, WorkflowError> {
        Ok(self.repo.list_for_participant(participant_id).await?)
    }
}
