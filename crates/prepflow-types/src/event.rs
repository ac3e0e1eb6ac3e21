//! Event types for the Prepflow notification bus.
//!
//! `WorkflowEvent` is the unified event type broadcast after each state
//! transition commits. Delivery is fire-and-forget: the workflow core never
//! depends on a subscriber receiving an event.

use serde::{Deserialize, Serialize};

use crate::ids::{
    PackageId, ParticipantId, ScoreSubmissionId, StaffId, StudyPlanId, TransactionId,
};

/// One event per state transition, with a stable type tag and the affected
/// participant/staff ids. Consumed by notification and reporting
/// collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    /// A participant submitted an initial score for review.
    ScoreSubmitted {
        submission_id: ScoreSubmissionId,
        participant_id: ParticipantId,
    },

    /// Staff decided a score submission.
    ScoreDecided {
        submission_id: ScoreSubmissionId,
        participant_id: ParticipantId,
        staff_id: StaffId,
        approved: bool,
    },

    /// A participant submitted a study plan.
    PlanSubmitted {
        plan_id: StudyPlanId,
        participant_id: ParticipantId,
    },

    /// Staff rejected a pending study plan.
    PlanRejected {
        plan_id: StudyPlanId,
        participant_id: ParticipantId,
    },

    /// Staff gave feedback, activating the plan window.
    FeedbackGiven {
        plan_id: StudyPlanId,
        participant_id: ParticipantId,
        staff_id: StaffId,
    },

    /// A plan passed its end date and was marked completed.
    PlanCompleted {
        plan_id: StudyPlanId,
        participant_id: ParticipantId,
    },

    /// A participant created a purchase transaction.
    TransactionCreated {
        transaction_id: TransactionId,
        participant_id: ParticipantId,
        package_id: PackageId,
    },

    /// Staff verified (approved or rejected) a transaction.
    TransactionDecided {
        transaction_id: TransactionId,
        participant_id: ParticipantId,
        staff_id: StaffId,
        approved: bool,
    },
}
