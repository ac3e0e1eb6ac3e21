//! Pure, side-effect-free eligibility evaluation.
//!
//! Given a participant's current score-ledger and study-plan state, this
//! module computes the two gating booleans: "may submit a study plan" and
//! "may purchase a package". `now` is an explicit input so the evaluator is
//! independently testable with injected clocks.
//!
//! Eligibility depends on wall-clock time (score validity windows, plan end
//! dates), so results must never be cached: callers re-evaluate immediately
//! before any state-changing call.

use chrono::{DateTime, Utc};
use serde::Serialize;

use prepflow_types::error::{EligibilityReason, WorkflowError};
use prepflow_types::plan::{PlanStatus, StudyPlan};
use prepflow_types::score::ScoreSubmission;

/// One eligibility gate: a recomputed-on-demand boolean plus a
/// machine-checkable reason when it is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Eligibility {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<EligibilityReason>,
}

impl Eligibility {
    fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    fn blocked(reason: EligibilityReason) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }

    /// Turn a false gate into the taxonomy error the mutating operation
    /// must surface.
    pub fn check(&self) -> Result<(), WorkflowError> {
        match self.reason {
            None => Ok(()),
            Some(reason) => Err(WorkflowError::Ineligible(reason)),
        }
    }
}

/// Both gates evaluated at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EligibilityReport {
    pub may_submit_plan: Eligibility,
    pub may_purchase_package: Eligibility,
}

/// Whether the participant may submit a study plan at `now`.
///
/// True iff `current_score` is an approval whose validity window covers
/// `now`. The one-active-plan constraint is a conflict, not an eligibility
/// concern, and is checked separately at submit time.
pub fn may_submit_plan(
    current_score: Option<&ScoreSubmission>,
    now: DateTime<Utc>,
) -> Eligibility {
    match current_score {
        Some(score) if score.is_valid_at(now) => Eligibility::allowed(),
        _ => Eligibility::blocked(EligibilityReason::NoValidScore),
    }
}

/// Whether the participant may purchase a package at `now`.
///
/// True iff at least one plan has reached FeedbackGiven or Completed. When
/// false, the reason distinguishes "never got a valid score" from "has a
/// score but no feedback yet" so callers can point at the right next stage.
pub fn may_purchase_package(
    current_score: Option<&ScoreSubmission>,
    plans: &[StudyPlan],
    now: DateTime<Utc>,
) -> Eligibility {
    let has_feedback = plans.iter().any(|p| {
        matches!(p.status, PlanStatus::FeedbackGiven | PlanStatus::Completed)
    });
    if has_feedback {
        return Eligibility::allowed();
    }
    if may_submit_plan(current_score, now).allowed {
        Eligibility::blocked(EligibilityReason::NoFeedbackYet)
    } else {
        Eligibility::blocked(EligibilityReason::NoValidScore)
    }
}

/// Evaluate both gates at one instant.
pub fn evaluate(
    current_score: Option<&ScoreSubmission>,
    plans: &[StudyPlan],
    now: DateTime<Utc>,
) -> EligibilityReport {
    EligibilityReport {
        may_submit_plan: may_submit_plan(current_score, now),
        may_purchase_package: may_purchase_package(current_score, plans, now),
    }
}
