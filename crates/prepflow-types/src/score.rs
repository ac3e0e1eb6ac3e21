use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

use crate::ids::{ParticipantId, ScoreSubmissionId};

/// An initial-score submission in the score ledger.
///
/// Created `Pending` by a participant, then transitioned exactly once to
/// `Approved` (with a staff-chosen validity window) or `Rejected` (with a
/// remark). Never re-opened. A participant may accumulate many submissions;
/// the "current" one is the most recently decided approval whose
/// `valid_until` has not passed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreSubmission {
    pub id: ScoreSubmissionId,
    pub participant_id: ParticipantId,
    /// Name of the test taken ("TOEFL ITP", "IELTS", ...).
    pub test_name: String,
    pub score: i32,
    /// Opaque reference to the uploaded score document in file storage.
    pub document_ref: String,
    pub submitted_at: DateTime<Utc>,
    pub status: ScoreStatus,
    pub decided_at: Option<DateTime<Utc>>,
    /// Set only on approval; an explicit staff decision, never derived.
    pub valid_until: Option<DateTime<Utc>>,
    pub rejection_remark: Option<String>,
}

impl ScoreSubmission {
    /// Whether this submission is an approval still inside its validity
    /// window at `now`. Expiry must always be checked against the wall
    /// clock; eligibility is never cached.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.status == ScoreStatus::Approved
            && self.valid_until.map_or(false, |until| until >= now)
    }
}

/// Score submission lifecycle states.
///
/// - Pending: awaiting staff review
/// - Approved: accepted with a validity window
/// - Rejected: refused with a remark
///
/// Approved and Rejected are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for ScoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreStatus::Pending => write!(f, "pending"),
            ScoreStatus::Approved => write!(f, "approved"),
            ScoreStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl FromStr for ScoreStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ScoreStatus::Pending),
            "approved" => Ok(ScoreStatus::Approved),
            "rejected" => Ok(ScoreStatus::Rejected),
            other => Err(format!("invalid score status: '{other}'")),
        }
    }
}

/// Request to submit an initial score for review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitScoreRequest {
    pub participant_id: ParticipantId,
    pub test_name: String,
    pub score: i32,
    pub document_ref: String,
}

/// The staff decision on a pending score submission.
///
/// Approval fixes the validity window; rejection records the remark shown
/// to the participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ScoreDecision {
    Approve { valid_until: DateTime<Utc> },
    Reject { remark: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn approved_submission(valid_until: DateTime<Utc>) -> ScoreSubmission {
        let now = Utc::now();
        ScoreSubmission {
            id: ScoreSubmissionId::new(),
            participant_id: ParticipantId::new(),
            test_name: "TOEFL ITP".to_string(),
            score: 520,
            document_ref: "doc-1".to_string(),
            submitted_at: now,
            status: ScoreStatus::Approved,
            decided_at: Some(now),
            valid_until: Some(valid_until),
            rejection_remark: None,
        }
    }

    #[test]
    fn test_score_status_roundtrip() {
        for status in [
            ScoreStatus::Pending,
            ScoreStatus::Approved,
            ScoreStatus::Rejected,
        ] {
            let parsed: ScoreStatus = status.to_string().parse().unwrap();
            assert_eq!(status, parsed);
        }
    }

    #[test]
    fn valid_inside_window() {
        let now = Utc::now();
        let sub = approved_submission(now + Duration::days(30));
        assert!(sub.is_valid_at(now));
    }

    #[test]
    fn invalid_after_expiry() {
        let now = Utc::now();
        let sub = approved_submission(now - Duration::days(1));
        assert!(!sub.is_valid_at(now));
    }

    #[test]
    fn pending_is_never_valid() {
        let now = Utc::now();
        let mut sub = approved_submission(now + Duration::days(30));
        sub.status = ScoreStatus::Pending;
        assert!(!sub.is_valid_at(now));
    }

    #[test]
    fn valid_exactly_at_expiry_instant() {
        let now = Utc::now();
        let sub = approved_submission(now);
        assert!(sub.is_valid_at(now));
    }
}
