use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

use crate::ids::{FeedbackId, ParticipantId, ScoreSubmissionId, StaffId, StudyPlanId};
use crate::skill::SkillId;

/// A study-plan submission.
///
/// State machine (initial Pending; terminal Rejected, Completed):
///
/// ```text
/// Pending --feedback--> FeedbackGiven --end date passes--> Completed
/// Pending --reject----> Rejected
/// ```
///
/// `source_score_id` is a snapshot of the score ledger's current approval
/// at submission time and is never re-validated: a plan already admitted
/// stays admitted even if the source score later expires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyPlan {
    pub id: StudyPlanId,
    pub participant_id: ParticipantId,
    pub source_score_id: ScoreSubmissionId,
    pub target_score: i32,
    pub target_duration: TargetDuration,
    /// Planned study days per week (1..=7).
    pub weekly_frequency: u8,
    pub daily_duration: DailyDuration,
    pub submitted_at: DateTime<Utc>,
    pub status: PlanStatus,
    /// Set the moment feedback is given.
    pub start_date: Option<DateTime<Utc>>,
    /// `start_date` plus the target duration bucket.
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub rejection_remark: Option<String>,
}

/// Study plan lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Pending,
    Rejected,
    FeedbackGiven,
    Completed,
}

impl PlanStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlanStatus::Rejected | PlanStatus::Completed)
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanStatus::Pending => write!(f, "pending"),
            PlanStatus::Rejected => write!(f, "rejected"),
            PlanStatus::FeedbackGiven => write!(f, "feedback_given"),
            PlanStatus::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for PlanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(PlanStatus::Pending),
            "rejected" => Ok(PlanStatus::Rejected),
            "feedback_given" => Ok(PlanStatus::FeedbackGiven),
            "completed" => Ok(PlanStatus::Completed),
            other => Err(format!("invalid plan status: '{other}'")),
        }
    }
}

/// Target duration buckets a participant can pick for a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetDuration {
    OneMonth,
    TwoMonths,
    ThreeMonths,
    SixMonths,
}

impl TargetDuration {
    pub fn months(&self) -> u32 {
        match self {
            TargetDuration::OneMonth => 1,
            TargetDuration::TwoMonths => 2,
            TargetDuration::ThreeMonths => 3,
            TargetDuration::SixMonths => 6,
        }
    }

    /// Plan end date for a plan starting at `start`.
    pub fn end_date_from(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        start + Months::new(self.months())
    }
}

impl fmt::Display for TargetDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetDuration::OneMonth => write!(f, "one_month"),
            TargetDuration::TwoMonths => write!(f, "two_months"),
            TargetDuration::ThreeMonths => write!(f, "three_months"),
            TargetDuration::SixMonths => write!(f, "six_months"),
        }
    }
}

impl FromStr for TargetDuration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "one_month" => Ok(TargetDuration::OneMonth),
            "two_months" => Ok(TargetDuration::TwoMonths),
            "three_months" => Ok(TargetDuration::ThreeMonths),
            "six_months" => Ok(TargetDuration::SixMonths),
            other => Err(format!("invalid target duration: '{other}'")),
        }
    }
}

/// Daily study-time buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DailyDuration {
    UnderOneHour,
    OneToTwoHours,
    TwoToThreeHours,
    OverThreeHours,
}

impl fmt::Display for DailyDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DailyDuration::UnderOneHour => write!(f, "under_one_hour"),
            DailyDuration::OneToTwoHours => write!(f, "one_to_two_hours"),
            DailyDuration::TwoToThreeHours => write!(f, "two_to_three_hours"),
            DailyDuration::OverThreeHours => write!(f, "over_three_hours"),
        }
    }
}

impl FromStr for DailyDuration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "under_one_hour" => Ok(DailyDuration::UnderOneHour),
            "one_to_two_hours" => Ok(DailyDuration::OneToTwoHours),
            "two_to_three_hours" => Ok(DailyDuration::TwoToThreeHours),
            "over_three_hours" => Ok(DailyDuration::OverThreeHours),
            other => Err(format!("invalid daily duration: '{other}'")),
        }
    }
}

/// Staff feedback on a study plan. Write-once: exactly one feedback row can
/// ever exist per plan, created in the same transaction that moves the plan
/// to FeedbackGiven.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub id: FeedbackId,
    pub plan_id: StudyPlanId,
    pub staff_id: StaffId,
    pub given_at: DateTime<Utc>,
}

/// Request to submit a study plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitPlanRequest {
    pub participant_id: ParticipantId,
    pub target_score: i32,
    pub target_duration: TargetDuration,
    pub weekly_frequency: u8,
    pub daily_duration: DailyDuration,
    /// Skills the learner asks to focus on; must all resolve in the catalog.
    pub skill_ids: Vec<SkillId>,
}
