//! Study plan repository trait definition.

use prepflow_types::error::RepositoryError;
use prepflow_types::ids::{FeedbackId, ParticipantId, StudyPlanId};
use prepflow_types::plan::{Feedback, PlanStatus, StudyPlan};
use prepflow_types::skill::SkillId;

/// Repository trait for study plan persistence.
///
/// Transitions are written with check-then-act guards: every mutating
/// method re-checks the stored status inside its own transaction before
/// writing, and the one-active-plan-per-participant invariant is backed by
/// a partial unique index on `(participant_id) WHERE is_active`.
pub trait PlanRepository: Send + Sync {
    /// Insert a Pending plan together with its skill-request edges in a
    /// single transaction. A concurrent active plan for the same
    /// participant yields `Conflict`.
    fn create(
        &self,
        plan: &StudyPlan,
        skill_ids: &[SkillId],
    ) -> impl std::future::Future<Output = Result<StudyPlan, RepositoryError>> + Send;

    fn get(
        &self,
        id: &StudyPlanId,
    ) -> impl std::future::Future<Output = Result<Option<StudyPlan>, RepositoryError>> + Send;

    /// The participant's plan with `is_active = true`, if any.
    fn get_active(
        &self,
        participant_id: &ParticipantId,
    ) -> impl std::future::Future<Output = Result<Option<StudyPlan>, RepositoryError>> + Send;

    /// All plans for a participant, newest first.
    fn list_for_participant(
        &self,
        participant_id: &ParticipantId,
    ) -> impl std::future::Future<Output = Result<Vec<StudyPlan>, RepositoryError>> + Send;

    /// Write an updated plan, guarded on the stored status still being
    /// `expected`. Used for the reject and complete transitions; losing a
    /// race yields `Conflict`.
    fn update_status(
        &self,
        plan: &StudyPlan,
        expected: PlanStatus,
    ) -> impl std::future::Future<Output = Result<StudyPlan, RepositoryError>> + Send;

    /// Atomically record feedback: insert the feedback row and its
    /// skill-grant edges and move the plan from Pending to FeedbackGiven,
    /// all in one transaction. A pre-existing feedback row (unique on
    /// plan_id) or a non-Pending plan yields `Conflict`.
    fn record_feedback(
        &self,
        plan: &StudyPlan,
        feedback: &Feedback,
        granted_skill_ids: &[SkillId],
    ) -> impl std::future::Future<Output = Result<Feedback, RepositoryError>> + Send;

    /// The immutable skill-request edge set of a plan, sorted by skill id.
    fn skill_requests(
        &self,
        plan_id: &StudyPlanId,
    ) -> impl std::future::Future<Output = Result<Vec<SkillId>, RepositoryError>> + Send;

    /// The feedback row for a plan, if one exists.
    fn get_feedback(
        &self,
        plan_id: &StudyPlanId,
    ) -> impl std::future::Future<Output = Result<Option<Feedback>, RepositoryError>> + Send;

    /// The skill-grant edge set of a feedback, sorted by skill id.
    fn skill_grants(
        &self,
        feedback_id: &FeedbackId,
    ) -> impl std::future::Future<Output = Result<Vec<SkillId>, RepositoryError>> + Send;
}
