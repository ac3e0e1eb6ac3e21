//! Study plan engine.
//!
//! Stage two of the workflow: eligible participants submit a plan with the
//! skills they want to focus on; staff either reject it or give feedback,
//! which activates the plan window. Feedback is write-once and doubles as
//! the approval -- there is no separate "approved, awaiting feedback"
//! state.

use chrono::{DateTime, Utc};

use prepflow_types::error::WorkflowError;
use prepflow_types::event::WorkflowEvent;
use prepflow_types::ids::{FeedbackId, ParticipantId, StaffId, StudyPlanId};
use prepflow_types::plan::{Feedback, PlanStatus, StudyPlan, SubmitPlanRequest};
use prepflow_types::skill::{SkillId, SkillReconciliation};

use crate::catalog::{CatalogError, SkillCatalog};
use crate::eligibility;
use crate::event::EventBus;
use crate::reconcile;
use crate::repository::plan::PlanRepository;
use crate::repository::score::ScoreRepository;

/// Service owning study-plan submissions, skill requests, and the feedback
/// sub-flow.
pub struct StudyPlanService<P: PlanRepository, S: ScoreRepository, C: SkillCatalog> {
    plans: P,
    scores: S,
    catalog: C,
    events: EventBus,
}

impl<P: PlanRepository, S: ScoreRepository, C: SkillCatalog> StudyPlanService<P, S, C> {
    pub fn new(plans: P, scores: S, catalog: C, events: EventBus) -> Self {
        Self {
            plans,
            scores,
            catalog,
            events,
        }
    }

    async fn resolve_skills(&self, ids: &[SkillId]) -> Result<(), WorkflowError> {
        match self.catalog.resolve(ids).await {
            Ok(_) => Ok(()),
            Err(CatalogError::Unresolved(missing)) => Err(WorkflowError::Validation(format!(
                "unknown skill ids: {}",
                missing
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
            Err(CatalogError::Storage(msg)) => Err(WorkflowError::Storage(msg)),
        }
    }

    /// Submit a study plan.
    ///
    /// Preconditions, checked in order: the eligibility gate (a currently
    /// valid approved score), a non-empty skill set that fully resolves in
    /// the catalog, and no existing active plan. The plan snapshots the
    /// current approved score id; that snapshot is never re-validated.
    pub async fn submit(
        &self,
        request: SubmitPlanRequest,
        now: DateTime<Utc>,
    ) -> Result<StudyPlan, WorkflowError> {
        let current_score = self
            .scores
            .latest_valid_approved(&request.participant_id, now)
            .await?;
        eligibility::may_submit_plan(current_score.as_ref(), now).check()?;
        // The gate passed, so the snapshot source is present.
        let source = current_score.ok_or(WorkflowError::NotFound("score submission"))?;

        if request.skill_ids.is_empty() {
            return Err(WorkflowError::Validation(
                "at least one skill must be requested".to_string(),
            ));
        }
        self.resolve_skills(&request.skill_ids).await?;

        if !(1..=7).contains(&request.weekly_frequency) {
            return Err(WorkflowError::Validation(
                "weekly frequency must be between 1 and 7".to_string(),
            ));
        }

        if self
            .plans
            .get_active(&request.participant_id)
            .await?
            .is_some()
        {
            return Err(WorkflowError::Conflict("active plan exists".to_string()));
        }

        let plan = StudyPlan {
            id: StudyPlanId::new(),
            participant_id: request.participant_id,
            source_score_id: source.id,
            target_score: request.target_score,
            target_duration: request.target_duration,
            weekly_frequency: request.weekly_frequency,
            daily_duration: request.daily_duration,
            submitted_at: now,
            status: PlanStatus::Pending,
            start_date: None,
            end_date: None,
            is_active: true,
            rejection_remark: None,
        };

        // The insert transaction re-enforces the one-active-plan invariant
        // via the partial unique index; a concurrent submit loses here.
        let plan = self.plans.create(&plan, &request.skill_ids).await?;

        tracing::info!(
            plan_id = %plan.id,
            participant_id = %plan.participant_id,
            skills = request.skill_ids.len(),
            "study plan submitted"
        );

        self.events.publish(WorkflowEvent::PlanSubmitted {
            plan_id: plan.id,
            participant_id: plan.participant_id,
        });

        Ok(plan)
    }

    /// Reject a pending plan with a remark.
    pub async fn reject(
        &self,
        plan_id: &StudyPlanId,
        remark: &str,
    ) -> Result<StudyPlan, WorkflowError> {
        if remark.trim().is_empty() {
            return Err(WorkflowError::Validation(
                "rejection remark cannot be empty".to_string(),
            ));
        }

        let mut plan = self
            .plans
            .get(plan_id)
            .await?
            .ok_or(WorkflowError::NotFound("study plan"))?;

        if plan.status != PlanStatus::Pending {
            return Err(WorkflowError::InvalidState(format!(
                "plan is {}, only pending plans can be rejected",
                plan.status
            )));
        }

        plan.status = PlanStatus::Rejected;
        plan.is_active = false;
        plan.rejection_remark = Some(remark.trim().to_string());

        let plan = self
            .plans
            .update_status(&plan, PlanStatus::Pending)
            .await
            .map_err(|e| match e {
                prepflow_types::error::RepositoryError::Conflict(_) => {
                    WorkflowError::InvalidState("plan was decided concurrently".to_string())
                }
                other => other.into(),
            })?;

        tracing::info!(plan_id = %plan.id, "study plan rejected");

        self.events.publish(WorkflowEvent::PlanRejected {
            plan_id: plan.id,
            participant_id: plan.participant_id,
        });

        Ok(plan)
    }

    /// Give feedback on a pending plan, activating its window.
    ///
    /// Creates exactly one feedback row plus its skill-grant edges, sets
    /// the plan to FeedbackGiven, and fixes `start_date = now`,
    /// `end_date = start_date + target duration`. Feedback is write-once:
    /// a second call fails with `InvalidState`. Granted skills need not be
    /// a subset of the requested set, but every id must resolve in the
    /// catalog.
    pub async fn give_feedback(
        &self,
        plan_id: &StudyPlanId,
        staff_id: &StaffId,
        granted_skill_ids: &[SkillId],
        now: DateTime<Utc>,
    ) -> Result<Feedback, WorkflowError> {
        let mut plan = self
            .plans
            .get(plan_id)
            .await?
            .ok_or(WorkflowError::NotFound("study plan"))?;

        if plan.status != PlanStatus::Pending {
            return Err(WorkflowError::InvalidState(format!(
                "plan is {}, only pending plans can receive feedback",
                plan.status
            )));
        }
        if self.plans.get_feedback(plan_id).await?.is_some() {
            return Err(WorkflowError::InvalidState(
                "feedback already given for this plan".to_string(),
            ));
        }

        if granted_skill_ids.is_empty() {
            return Err(WorkflowError::Validation(
                "at least one skill must be granted".to_string(),
            ));
        }
        self.resolve_skills(granted_skill_ids).await?;

        plan.status = PlanStatus::FeedbackGiven;
        plan.start_date = Some(now);
        plan.end_date = Some(plan.target_duration.end_date_from(now));

        let feedback = Feedback {
            id: FeedbackId::new(),
            plan_id: plan.id,
            staff_id: *staff_id,
            given_at: now,
        };

        let feedback = self
            .plans
            .record_feedback(&plan, &feedback, granted_skill_ids)
            .await
            .map_err(|e| match e {
                prepflow_types::error::RepositoryError::Conflict(_) => {
                    WorkflowError::InvalidState(
                        "feedback already given for this plan".to_string(),
                    )
                }
                other => other.into(),
            })?;

        tracing::info!(
            plan_id = %plan.id,
            staff_id = %staff_id,
            grants = granted_skill_ids.len(),
            "feedback given"
        );

        self.events.publish(WorkflowEvent::FeedbackGiven {
            plan_id: plan.id,
            participant_id: plan.participant_id,
            staff_id: *staff_id,
        });

        Ok(feedback)
    }

    /// Move a FeedbackGiven plan to Completed once its end date has
    /// passed. Idempotent: calling it on an already-Completed plan is a
    /// no-op, not an error.
    pub async fn mark_completed(
        &self,
        plan_id: &StudyPlanId,
        now: DateTime<Utc>,
    ) -> Result<StudyPlan, WorkflowError> {
        let mut plan = self
            .plans
            .get(plan_id)
            .await?
            .ok_or(WorkflowError::NotFound("study plan"))?;

        match plan.status {
            PlanStatus::Completed => return Ok(plan),
            PlanStatus::FeedbackGiven => {}
            other => {
                return Err(WorkflowError::InvalidState(format!(
                    "plan is {other}, only feedback_given plans can be completed"
                )));
            }
        }

        let end_date = plan
            .end_date
            .ok_or_else(|| WorkflowError::Storage("feedback_given plan missing end date".into()))?;
        if end_date > now {
            return Err(WorkflowError::InvalidState(
                "plan end date has not passed".to_string(),
            ));
        }

        plan.status = PlanStatus::Completed;
        plan.is_active = false;

        let plan = match self.plans.update_status(&plan, PlanStatus::FeedbackGiven).await {
            Ok(plan) => plan,
            // Lost a race against a concurrent transition: when the other
            // caller was also a completion, the requested outcome already
            // holds and this stays a no-op.
            Err(prepflow_types::error::RepositoryError::Conflict(_)) => {
                let stored = self
                    .plans
                    .get(plan_id)
                    .await?
                    .ok_or(WorkflowError::NotFound("study plan"))?;
                if stored.status == PlanStatus::Completed {
                    return Ok(stored);
                }
                return Err(WorkflowError::InvalidState(format!(
                    "plan is {}, only feedback_given plans can be completed",
                    stored.status
                )));
            }
            Err(other) => return Err(other.into()),
        };

        tracing::info!(plan_id = %plan.id, "study plan completed");

        self.events.publish(WorkflowEvent::PlanCompleted {
            plan_id: plan.id,
            participant_id: plan.participant_id,
        });

        Ok(plan)
    }

    /// The participant's active plan, if any.
    pub async fn get_active(
        &self,
        participant_id: &ParticipantId,
    ) -> Result<Option<StudyPlan>, WorkflowError> {
        Ok(self.plans.get_active(participant_id).await?)
    }

    /// Plan history for a participant, newest first.
    pub async fn list_for_participant(
        &self,
        participant_id: &ParticipantId,
    ) -> Result<Vec<StudyPlan>, WorkflowError> {
        Ok(self.plans.list_for_participant(participant_id).await?)
    }

    /// Fetch a plan by id.
    pub async fn get(&self, plan_id: &StudyPlanId) -> Result<StudyPlan, WorkflowError> {
        self.plans
            .get(plan_id)
            .await?
            .ok_or(WorkflowError::NotFound("study plan"))
    }

    /// Reconcile the plan's requested skills against its granted skills
    /// (empty grant set when no feedback exists yet). Pure read; grouped by
    /// catalog category, order-stable.
    pub async fn reconciliation(
        &self,
        plan_id: &StudyPlanId,
    ) -> Result<SkillReconciliation, WorkflowError> {
        let plan = self
            .plans
            .get(plan_id)
            .await?
            .ok_or(WorkflowError::NotFound("study plan"))?;

        let requested_ids = self.plans.skill_requests(&plan.id).await?;
        let granted_ids = match self.plans.get_feedback(&plan.id).await? {
            Some(feedback) => self.plans.skill_grants(&feedback.id).await?,
            None => Vec::new(),
        };

        let requested = self
            .catalog
            .resolve(&requested_ids)
            .await
            .map_err(|e| WorkflowError::Storage(e.to_string()))?;
        let granted = self
            .catalog
            .resolve(&granted_ids)
            .await
            .map_err(|e| WorkflowError::Storage(e.to_string()))?;

        Ok(reconcile::reconcile(&requested, &granted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Duration;
    use prepflow_types::error::RepositoryError;
    use prepflow_types::ids::ScoreSubmissionId;
    use prepflow_types::plan::{DailyDuration, TargetDuration};
    use prepflow_types::score::ScoreSubmission;
    use prepflow_types::skill::Skill;

    fn feedback_given_plan(now: DateTime<Utc>) -> StudyPlan {
        StudyPlan {
            id: StudyPlanId::new(),
            participant_id: ParticipantId::new(),
            source_score_id: ScoreSubmissionId::new(),
            target_score: 550,
            target_duration: TargetDuration::ThreeMonths,
            weekly_frequency: 4,
            daily_duration: DailyDuration::OneToTwoHours,
            submitted_at: now - Duration::days(100),
            status: PlanStatus::FeedbackGiven,
            start_date: Some(now - Duration::days(95)),
            end_date: Some(now - Duration::days(1)),
            is_active: true,
            rejection_remark: None,
        }
    }

    /// Plan repo where the guarded completion write always loses its race:
    /// the first read sees FeedbackGiven, the write conflicts, and the
    /// re-read sees Completed.
    struct RacedPlanRepo {
        plan: StudyPlan,
        reads: AtomicUsize,
    }

    impl PlanRepository for RacedPlanRepo {
        async fn create(
            &self,
            _plan: &StudyPlan,
            _skill_ids: &[SkillId],
        ) -> Result<StudyPlan, RepositoryError> {
            unreachable!()
        }

        async fn get(&self, _id: &StudyPlanId) -> Result<Option<StudyPlan>, RepositoryError> {
            let mut plan = self.plan.clone();
            if self.reads.fetch_add(1, Ordering::SeqCst) > 0 {
                plan.status = PlanStatus::Completed;
                plan.is_active = false;
            }
            Ok(Some(plan))
        }

        async fn get_active(
            &self,
            _participant_id: &ParticipantId,
        ) -> Result<Option<StudyPlan>, RepositoryError> {
            unreachable!()
        }

        async fn list_for_participant(
            &self,
            _participant_id: &ParticipantId,
        ) -> Result<Vec<StudyPlan>, RepositoryError> {
            unreachable!()
        }

        async fn update_status(
            &self,
            _plan: &StudyPlan,
            _expected: PlanStatus,
        ) -> Result<StudyPlan, RepositoryError> {
            Err(RepositoryError::Conflict("plan is completed".to_string()))
        }

        async fn record_feedback(
            &self,
            _plan: &StudyPlan,
            _feedback: &Feedback,
            _granted_skill_ids: &[SkillId],
        ) -> Result<Feedback, RepositoryError> {
            unreachable!()
        }

        async fn skill_requests(
            &self,
            _plan_id: &StudyPlanId,
        ) -> Result<Vec<SkillId>, RepositoryError> {
            unreachable!()
        }

        async fn get_feedback(
            &self,
            _plan_id: &StudyPlanId,
        ) -> Result<Option<Feedback>, RepositoryError> {
            unreachable!()
        }

        async fn skill_grants(
            &self,
            _feedback_id: &FeedbackId,
        ) -> Result<Vec<SkillId>, RepositoryError> {
            unreachable!()
        }
    }

    struct NoScores;

    impl ScoreRepository for NoScores {
        async fn create(
            &self,
            _submission: &ScoreSubmission,
        ) -> Result<ScoreSubmission, RepositoryError> {
            unreachable!()
        }

        async fn get(
            &self,
            _id: &ScoreSubmissionId,
        ) -> Result<Option<ScoreSubmission>, RepositoryError> {
            unreachable!()
        }

        async fn list_for_participant(
            &self,
            _participant_id: &ParticipantId,
        ) -> Result<Vec<ScoreSubmission>, RepositoryError> {
            unreachable!()
        }

        async fn latest_valid_approved(
            &self,
            _participant_id: &ParticipantId,
            _now: DateTime<Utc>,
        ) -> Result<Option<ScoreSubmission>, RepositoryError> {
            unreachable!()
        }

        async fn decide(
            &self,
            _submission: &ScoreSubmission,
        ) -> Result<ScoreSubmission, RepositoryError> {
            unreachable!()
        }
    }

    struct EmptyCatalog;

    impl SkillCatalog for EmptyCatalog {
        async fn resolve(&self, _ids: &[SkillId]) -> Result<Vec<Skill>, CatalogError> {
            Ok(Vec::new())
        }

        async fn list_all(&self) -> Result<Vec<Skill>, CatalogError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn losing_a_completion_race_is_a_no_op() {
        let now = Utc::now();
        let plan = feedback_given_plan(now);
        let plan_id = plan.id;
        let service = StudyPlanService::new(
            RacedPlanRepo {
                plan,
                reads: AtomicUsize::new(0),
            },
            NoScores,
            EmptyCatalog,
            EventBus::new(4),
        );

        let completed = service.mark_completed(&plan_id, now).await.unwrap();
        assert_eq!(completed.status, PlanStatus::Completed);
        assert!(!completed.is_active);
    }
}
