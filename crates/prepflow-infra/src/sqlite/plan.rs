//! SQLite study plan repository implementation.
//!
//! Implements `PlanRepository` from `prepflow-core`. Every transition runs
//! inside a writer transaction that re-checks the stored status first. The
//! one-active-plan invariant is backed by the partial unique index
//! `idx_study_plans_one_active`; the feedback write-once invariant by the
//! UNIQUE constraint on `feedback.plan_id`.

use prepflow_core::repository::plan::PlanRepository;
use prepflow_types::error::RepositoryError;
use prepflow_types::ids::{FeedbackId, ParticipantId, ScoreSubmissionId, StaffId, StudyPlanId};
use prepflow_types::plan::{DailyDuration, Feedback, PlanStatus, StudyPlan, TargetDuration};
use prepflow_types::skill::SkillId;
use sqlx::Row;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime};

/// SQLite-backed implementation of `PlanRepository`.
pub struct SqlitePlanRepository {
    pool: DatabasePool,
}

impl SqlitePlanRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to domain StudyPlan.
struct PlanRow {
    id: String,
    participant_id: String,
    source_score_id: String,
    target_score: i32,
    target_duration: String,
    weekly_frequency: i32,
    daily_duration: String,
    submitted_at: String,
    status: String,
    start_date: Option<String>,
    end_date: Option<String>,
    is_active: bool,
    rejection_remark: Option<String>,
}

impl PlanRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            participant_id: row.try_get("participant_id")?,
            source_score_id: row.try_get("source_score_id")?,
            target_score: row.try_get("target_score")?,
            target_duration: row.try_get("target_duration")?,
            weekly_frequency: row.try_get("weekly_frequency")?,
            daily_duration: row.try_get("daily_duration")?,
            submitted_at: row.try_get("submitted_at")?,
            status: row.try_get("status")?,
            start_date: row.try_get("start_date")?,
            end_date: row.try_get("end_date")?,
            is_active: row.try_get("is_active")?,
            rejection_remark: row.try_get("rejection_remark")?,
        })
    }

    fn into_plan(self) -> Result<StudyPlan, RepositoryError> {
        let id = self
            .id
            .parse::<StudyPlanId>()
            .map_err(|e| RepositoryError::Query(format!("invalid plan id: {e}")))?;
        let participant_id = self
            .participant_id
            .parse::<ParticipantId>()
            .map_err(|e| RepositoryError::Query(format!("invalid participant id: {e}")))?;
        let source_score_id = self
            .source_score_id
            .parse::<ScoreSubmissionId>()
            .map_err(|e| RepositoryError::Query(format!("invalid source score id: {e}")))?;
        let status: PlanStatus = self
            .status
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;
        let target_duration: TargetDuration = self
            .target_duration
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;
        let daily_duration: DailyDuration = self
            .daily_duration
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(StudyPlan {
            id,
            participant_id,
            source_score_id,
            target_score: self.target_score,
            target_duration,
            weekly_frequency: self.weekly_frequency as u8,
            daily_duration,
            submitted_at: parse_datetime(&self.submitted_at)?,
            status,
            start_date: self.start_date.as_deref().map(parse_datetime).transpose()?,
            end_date: self.end_date.as_deref().map(parse_datetime).transpose()?,
            is_active: self.is_active,
            rejection_remark: self.rejection_remark,
        })
    }
}

fn row_to_plan(row: &sqlx::sqlite::SqliteRow) -> Result<StudyPlan, RepositoryError> {
    PlanRow::from_row(row)
        .map_err(|e| RepositoryError::Query(e.to_string()))?
        .into_plan()
}

fn bind_plan_update<'q>(
    query: &'q str,
    plan: &StudyPlan,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    sqlx::query(query)
        .bind(plan.status.to_string())
        .bind(plan.start_date.as_ref().map(format_datetime))
        .bind(plan.end_date.as_ref().map(format_datetime))
        .bind(plan.is_active)
        .bind(plan.rejection_remark.clone())
        .bind(plan.id.to_string())
}

const PLAN_UPDATE_SQL: &str = "UPDATE study_plans
     SET status = ?, start_date = ?, end_date = ?, is_active = ?, rejection_remark = ?
     WHERE id = ? AND status = ?";

impl PlanRepository for SqlitePlanRepository {
    async fn create(
        &self,
        plan: &StudyPlan,
        skill_ids: &[SkillId],
    ) -> Result<StudyPlan, RepositoryError> {
        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let result = sqlx::query(
            "INSERT INTO study_plans (id, participant_id, source_score_id, target_score, target_duration, weekly_frequency, daily_duration, submitted_at, status, start_date, end_date, is_active, rejection_remark)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(plan.id.to_string())
        .bind(plan.participant_id.to_string())
        .bind(plan.source_score_id.to_string())
        .bind(plan.target_score)
        .bind(plan.target_duration.to_string())
        .bind(plan.weekly_frequency as i32)
        .bind(plan.daily_duration.to_string())
        .bind(format_datetime(&plan.submitted_at))
        .bind(plan.status.to_string())
        .bind(plan.start_date.as_ref().map(format_datetime))
        .bind(plan.end_date.as_ref().map(format_datetime))
        .bind(plan.is_active)
        .bind(&plan.rejection_remark)
        .execute(&mut *tx)
        .await;

        if let Err(sqlx::Error::Database(db_err)) = &result {
            if db_err.message().contains("UNIQUE") {
                return Err(RepositoryError::Conflict("active plan exists".to_string()));
            }
        }
        result.map_err(|e| RepositoryError::Query(e.to_string()))?;

        for skill_id in skill_ids {
            sqlx::query("INSERT OR IGNORE INTO skill_requests (plan_id, skill_id) VALUES (?, ?)")
                .bind(plan.id.to_string())
                .bind(skill_id.as_str())
                .execute(&mut *tx)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(plan.clone())
    }

    async fn get(&self, id: &StudyPlanId) -> Result<Option<StudyPlan>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM study_plans WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.as_ref().map(row_to_plan).transpose()
    }

    async fn get_active(
        &self,
        participant_id: &ParticipantId,
    ) -> Result<Option<StudyPlan>, RepositoryError> {
        let row =
            sqlx::query("SELECT * FROM study_plans WHERE participant_id = ? AND is_active = 1")
                .bind(participant_id.to_string())
                .fetch_optional(&self.pool.reader)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.as_ref().map(row_to_plan).transpose()
    }

    async fn list_for_participant(
        &self,
        participant_id: &ParticipantId,
    ) -> Result<Vec<StudyPlan>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM study_plans WHERE participant_id = ? ORDER BY submitted_at DESC",
        )
        .bind(participant_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter().map(row_to_plan).collect()
    }

    async fn update_status(
        &self,
        plan: &StudyPlan,
        expected: PlanStatus,
    ) -> Result<StudyPlan, RepositoryError> {
        let result = bind_plan_update(PLAN_UPDATE_SQL, plan)
            .bind(expected.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            // Either the plan is gone or its status moved under us.
            let exists: Option<(String,)> =
                sqlx::query_as("SELECT status FROM study_plans WHERE id = ?")
                    .bind(plan.id.to_string())
                    .fetch_optional(&self.pool.reader)
                    .await
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
            return match exists {
                None => Err(RepositoryError::NotFound),
                Some((status,)) => Err(RepositoryError::Conflict(format!(
                    "plan is {status}, expected {expected}"
                ))),
            };
        }

        Ok(plan.clone())
    }

    async fn record_feedback(
        &self,
        plan: &StudyPlan,
        feedback: &Feedback,
        granted_skill_ids: &[SkillId],
    ) -> Result<Feedback, RepositoryError> {
        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        // Guard: the plan must still be pending.
        let current: Option<(String,)> =
            sqlx::query_as("SELECT status FROM study_plans WHERE id = ?")
                .bind(plan.id.to_string())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
        match current.as_ref().map(|(s,)| s.as_str()) {
            None => return Err(RepositoryError::NotFound),
            Some("pending") => {}
            Some(status) => {
                return Err(RepositoryError::Conflict(format!("plan is {status}")));
            }
        }

        let result = sqlx::query(
            "INSERT INTO feedback (id, plan_id, staff_id, given_at) VALUES (?, ?, ?, ?)",
        )
        .bind(feedback.id.to_string())
        .bind(feedback.plan_id.to_string())
        .bind(feedback.staff_id.to_string())
        .bind(format_datetime(&feedback.given_at))
        .execute(&mut *tx)
        .await;

        if let Err(sqlx::Error::Database(db_err)) = &result {
            if db_err.message().contains("UNIQUE") {
                return Err(RepositoryError::Conflict(
                    "feedback already exists for this plan".to_string(),
                ));
            }
        }
        result.map_err(|e| RepositoryError::Query(e.to_string()))?;

        for skill_id in granted_skill_ids {
            sqlx::query("INSERT OR IGNORE INTO skill_grants (feedback_id, skill_id) VALUES (?, ?)")
                .bind(feedback.id.to_string())
                .bind(skill_id.as_str())
                .execute(&mut *tx)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
        }

        bind_plan_update(PLAN_UPDATE_SQL, plan)
            .bind(PlanStatus::Pending.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(feedback.clone())
    }

    async fn skill_requests(
        &self,
        plan_id: &StudyPlanId,
    ) -> Result<Vec<SkillId>, RepositoryError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT skill_id FROM skill_requests WHERE plan_id = ? ORDER BY skill_id",
        )
        .bind(plan_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(rows.into_iter().map(|(id,)| SkillId(id)).collect())
    }

    async fn get_feedback(
        &self,
        plan_id: &StudyPlanId,
    ) -> Result<Option<Feedback>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM feedback WHERE plan_id = ?")
            .bind(plan_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let Some(row) = row else { return Ok(None) };

        let id: String = row
            .try_get("id")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let plan: String = row
            .try_get("plan_id")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let staff: String = row
            .try_get("staff_id")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let given_at: String = row
            .try_get("given_at")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(Some(Feedback {
            id: id
                .parse::<FeedbackId>()
                .map_err(|e| RepositoryError::Query(format!("invalid feedback id: {e}")))?,
            plan_id: plan
                .parse::<StudyPlanId>()
                .map_err(|e| RepositoryError::Query(format!("invalid plan id: {e}")))?,
            staff_id: staff
                .parse::<StaffId>()
                .map_err(|e| RepositoryError::Query(format!("invalid staff id: {e}")))?,
            given_at: parse_datetime(&given_at)?,
        }))
    }

    async fn skill_grants(
        &self,
        feedback_id: &FeedbackId,
    ) -> Result<Vec<SkillId>, RepositoryError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT skill_id FROM skill_grants WHERE feedback_id = ? ORDER BY skill_id",
        )
        .bind(feedback_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(rows.into_iter().map(|(id,)| SkillId(id)).collect())
    }
}
