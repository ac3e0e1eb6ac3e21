//! SQLite score ledger repository implementation.
//!
//! Implements `ScoreRepository` from `prepflow-core` using sqlx with split
//! read/write pools. The decide transition re-reads the stored status
//! inside a writer transaction before updating, so two concurrent staff
//! decisions cannot both land.

use chrono::{DateTime, Utc};
use prepflow_core::repository::score::ScoreRepository;
use prepflow_types::error::RepositoryError;
use prepflow_types::ids::{ParticipantId, ScoreSubmissionId};
use prepflow_types::score::{ScoreStatus, ScoreSubmission};
use sqlx::Row;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime};

/// SQLite-backed implementation of `ScoreRepository`.
pub struct SqliteScoreRepository {
    pool: DatabasePool,
}

impl SqliteScoreRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to domain ScoreSubmission.
struct ScoreRow {
    id: String,
    participant_id: String,
    test_name: String,
    score: i32,
    document_ref: String,
    submitted_at: String,
    status: String,
    decided_at: Option<String>,
    valid_until: Option<String>,
    rejection_remark: Option<String>,
}

impl ScoreRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            participant_id: row.try_get("participant_id")?,
            test_name: row.try_get("test_name")?,
            score: row.try_get("score")?,
            document_ref: row.try_get("document_ref")?,
            submitted_at: row.try_get("submitted_at")?,
            status: row.try_get("status")?,
            decided_at: row.try_get("decided_at")?,
            valid_until: row.try_get("valid_until")?,
            rejection_remark: row.try_get("rejection_remark")?,
        })
    }

    fn into_submission(self) -> Result<ScoreSubmission, RepositoryError> {
        let id = self
            .id
            .parse::<ScoreSubmissionId>()
            .map_err(|e| RepositoryError::Query(format!("invalid submission id: {e}")))?;
        let participant_id = self
            .participant_id
            .parse::<ParticipantId>()
            .map_err(|e| RepositoryError::Query(format!("invalid participant id: {e}")))?;
        let status: ScoreStatus = self
            .status
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(ScoreSubmission {
            id,
            participant_id,
            test_name: self.test_name,
            score: self.score,
            document_ref: self.document_ref,
            submitted_at: parse_datetime(&self.submitted_at)?,
            status,
            decided_at: self.decided_at.as_deref().map(parse_datetime).transpose()?,
            valid_until: self.valid_until.as_deref().map(parse_datetime).transpose()?,
            rejection_remark: self.rejection_remark,
        })
    }
}

impl ScoreRepository for SqliteScoreRepository {
    async fn create(
        &self,
        submission: &ScoreSubmission,
    ) -> Result<ScoreSubmission, RepositoryError> {
        sqlx::query(
            "INSERT INTO score_submissions (id, participant_id, test_name, score, document_ref, submitted_at, status, decided_at, valid_until, rejection_remark)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(submission.id.to_string())
        .bind(submission.participant_id.to_string())
        .bind(&submission.test_name)
        .bind(submission.score)
        .bind(&submission.document_ref)
        .bind(format_datetime(&submission.submitted_at))
        .bind(submission.status.to_string())
        .bind(submission.decided_at.as_ref().map(format_datetime))
        .bind(submission.valid_until.as_ref().map(format_datetime))
        .bind(&submission.rejection_remark)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(submission.clone())
    }

    async fn get(
        &self,
        id: &ScoreSubmissionId,
    ) -> Result<Option<ScoreSubmission>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM score_submissions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let score_row =
                    ScoreRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(score_row.into_submission()?))
            }
            None => Ok(None),
        }
    }

    async fn list_for_participant(
        &self,
        participant_id: &ParticipantId,
    ) -> Result<Vec<ScoreSubmission>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM score_submissions WHERE participant_id = ? ORDER BY submitted_at DESC",
        )
        .bind(participant_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut submissions = Vec::with_capacity(rows.len());
        for row in &rows {
            let score_row =
                ScoreRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            submissions.push(score_row.into_submission()?);
        }
        Ok(submissions)
    }

    async fn latest_valid_approved(
        &self,
        participant_id: &ParticipantId,
        now: DateTime<Utc>,
    ) -> Result<Option<ScoreSubmission>, RepositoryError> {
        // Expiry is re-checked in Rust against the parsed datetime rather
        // than relying on string comparison of RFC 3339 columns.
        let rows = sqlx::query(
            "SELECT * FROM score_submissions
             WHERE participant_id = ? AND status = 'approved'
             ORDER BY decided_at DESC",
        )
        .bind(participant_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        for row in &rows {
            let submission = ScoreRow::from_row(row)
                .map_err(|e| RepositoryError::Query(e.to_string()))?
                .into_submission()?;
            if submission.is_valid_at(now) {
                return Ok(Some(submission));
            }
        }
        Ok(None)
    }

    async fn decide(
        &self,
        submission: &ScoreSubmission,
    ) -> Result<ScoreSubmission, RepositoryError> {
        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        // Re-read the stored status before writing.
        let current: Option<(String,)> =
            sqlx::query_as("SELECT status FROM score_submissions WHERE id = ?")
                .bind(submission.id.to_string())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match current.as_ref().map(|(s,)| s.as_str()) {
            None => return Err(RepositoryError::NotFound),
            Some("pending") => {}
            Some(status) => {
                return Err(RepositoryError::Conflict(format!(
                    "submission already {status}"
                )));
            }
        }

        sqlx::query(
            "UPDATE score_submissions
             SET status = ?, decided_at = ?, valid_until = ?, rejection_remark = ?
             WHERE id = ? AND status = 'pending'",
        )
        .bind(submission.status.to_string())
        .bind(submission.decided_at.as_ref().map(format_datetime))
        .bind(submission.valid_until.as_ref().map(format_datetime))
        .bind(&submission.rejection_remark)
        .bind(submission.id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(submission.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        // Leak tempdir so it lives for the test
        std::mem::forget(dir);
        DatabasePool::new(&url).await.unwrap()
    }

    fn make_submission(participant_id: ParticipantId, score: i32) -> ScoreSubmission {
        ScoreSubmission {
            id: ScoreSubmissionId::new(),
            participant_id,
            test_name: "TOEFL ITP".to_string(),
            score,
            document_ref: "doc-ref".to_string(),
            submitted_at: Utc::now(),
            status: ScoreStatus::Pending,
            decided_at: None,
            valid_until: None,
            rejection_remark: None,
        }
    }

    fn approve(mut s: ScoreSubmission, decided_at: DateTime<Utc>, valid_until: DateTime<Utc>) -> ScoreSubmission {
        s.status = ScoreStatus::Approved;
        s.decided_at = Some(decided_at);
        s.valid_until = Some(valid_until);
        s
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let pool = test_pool().await;
        let repo = SqliteScoreRepository::new(pool);
        let submission = make_submission(ParticipantId::new(), 520);

        repo.create(&submission).await.unwrap();

        let found = repo.get(&submission.id).await.unwrap().unwrap();
        assert_eq!(found.score, 520);
        assert_eq!(found.status, ScoreStatus::Pending);
    }

    #[tokio::test]
    async fn test_decide_then_redecide_conflicts() {
        let pool = test_pool().await;
        let repo = SqliteScoreRepository::new(pool);
        let participant = ParticipantId::new();
        let submission = make_submission(participant, 520);
        repo.create(&submission).await.unwrap();

        let now = Utc::now();
        let approved = approve(submission.clone(), now, now + Duration::days(180));
        repo.decide(&approved).await.unwrap();

        // Second decision in either direction must conflict.
        let mut rejected = submission.clone();
        rejected.status = ScoreStatus::Rejected;
        rejected.decided_at = Some(now);
        rejected.rejection_remark = Some("illegible".to_string());
        let err = repo.decide(&rejected).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        // And the stored record is unchanged by the losing attempt.
        let stored = repo.get(&submission.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ScoreStatus::Approved);
        assert!(stored.rejection_remark.is_none());
    }

    #[tokio::test]
    async fn test_decide_missing_submission() {
        let pool = test_pool().await;
        let repo = SqliteScoreRepository::new(pool);
        let submission = make_submission(ParticipantId::new(), 520);

        let err = repo.decide(&submission).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_latest_valid_approved_picks_latest_decision() {
        let pool = test_pool().await;
        let repo = SqliteScoreRepository::new(pool);
        let participant = ParticipantId::new();
        let now = Utc::now();

        let older = make_submission(participant, 500);
        repo.create(&older).await.unwrap();
        repo.decide(&approve(older.clone(), now - Duration::days(10), now + Duration::days(90)))
            .await
            .unwrap();

        let newer = make_submission(participant, 540);
        repo.create(&newer).await.unwrap();
        repo.decide(&approve(newer.clone(), now - Duration::days(1), now + Duration::days(90)))
            .await
            .unwrap();

        let current = repo
            .latest_valid_approved(&participant, now)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current.id, newer.id);
    }

    #[tokio::test]
    async fn test_latest_valid_approved_skips_expired() {
        let pool = test_pool().await;
        let repo = SqliteScoreRepository::new(pool);
        let participant = ParticipantId::new();
        let now = Utc::now();

        let expired = make_submission(participant, 520);
        repo.create(&expired).await.unwrap();
        repo.decide(&approve(expired.clone(), now - Duration::days(200), now - Duration::days(20)))
            .await
            .unwrap();

        assert!(repo
            .latest_valid_approved(&participant, now)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_multiple_pending_allowed() {
        let pool = test_pool().await;
        let repo = SqliteScoreRepository::new(pool);
        let participant = ParticipantId::new();

        repo.create(&make_submission(participant, 500)).await.unwrap();
        repo.create(&make_submission(participant, 510)).await.unwrap();

        let all = repo.list_for_participant(&participant).await.unwrap();
        assert_eq!(all.len(), 2);
    }
}
