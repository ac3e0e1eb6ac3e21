//! SQLite purchase transaction repository implementation.
//!
//! `decide` uses the same guarded-transition shape as the score repository:
//! a writer transaction re-reads the stored status before applying the
//! UPDATE, so a transaction that has already been decided can never be
//! decided again.

use prepflow_core::repository::transaction::TransactionRepository;
use prepflow_types::billing::{Transaction, TransactionStatus};
use prepflow_types::error::RepositoryError;
use prepflow_types::ids::{PackageId, ParticipantId, TransactionId};
use sqlx::Row;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime};

/// SQLite-backed implementation of `TransactionRepository`.
pub struct SqliteTransactionRepository {
    pool: DatabasePool,
}

impl SqliteTransactionRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn row_to_transaction(row: &sqlx::sqlite::SqliteRow) -> Result<Transaction, RepositoryError> {
    let id: String = row
        .try_get("id")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let code: String = row
        .try_get("code")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let participant_id: String = row
        .try_get("participant_id")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let package_id: String = row
        .try_get("package_id")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let amount: i64 = row
        .try_get("amount")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let status: String = row
        .try_get("status")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let proof_ref: String = row
        .try_get("proof_ref")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let decision_remark: Option<String> = row
        .try_get("decision_remark")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let created_at: String = row
        .try_get("created_at")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let decided_at: Option<String> = row
        .try_get("decided_at")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

    Ok(Transaction {
        id: id
            .parse::<TransactionId>()
            .map_err(|e| RepositoryError::Query(format!("invalid transaction id: {e}")))?,
        code,
        participant_id: participant_id
            .parse::<ParticipantId>()
            .map_err(|e| RepositoryError::Query(format!("invalid participant id: {e}")))?,
        package_id: package_id
            .parse::<PackageId>()
            .map_err(|e| RepositoryError::Query(format!("invalid package id: {e}")))?,
        amount,
        status: status
            .parse::<TransactionStatus>()
            .map_err(RepositoryError::Query)?,
        proof_ref,
        decision_remark,
        created_at: parse_datetime(&created_at)?,
        decided_at: decided_at.as_deref().map(parse_datetime).transpose()?,
    })
}

impl TransactionRepository for SqliteTransactionRepository {
    async fn create(&self, transaction: &Transaction) -> Result<Transaction, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO transactions (id, code, participant_id, package_id, amount, status, proof_ref, decision_remark, created_at, decided_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(transaction.id.to_string())
        .bind(&transaction.code)
        .bind(transaction.participant_id.to_string())
        .bind(transaction.package_id.to_string())
        .bind(transaction.amount)
        .bind(transaction.status.to_string())
        .bind(&transaction.proof_ref)
        .bind(&transaction.decision_remark)
        .bind(format_datetime(&transaction.created_at))
        .bind(transaction.decided_at.as_ref().map(format_datetime))
        .execute(&self.pool.writer)
        .await;

        if let Err(sqlx::Error::Database(db_err)) = &result {
            if db_err.message().contains("UNIQUE") {
                return Err(RepositoryError::Conflict(
                    "transaction code already exists".to_string(),
                ));
            }
        }
        result.map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(transaction.clone())
    }

    async fn get(&self, id: &TransactionId) -> Result<Option<Transaction>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM transactions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.as_ref().map(row_to_transaction).transpose()
    }

    async fn list_for_participant(
        &self,
        participant_id: &ParticipantId,
    ) -> Result<Vec<Transaction>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM transactions WHERE participant_id = ? ORDER BY created_at DESC",
        )
        .bind(participant_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter().map(row_to_transaction).collect()
    }

    async fn decide(&self, transaction: &Transaction) -> Result<Transaction, RepositoryError> {
        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let current: Option<(String,)> =
            sqlx::query_as("SELECT status FROM transactions WHERE id = ?")
                .bind(transaction.id.to_string())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
        match current.as_ref().map(|(s,)| s.as_str()) {
            None => return Err(RepositoryError::NotFound),
            Some("pending") => {}
            Some(status) => {
                return Err(RepositoryError::Conflict(format!(
                    "transaction already {status}"
                )));
            }
        }

        sqlx::query(
            "UPDATE transactions SET status = ?, decision_remark = ?, decided_at = ?
             WHERE id = ? AND status = 'pending'",
        )
        .bind(transaction.status.to_string())
        .bind(&transaction.decision_remark)
        .bind(transaction.decided_at.as_ref().map(format_datetime))
        .bind(transaction.id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(transaction.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use prepflow_core::repository::package::PackageRepository;
    use prepflow_types::billing::{Facility, Package, generate_transaction_code};

    use crate::sqlite::package::SqlitePackageRepository;

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        std::mem::forget(dir);
        DatabasePool::new(&url).await.unwrap()
    }

    async fn seed_package(pool: &DatabasePool) -> PackageId {
        let now = Utc::now();
        let package = Package {
            id: PackageId::new(),
            name: "Intensive".to_string(),
            price: 250_000,
            validity_months: 3,
            facilities: vec![Facility::GroupClass],
            active: true,
            created_at: now,
            updated_at: now,
        };
        SqlitePackageRepository::new(pool.clone())
            .create(&package)
            .await
            .unwrap();
        package.id
    }

    fn make_transaction(participant: ParticipantId, package: PackageId) -> Transaction {
        Transaction {
            id: TransactionId::new(),
            code: generate_transaction_code(),
            participant_id: participant,
            package_id: package,
            amount: 250_000,
            status: TransactionStatus::Pending,
            proof_ref: "proof-ref".to_string(),
            decision_remark: None,
            created_at: Utc::now(),
            decided_at: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let pool = test_pool().await;
        let package = seed_package(&pool).await;
        let repo = SqliteTransactionRepository::new(pool);
        let transaction = make_transaction(ParticipantId::new(), package);

        repo.create(&transaction).await.unwrap();

        let found = repo.get(&transaction.id).await.unwrap().unwrap();
        assert_eq!(found.code, transaction.code);
        assert_eq!(found.status, TransactionStatus::Pending);
    }

    #[tokio::test]
    async fn test_duplicate_code_conflicts() {
        let pool = test_pool().await;
        let package = seed_package(&pool).await;
        let repo = SqliteTransactionRepository::new(pool);
        let first = make_transaction(ParticipantId::new(), package);
        repo.create(&first).await.unwrap();

        let mut second = make_transaction(ParticipantId::new(), package);
        second.code = first.code.clone();
        let err = repo.create(&second).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_decide_once() {
        let pool = test_pool().await;
        let package = seed_package(&pool).await;
        let repo = SqliteTransactionRepository::new(pool);
        let mut transaction = make_transaction(ParticipantId::new(), package);
        repo.create(&transaction).await.unwrap();

        transaction.status = TransactionStatus::Approved;
        transaction.decision_remark = Some("Payment verified".to_string());
        transaction.decided_at = Some(Utc::now());
        repo.decide(&transaction).await.unwrap();

        // The second decision loses the race in either direction.
        transaction.status = TransactionStatus::Rejected;
        let err = repo.decide(&transaction).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        let stored = repo.get(&transaction.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TransactionStatus::Approved);
        assert_eq!(stored.decision_remark.as_deref(), Some("Payment verified"));
    }

    #[tokio::test]
    async fn test_decide_missing_transaction() {
        let pool = test_pool().await;
        let package = seed_package(&pool).await;
        let repo = SqliteTransactionRepository::new(pool);
        let mut transaction = make_transaction(ParticipantId::new(), package);
        transaction.status = TransactionStatus::Approved;

        let err = repo.decide(&transaction).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let pool = test_pool().await;
        let package = seed_package(&pool).await;
        let repo = SqliteTransactionRepository::new(pool);
        let participant = ParticipantId::new();

        let mut first = make_transaction(participant, package);
        first.created_at = Utc::now() - chrono::Duration::hours(1);
        repo.create(&first).await.unwrap();
        let second = make_transaction(participant, package);
        repo.create(&second).await.unwrap();

        let listed = repo.list_for_participant(&participant).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
    }
}
