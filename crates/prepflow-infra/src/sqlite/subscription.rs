//! SQLite subscription window store.
//!
//! Windows are appended inside a writer transaction so concurrent approvals
//! chain correctly: each new window reads the latest end before choosing its
//! own start.

use chrono::{DateTime, Months, Utc};
use uuid::Uuid;

use prepflow_core::subscription::SubscriptionWindows;
use prepflow_types::billing::SubscriptionWindow;
use prepflow_types::error::RepositoryError;
use prepflow_types::ids::{PackageId, ParticipantId};

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime};

/// SQLite-backed implementation of `SubscriptionWindows`.
pub struct SqliteSubscriptionWindows {
    pool: DatabasePool,
}

impl SqliteSubscriptionWindows {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn row_to_window(
    (participant_id, package_id, starts_at, ends_at): &(String, String, String, String),
) -> Result<SubscriptionWindow, RepositoryError> {
    Ok(SubscriptionWindow {
        participant_id: participant_id
            .parse::<ParticipantId>()
            .map_err(|e| RepositoryError::Query(format!("invalid participant id: {e}")))?,
        package_id: package_id
            .parse::<PackageId>()
            .map_err(|e| RepositoryError::Query(format!("invalid package id: {e}")))?,
        starts_at: parse_datetime(starts_at)?,
        ends_at: parse_datetime(ends_at)?,
    })
}

impl SubscriptionWindows for SqliteSubscriptionWindows {
    async fn extend_or_create(
        &self,
        participant_id: &ParticipantId,
        package_id: &PackageId,
        months: u32,
        at: DateTime<Utc>,
    ) -> Result<SubscriptionWindow, RepositoryError> {
        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let latest: Option<(String,)> = sqlx::query_as(
            "SELECT ends_at FROM subscription_windows WHERE participant_id = ?
             ORDER BY ends_at DESC LIMIT 1",
        )
        .bind(participant_id.to_string())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        // An open window pushes the new one to start where it ends.
        let starts_at = match latest {
            Some((ends,)) => {
                let ends = parse_datetime(&ends)?;
                if ends > at { ends } else { at }
            }
            None => at,
        };
        let ends_at = starts_at + Months::new(months);

        sqlx::query(
            "INSERT INTO subscription_windows (id, participant_id, package_id, starts_at, ends_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(Uuid::now_v7().to_string())
        .bind(participant_id.to_string())
        .bind(package_id.to_string())
        .bind(format_datetime(&starts_at))
        .bind(format_datetime(&ends_at))
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(SubscriptionWindow {
            participant_id: *participant_id,
            package_id: *package_id,
            starts_at,
            ends_at,
        })
    }

    async fn latest_for(
        &self,
        participant_id: &ParticipantId,
    ) -> Result<Option<SubscriptionWindow>, RepositoryError> {
        let row: Option<(String, String, String, String)> = sqlx::query_as(
            "SELECT participant_id, package_id, starts_at, ends_at FROM subscription_windows
             WHERE participant_id = ? ORDER BY ends_at DESC LIMIT 1",
        )
        .bind(participant_id.to_string())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.as_ref().map(row_to_window).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use prepflow_core::repository::package::PackageRepository;
    use prepflow_types::billing::{Facility, Package};

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

    #[tokio::test]
    async fn test_first_window_starts_at_approval() {
        let pool = test_pool().await;
        let package = seed_package(&pool).await;
        let windows = SqliteSubscriptionWindows::new(pool);
        let participant = ParticipantId::new();
        let now = Utc::now();

        let window = windows
            .extend_or_create(&participant, &package, 3, now)
            .await
            .unwrap();
        assert_eq!(window.starts_at, now);
        assert_eq!(window.ends_at, now + Months::new(3));
    }

    #[tokio::test]
    async fn test_open_window_extends_from_its_end() {
        let pool = test_pool().await;
        let package = seed_package(&pool).await;
        let windows = SqliteSubscriptionWindows::new(pool);
        let participant = ParticipantId::new();
        let now = Utc::now();

        let first = windows
            .extend_or_create(&participant, &package, 3, now)
            .await
            .unwrap();
        let second = windows
            .extend_or_create(&participant, &package, 1, now)
            .await
            .unwrap();

        assert_eq!(second.starts_at, first.ends_at);
        assert_eq!(second.ends_at, first.ends_at + Months::new(1));

        let latest = windows.latest_for(&participant).await.unwrap().unwrap();
        assert_eq!(latest.ends_at, second.ends_at);
    }

    #[tokio::test]
    async fn test_lapsed_window_starts_fresh() {
        let pool = test_pool().await;
        let package = seed_package(&pool).await;
        let windows = SqliteSubscriptionWindows::new(pool);
        let participant = ParticipantId::new();
        let past = Utc::now() - Months::new(6);

        windows
            .extend_or_create(&participant, &package, 1, past)
            .await
            .unwrap();

        let now = Utc::now();
        let fresh = windows
            .extend_or_create(&participant, &package, 3, now)
            .await
            .unwrap();
        assert_eq!(fresh.starts_at, now);
    }

    #[tokio::test]
    async fn test_latest_for_unknown_participant() {
        let pool = test_pool().await;
        let windows = SqliteSubscriptionWindows::new(pool);
        assert!(windows
            .latest_for(&ParticipantId::new())
            .await
            .unwrap()
            .is_none());
    }
}
