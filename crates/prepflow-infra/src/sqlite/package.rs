//! SQLite package catalog repository implementation.

use prepflow_core::repository::package::PackageRepository;
use prepflow_types::billing::{Facility, Package};
use prepflow_types::error::RepositoryError;
use prepflow_types::ids::PackageId;
use sqlx::Row;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime};

/// SQLite-backed implementation of `PackageRepository`.
///
/// Facilities are stored as a JSON array in a TEXT column.
pub struct SqlitePackageRepository {
    pool: DatabasePool,
}

impl SqlitePackageRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn row_to_package(row: &sqlx::sqlite::SqliteRow) -> Result<Package, RepositoryError> {
    let id: String = row
        .try_get("id")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let name: String = row
        .try_get("name")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let price: i64 = row
        .try_get("price")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let validity_months: i64 = row
        .try_get("validity_months")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let facilities_json: String = row
        .try_get("facilities")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let active: bool = row
        .try_get("active")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let created_at: String = row
        .try_get("created_at")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let updated_at: String = row
        .try_get("updated_at")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

    let facilities: Vec<Facility> = serde_json::from_str(&facilities_json)
        .map_err(|e| RepositoryError::Query(format!("invalid facilities column: {e}")))?;

    Ok(Package {
        id: id
            .parse::<PackageId>()
            .map_err(|e| RepositoryError::Query(format!("invalid package id: {e}")))?,
        name,
        price,
        validity_months: validity_months as u32,
        facilities,
        active,
        created_at: parse_datetime(&created_at)?,
        updated_at: parse_datetime(&updated_at)?,
    })
}

fn facilities_json(facilities: &[Facility]) -> Result<String, RepositoryError> {
    serde_json::to_string(facilities)
        .map_err(|e| RepositoryError::Query(format!("serialize facilities: {e}")))
}

impl PackageRepository for SqlitePackageRepository {
    async fn create(&self, package: &Package) -> Result<Package, RepositoryError> {
        sqlx::query(
            "INSERT INTO packages (id, name, price, validity_months, facilities, active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(package.id.to_string())
        .bind(&package.name)
        .bind(package.price)
        .bind(package.validity_months as i64)
        .bind(facilities_json(&package.facilities)?)
        .bind(package.active)
        .bind(format_datetime(&package.created_at))
        .bind(format_datetime(&package.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(package.clone())
    }

    async fn get(&self, id: &PackageId) -> Result<Option<Package>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM packages WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.as_ref().map(row_to_package).transpose()
    }

    async fn list(&self, active_only: bool) -> Result<Vec<Package>, RepositoryError> {
        let sql = if active_only {
            "SELECT * FROM packages WHERE active = 1 ORDER BY price"
        } else {
            "SELECT * FROM packages ORDER BY price"
        };
        let rows = sqlx::query(sql)
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter().map(row_to_package).collect()
    }

    async fn update(&self, package: &Package) -> Result<Package, RepositoryError> {
        // validity_months is deliberately absent from the SET list.
        let result = sqlx::query(
            "UPDATE packages SET name = ?, price = ?, facilities = ?, active = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&package.name)
        .bind(package.price)
        .bind(facilities_json(&package.facilities)?)
        .bind(package.active)
        .bind(format_datetime(&package.updated_at))
        .bind(package.id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(package.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        std::mem::forget(dir);
        DatabasePool::new(&url).await.unwrap()
    }

    fn make_package(name: &str, price: i64, active: bool) -> Package {
        let now = Utc::now();
        Package {
            id: PackageId::new(),
            name: name.to_string(),
            price,
            validity_months: 3,
            facilities: vec![Facility::GroupClass, Facility::MockTest],
            active,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let pool = test_pool().await;
        let repo = SqlitePackageRepository::new(pool);
        let package = make_package("Intensive", 250_000, true);

        repo.create(&package).await.unwrap();

        let found = repo.get(&package.id).await.unwrap().unwrap();
        assert_eq!(found.name, "Intensive");
        assert_eq!(found.facilities, package.facilities);
        assert_eq!(found.validity_months, 3);
    }

    #[tokio::test]
    async fn test_list_active_only() {
        let pool = test_pool().await;
        let repo = SqlitePackageRepository::new(pool);
        repo.create(&make_package("Basic", 100_000, true)).await.unwrap();
        repo.create(&make_package("Retired", 50_000, false)).await.unwrap();

        let active = repo.list(true).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "Basic");

        let all = repo.list(false).await.unwrap();
        assert_eq!(all.len(), 2);
        // Sorted by price.
        assert_eq!(all[0].name, "Retired");
    }

    #[tokio::test]
    async fn test_update_leaves_validity_untouched() {
        let pool = test_pool().await;
        let repo = SqlitePackageRepository::new(pool);
        let mut package = make_package("Basic", 100_000, true);
        repo.create(&package).await.unwrap();

        package.price = 120_000;
        package.validity_months = 12; // must not be persisted
        repo.update(&package).await.unwrap();

        let found = repo.get(&package.id).await.unwrap().unwrap();
        assert_eq!(found.price, 120_000);
        assert_eq!(found.validity_months, 3);
    }

    #[tokio::test]
    async fn test_update_missing_package() {
        let pool = test_pool().await;
        let repo = SqlitePackageRepository::new(pool);
        let err = repo.update(&make_package("Ghost", 1, true)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }
}
