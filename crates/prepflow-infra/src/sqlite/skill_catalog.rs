//! SQLite skill catalog adapter.
//!
//! The skills table is reference data seeded out of band. Resolution fails
//! closed: every requested id must exist or the whole call errors with the
//! full list of unknowns.

use std::collections::BTreeSet;

use prepflow_core::catalog::{CatalogError, SkillCatalog};
use prepflow_types::skill::{Skill, SkillId};

use super::pool::DatabasePool;

/// SQLite-backed implementation of `SkillCatalog`.
pub struct SqliteSkillCatalog {
    pool: DatabasePool,
}

impl SqliteSkillCatalog {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Insert catalog entries, ignoring ids that already exist. Used by the
    /// CLI seed command and tests.
    pub async fn seed(&self, skills: &[Skill]) -> Result<(), CatalogError> {
        for skill in skills {
            sqlx::query("INSERT OR IGNORE INTO skills (id, category, label) VALUES (?, ?, ?)")
                .bind(skill.id.as_str())
                .bind(&skill.category)
                .bind(&skill.label)
                .execute(&self.pool.writer)
                .await
                .map_err(|e| CatalogError::Storage(e.to_string()))?;
        }
        Ok(())
    }
}

impl SkillCatalog for SqliteSkillCatalog {
    async fn resolve(&self, ids: &[SkillId]) -> Result<Vec<Skill>, CatalogError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT id, category, label FROM skills WHERE id IN ({placeholders}) ORDER BY category, id"
        );
        let mut query = sqlx::query_as::<_, (String, String, String)>(&sql);
        for id in ids {
            query = query.bind(id.as_str());
        }
        let rows = query
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| CatalogError::Storage(e.to_string()))?;

        let found: BTreeSet<&str> = rows.iter().map(|(id, _, _)| id.as_str()).collect();
        let missing: Vec<SkillId> = ids
            .iter()
            .filter(|id| !found.contains(id.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(CatalogError::Unresolved(missing));
        }

        Ok(rows
            .into_iter()
            .map(|(id, category, label)| Skill {
                id: SkillId(id),
                category,
                label,
            })
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<Skill>, CatalogError> {
        let rows: Vec<(String, String, String)> =
            sqlx::query_as("SELECT id, category, label FROM skills ORDER BY category, id")
                .fetch_all(&self.pool.reader)
                .await
                .map_err(|e| CatalogError::Storage(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(id, category, label)| Skill {
                id: SkillId(id),
                category,
                label,
            })
            .collect())
    }
}
