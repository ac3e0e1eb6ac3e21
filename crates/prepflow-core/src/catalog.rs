//! Skill catalog adapter trait.
//!
//! The catalog is external reference data consumed, not owned, by the
//! workflow core. Resolution fails closed: an id the catalog does not know
//! is an error, never silently ignored.

use thiserror::Error;

use prepflow_types::skill::{Skill, SkillId};

/// Errors from catalog lookups.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// One or more requested ids do not exist in the catalog.
    #[error("unresolved skill ids: {}", .0.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", "))]
    Unresolved(Vec<SkillId>),

    #[error("catalog storage error: {0}")]
    Storage(String),
}

/// Read-only lookup of valid skill identifiers grouped by category.
pub trait SkillCatalog: Send + Sync {
    /// Resolve every id to its catalog record. Any unresolved id fails the
    /// whole call with [`CatalogError::Unresolved`].
    fn resolve(
        &self,
        ids: &[SkillId],
    ) -> impl std::future::Future<Output = Result<Vec<Skill>, CatalogError>> + Send;

    /// The full catalog, sorted by category then id.
    fn list_all(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Skill>, CatalogError>> + Send;
}
