//! SQLite implementations of the prepflow-core repository traits.

pub mod package;
pub mod plan;
pub mod pool;
pub mod score;
pub mod skill_catalog;
pub mod subscription;
pub mod transaction;

use chrono::{DateTime, Utc};
use prepflow_types::error::RepositoryError;

/// Parse an RFC 3339 datetime column.
pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

/// Format a datetime for storage.
pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}
