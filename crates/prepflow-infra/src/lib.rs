//! Infrastructure implementations for Prepflow.
//!
//! SQLite repositories (via sqlx with split read/write pools), the
//! filesystem document store, and the toml config loader. Everything here
//! implements a trait from prepflow-core.

pub mod config;
pub mod sqlite;
pub mod storage;
