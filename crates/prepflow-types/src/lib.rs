//! Shared domain types for Prepflow.
//!
//! This crate contains the core domain types used across the Prepflow
//! platform: score submissions, study plans, skills, packages, transactions,
//! and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod billing;
pub mod error;
pub mod event;
pub mod ids;
pub mod plan;
pub mod score;
pub mod skill;
