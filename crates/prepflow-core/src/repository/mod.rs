//! Repository trait definitions (ports).
//!
//! These traits define the storage interface that the infrastructure layer
//! (prepflow-infra) implements. The core crate never depends on any
//! specific storage technology.

pub mod package;
pub mod plan;
pub mod score;
pub mod transaction;
