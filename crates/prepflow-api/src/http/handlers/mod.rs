//! HTTP request handlers for the REST API.

pub mod eligibility;
pub mod file;
pub mod package;
pub mod plan;
pub mod score;
pub mod skill;
pub mod transaction;
