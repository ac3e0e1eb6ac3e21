//! Business logic for the Prepflow enrollment workflow.
//!
//! This crate owns the four-stage eligibility workflow: the score ledger,
//! the study plan engine, the pure eligibility evaluator, and the package
//! transaction ledger. Storage is reached only through the repository
//! traits in [`repository`]; implementations live in prepflow-infra.

pub mod catalog;
pub mod eligibility;
pub mod event;
pub mod reconcile;
pub mod repository;
pub mod service;
pub mod storage;
pub mod subscription;
