//! Domain services orchestrating the four workflow stages.
//!
//! Services are generic over the repository and adapter traits so the core
//! never depends on prepflow-infra. Every service receives an [`EventBus`]
//! clone and publishes one event per committed state transition.
//!
//! [`EventBus`]: crate::event::EventBus

pub mod billing;
pub mod score_ledger;
pub mod study_plan;
