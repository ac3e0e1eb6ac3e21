//! Event distribution for workflow state transitions.

pub mod bus;

pub use bus::EventBus;
