//! Observability setup for Prepflow.

pub mod tracing_setup;
