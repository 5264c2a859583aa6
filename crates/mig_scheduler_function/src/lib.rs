//! Compute Engine adapters and handlers for the MIG scheduler.
//!
//! This crate owns runtime integration details (the CloudEvent entry point,
//! the Compute Engine REST client and logging setup) and re-exports the core
//! crate as `runtime` for contract, configuration and decision primitives.

pub mod adapters;
pub mod handlers;
pub mod telemetry;

pub use mig_scheduler_core as runtime;
