//! Shared MIG scheduler domain primitives.
//!
//! This crate owns the deterministic part of a scale invocation: trigger
//! payload decoding, request/result contracts, configuration defaults and the
//! scale decision itself. It intentionally excludes Compute Engine HTTP and
//! server runtime concerns, which live in `mig_scheduler_function`.

pub mod config;
pub mod contract;
pub mod decision;
pub mod message;
