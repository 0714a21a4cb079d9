// src/engine/mod.rs

//! Scheduling engine for one phase.
//!
//! The engine repeatedly:
//! - submits every job whose blockers have all succeeded,
//! - waits for completions on the shared completion channel,
//! - applies each job's outcome (and the error policy) to the phase state,
//!
//! until every job has finished, the phase aborts, or no progress is
//! possible. The synchronous bookkeeping lives in [`crate::dag`]; this module
//! is the async loop around it.

use std::time::Duration;

pub mod core;

pub use self::core::Engine;

/// Upper bound on how long the engine waits for a completion before it
/// re-checks the monitor for cancellation.
pub const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(100);
