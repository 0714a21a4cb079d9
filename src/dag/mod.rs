// src/dag/mod.rs

//! Run-time state of one phase's dependency graph.
//!
//! - [`state`] holds [`PhaseState`], the synchronous bookkeeping the engine
//!   drives: which jobs are waiting, which are executing, and which ids still
//!   block their dependents.
//! - [`job_state`] provides the read-only per-job view used in diagnostics.

pub mod job_state;
pub mod state;

pub use job_state::JobRunState;
pub use state::PhaseState;
