// src/monitor/mod.rs

//! Progress monitoring for phases and jobs.
//!
//! - [`PhaseMonitor`] owns phase-wide progress, receives one terminal status
//!   per submitted job, and is where cancellation is requested.
//! - [`ExecutionMonitor`] is the per-job view handed to a running job.
//! - [`null`] and [`logging`] provide the two stock implementations.

pub mod logging;
pub mod null;

use crate::errors::Result;
use crate::types::JobStatus;

pub use logging::{CancelFlag, LoggingPhaseMonitor};
pub use null::{NullExecutionMonitor, NullPhaseMonitor};

/// Phase-wide progress reporting and cancellation.
///
/// All methods take `&self`; implementations use interior mutability because
/// the monitor is shared between the scheduler and the jobs it creates.
pub trait PhaseMonitor: Send + Sync {
    /// Start the phase with `total` units of work (one per job).
    fn open(&self, total: usize);

    /// Finish the phase. Called exactly once per `open`, on every exit path.
    fn close(&self);

    /// Returns `Err(PhaseError::Cancelled)` once cancellation was requested.
    fn check_cancelled(&self) -> Result<()> {
        Ok(())
    }

    /// Record the terminal status of a submitted job.
    fn report_job_status(&self, job_id: &str, status: JobStatus, cause: Option<&anyhow::Error>);

    /// Create the monitor handed to a single job, weighted against the phase.
    fn create_job_monitor(&self, job_id: &str, weight: f64) -> Box<dyn ExecutionMonitor>;
}

/// Progress reporting for one running job.
pub trait ExecutionMonitor: Send {
    fn open(&mut self, total: f64);

    fn progressed(&mut self, delta: f64);

    fn close(&mut self);
}
