// src/errors.rs

//! Crate-wide error types.
//!
//! [`PhaseError`] is what a phase run surfaces to its caller. [`JobError`] is
//! what an individual job reports back to the executor; the executor turns it
//! into a [`crate::exec::JobOutcome`] exactly once.

use std::sync::Arc;

use thiserror::Error;

use crate::job::JobId;

/// A job failure cause, shared between the engine and the job's handle.
pub type SharedError = Arc<anyhow::Error>;

#[derive(Error, Debug)]
pub enum PhaseError {
    /// The phase was cancelled, either through the monitor or because a job
    /// was interrupted from the caller's side.
    #[error("phase was cancelled")]
    Cancelled,

    /// No job can make progress and nothing failed earlier.
    #[error("phase is deadlocked; blocked jobs: {}", .blocked.join(", "))]
    Deadlock { blocked: Vec<JobId> },

    /// A recoverable failure the error policy refused to tolerate.
    #[error("job '{job_id}' failed: {cause:#}")]
    JobFailed { job_id: JobId, cause: SharedError },

    /// A defect-class failure; never subject to the error policy.
    #[error("job '{job_id}' failed fatally: {cause:#}")]
    JobFatal { job_id: JobId, cause: SharedError },

    /// Summary error for a phase that tolerated failures along the way.
    #[error(
        "phase finished with errors; failed: [{}], abandoned: [{}]",
        .failed.join(", "),
        .abandoned.join(", ")
    )]
    Incomplete {
        failed: Vec<JobId>,
        abandoned: Vec<JobId>,
    },

    #[error("Invalid phase: {0}")]
    InvalidPhase(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PhaseError {
    /// Whether this error is a cancellation rather than a failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, PhaseError::Cancelled)
    }
}

/// Error returned by a job's own work.
#[derive(Error, Debug)]
pub enum JobError {
    /// The job stopped because its caller asked it to.
    #[error("job was interrupted")]
    Interrupted,

    /// An I/O-style failure; the phase's error policy decides what happens.
    #[error(transparent)]
    Recoverable(anyhow::Error),

    /// A broken invariant or environment-level failure.
    #[error("fatal: {0:#}")]
    Fatal(anyhow::Error),
}

impl JobError {
    pub fn recoverable(err: impl Into<anyhow::Error>) -> Self {
        JobError::Recoverable(err.into())
    }

    pub fn fatal(err: impl Into<anyhow::Error>) -> Self {
        JobError::Fatal(err.into())
    }
}

impl From<std::io::Error> for JobError {
    fn from(err: std::io::Error) -> Self {
        JobError::Recoverable(err.into())
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PhaseError>;
