// src/job/mod.rs

//! Units of work scheduled inside a phase.
//!
//! - [`Job`] is what the host system hands to the scheduler: an id, the ids
//!   of the jobs that must succeed first, and the work itself.
//! - [`context`] holds the opaque per-phase [`ExecutionContext`].
//! - [`command`] provides [`CommandJob`], a job that runs a shell command.

pub mod command;
pub mod context;

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::errors::JobError;
use crate::monitor::ExecutionMonitor;

pub use command::CommandJob;
pub use context::ExecutionContext;

/// Canonical job identifier type, unique within a phase.
pub type JobId = String;

/// Resource id used when a job does not ask for a dedicated pool.
pub const DEFAULT_RESOURCE_ID: &str = "default";

/// Future returned by [`Job::execute`].
pub type JobFuture<'a> = Pin<Box<dyn Future<Output = Result<(), JobError>> + Send + 'a>>;

/// A single unit of work in a phase.
///
/// Jobs are immutable for the duration of a phase; the scheduler keeps all
/// run-time bookkeeping on its own side.
pub trait Job: Send + Sync + fmt::Debug {
    fn id(&self) -> &str;

    /// Ids of jobs that must complete successfully before this one may start.
    fn blocker_ids(&self) -> &HashSet<JobId>;

    /// Human-readable label used in logs.
    fn label(&self) -> &str {
        self.id()
    }

    /// Worker pool this job wants to run on.
    fn resource_id(&self) -> &str {
        DEFAULT_RESOURCE_ID
    }

    /// Perform the job's work.
    ///
    /// Called on a worker, never on the scheduler's controlling task.
    fn execute<'a>(
        &'a self,
        monitor: Box<dyn ExecutionMonitor>,
        context: &'a ExecutionContext,
    ) -> JobFuture<'a>;
}
