// src/exec/mod.rs

//! Job execution layer.
//!
//! The scheduling engine never runs a job itself. It hands each submittable
//! job to a [`JobExecutor`], which starts it asynchronously and returns an
//! [`Executing`] handle. When the job reaches its terminal state the worker
//! pushes exactly one [`Completion`] onto the shared completion channel.
//!
//! - [`pool`] provides [`ThreadPoolExecutor`], the production executor that
//!   bounds concurrency with one semaphore per resource.
//! - [`worker`] drives a single submitted job to its [`JobOutcome`].

pub mod pool;
pub mod worker;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::errors::SharedError;
use crate::job::{ExecutionContext, Job};
use crate::monitor::PhaseMonitor;

pub use pool::{PooledExecution, ThreadPoolExecutor};

/// Sending half of the completion channel; cloned into every worker.
pub type CompletionSender = mpsc::UnboundedSender<Completion>;
/// Receiving half of the completion channel; owned by the engine.
pub type CompletionReceiver = mpsc::UnboundedReceiver<Completion>;

/// Create a fresh completion channel for one phase run.
pub fn completion_channel() -> (CompletionSender, CompletionReceiver) {
    mpsc::unbounded_channel()
}

/// Life cycle of a submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    /// Submitted, waiting for a worker slot.
    Waiting,
    /// Running on a worker.
    Running,
    /// Finished; its [`Completion`] has been (or is being) sent.
    Done,
}

/// Terminal outcome of a submitted job, decided once by the worker.
#[derive(Debug, Clone)]
pub enum JobOutcome {
    Succeeded,
    /// The handle was cancelled before or while the job ran.
    Cancelled,
    Failed(JobFailure),
}

/// Why a job failed.
#[derive(Debug, Clone)]
pub enum JobFailure {
    /// The job gave up because its caller asked it to stop.
    Interrupted,
    /// I/O-style failure, subject to the phase's error policy.
    Recoverable(SharedError),
    /// Defect or environment-level failure; always aborts the phase.
    Fatal(SharedError),
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Succeeded)
    }

    pub(crate) fn recoverable(err: anyhow::Error) -> Self {
        JobOutcome::Failed(JobFailure::Recoverable(Arc::new(err)))
    }

    pub(crate) fn fatal(err: anyhow::Error) -> Self {
        JobOutcome::Failed(JobFailure::Fatal(Arc::new(err)))
    }
}

/// What a worker publishes to its handle: the current state and, once
/// `Done`, the outcome.
#[derive(Debug, Clone)]
pub struct HandleState {
    pub state: ExecutionState,
    pub outcome: Option<JobOutcome>,
}

impl HandleState {
    pub fn waiting() -> Self {
        Self {
            state: ExecutionState::Waiting,
            outcome: None,
        }
    }

    pub fn running() -> Self {
        Self {
            state: ExecutionState::Running,
            outcome: None,
        }
    }

    pub fn done(outcome: JobOutcome) -> Self {
        Self {
            state: ExecutionState::Done,
            outcome: Some(outcome),
        }
    }
}

/// Future returned by [`Executing::outcome`].
pub type OutcomeFuture<'a> = Pin<Box<dyn Future<Output = JobOutcome> + Send + 'a>>;

/// Message a worker sends when its job reaches [`ExecutionState::Done`].
#[derive(Debug)]
pub struct Completion {
    pub job: Arc<dyn Job>,
    pub outcome: JobOutcome,
}

/// Handle to one submitted job.
pub trait Executing: Send {
    /// The job this handle was created for.
    fn job(&self) -> &Arc<dyn Job>;

    fn state(&self) -> ExecutionState;

    /// Wait until the job is done and return how it ended.
    ///
    /// Can be called any number of times; every call yields the same
    /// outcome as the job's [`Completion`].
    fn outcome(&mut self) -> OutcomeFuture<'_>;

    /// Best-effort cancellation; a no-op if the job already finished.
    fn cancel(&mut self);
}

/// Starts jobs asynchronously.
///
/// Production code uses [`ThreadPoolExecutor`]; tests can wrap or replace it.
pub trait JobExecutor: Send + Sync {
    /// Start `job` and return immediately.
    ///
    /// The returned handle must eventually send exactly one [`Completion`]
    /// on `done`. An error means the job could not be started at all.
    fn submit(
        &self,
        monitor: &dyn PhaseMonitor,
        context: &ExecutionContext,
        job: Arc<dyn Job>,
        done: CompletionSender,
    ) -> anyhow::Result<Box<dyn Executing>>;
}
