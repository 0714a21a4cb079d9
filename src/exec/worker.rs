// src/exec/worker.rs

//! Drives one submitted job to its terminal outcome.

use std::any::Any;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::{Semaphore, oneshot, watch};
use tokio::task::JoinError;
use tracing::{debug, info, warn};

use crate::errors::JobError;
use crate::exec::{Completion, CompletionSender, HandleState, JobFailure, JobOutcome};
use crate::job::{ExecutionContext, Job};
use crate::monitor::ExecutionMonitor;

/// Everything a worker needs to run one job.
pub struct Worker {
    pub job: Arc<dyn Job>,
    pub context: Arc<ExecutionContext>,
    pub monitor: Box<dyn ExecutionMonitor>,
    pub pool: Arc<Semaphore>,
    pub state: watch::Sender<HandleState>,
    pub cancel: oneshot::Receiver<()>,
    pub done: CompletionSender,
}

impl Worker {
    /// Run the job and publish its completion exactly once.
    pub async fn run(self) {
        let job = Arc::clone(&self.job);
        let state = self.state.clone();
        let done = self.done.clone();

        let outcome = self.drive().await;
        debug!(job = %job.id(), ?outcome, "job reached terminal state");

        state.send_replace(HandleState::done(outcome.clone()));
        if done.send(Completion { job, outcome }).is_err() {
            debug!("completion channel closed; scheduler is no longer listening");
        }
    }

    async fn drive(self) -> JobOutcome {
        let Worker {
            job,
            context,
            monitor,
            pool,
            state,
            mut cancel,
            ..
        } = self;

        // Wait for a slot in the pool, unless cancelled first.
        let permit = tokio::select! {
            biased;
            _ = &mut cancel => {
                debug!(job = %job.id(), "cancelled while waiting for a worker slot");
                return JobOutcome::Cancelled;
            }
            permit = pool.acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => {
                    return JobOutcome::fatal(anyhow!(
                        "worker pool closed before job '{}' could start",
                        job.id()
                    ));
                }
            },
        };

        state.send_replace(HandleState::running());
        info!(job = %job.id(), label = %job.label(), resource = %job.resource_id(), "job started");

        let work_job = Arc::clone(&job);
        let mut work =
            tokio::spawn(async move { work_job.execute(monitor, &context).await });

        let outcome = tokio::select! {
            res = &mut work => outcome_from_join(res),
            _ = &mut cancel => {
                info!(job = %job.id(), "cancellation requested for running job; aborting");
                work.abort();
                JobOutcome::Cancelled
            }
        };

        drop(permit);
        outcome
    }
}

/// Map the result of the job's task onto the tagged outcome.
///
/// A panic inside the job is a defect and therefore fatal.
fn outcome_from_join(res: Result<Result<(), JobError>, JoinError>) -> JobOutcome {
    match res {
        Ok(Ok(())) => JobOutcome::Succeeded,
        Ok(Err(JobError::Interrupted)) => JobOutcome::Failed(JobFailure::Interrupted),
        Ok(Err(JobError::Recoverable(err))) => JobOutcome::recoverable(err),
        Ok(Err(JobError::Fatal(err))) => JobOutcome::fatal(err),
        Err(err) if err.is_panic() => {
            let message = panic_message(err.into_panic());
            warn!(panic = %message, "job panicked");
            JobOutcome::fatal(anyhow!("job panicked: {message}"))
        }
        Err(_) => JobOutcome::Cancelled,
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
