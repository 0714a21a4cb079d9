// src/engine/core.rs

//! The per-phase scheduling loop.

use std::sync::Arc;

use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::dag::{JobRunState, PhaseState};
use crate::engine::CANCEL_POLL_INTERVAL;
use crate::errors::{PhaseError, Result, SharedError};
use crate::exec::{
    Completion, CompletionReceiver, CompletionSender, JobExecutor, JobFailure, JobOutcome,
    completion_channel,
};
use crate::job::{ExecutionContext, Job};
use crate::monitor::PhaseMonitor;
use crate::policy::ErrorPolicy;
use crate::types::JobStatus;

/// Runs one phase to completion, failure or deadlock.
///
/// One engine is built per phase run and consumed by [`Engine::run`]. Only
/// the task awaiting `run` touches the [`PhaseState`]; workers talk back
/// exclusively through the completion channel.
pub struct Engine<'a, E: JobExecutor + ?Sized> {
    executor: &'a E,
    monitor: &'a dyn PhaseMonitor,
    context: &'a ExecutionContext,
    policy: &'a dyn ErrorPolicy,
    state: PhaseState,
    done_tx: CompletionSender,
    done_rx: CompletionReceiver,
}

impl<'a, E: JobExecutor + ?Sized> Engine<'a, E> {
    pub fn new(
        executor: &'a E,
        monitor: &'a dyn PhaseMonitor,
        context: &'a ExecutionContext,
        jobs: Vec<Arc<dyn Job>>,
        policy: &'a dyn ErrorPolicy,
    ) -> Result<Self> {
        let state = PhaseState::new(jobs)?;
        let (done_tx, done_rx) = completion_channel();
        Ok(Self {
            executor,
            monitor,
            context,
            policy,
            state,
            done_tx,
            done_rx,
        })
    }

    /// Run the phase.
    ///
    /// Whatever error ends the run, every job still executing receives a
    /// cancellation request first. The engine does not wait for them.
    pub async fn run(mut self) -> Result<()> {
        let result = self.run_loop().await;
        if result.is_err() && self.state.has_executing() {
            debug!(
                running = self.state.executing_count(),
                "phase aborting; cancelling running jobs"
            );
            self.state.cancel_running();
        }
        result
    }

    async fn run_loop(&mut self) -> Result<()> {
        while self.state.has_waiting() {
            let submitted = self.submit_ready()?;

            if submitted == 0 && !self.state.has_executing() {
                self.log_unfinished();
                if self.state.saw_error() {
                    let abandoned = self.state.abandon_waiting();
                    warn!(
                        ?abandoned,
                        "no further progress possible after earlier failures; abandoning blocked jobs"
                    );
                    break;
                }
                let blocked = self.state.blocked_ids();
                error!(?blocked, "phase is deadlocked");
                return Err(PhaseError::Deadlock { blocked });
            }

            self.drain_completions().await?;
        }

        while self.state.has_executing() {
            self.drain_completions().await?;
        }

        if self.state.saw_error() {
            let mut failed = self.state.ids_in(JobRunState::Failed);
            failed.extend(self.state.ids_in(JobRunState::Cancelled));
            failed.sort();
            let abandoned = self.state.ids_in(JobRunState::Abandoned);
            return Err(PhaseError::Incomplete { failed, abandoned });
        }

        Ok(())
    }

    /// Log the state of each job that can no longer make progress.
    fn log_unfinished(&self) {
        for id in self.state.blocked_ids() {
            match self.state.run_state_of(&id) {
                Some(state) if !state.is_terminal() => {
                    debug!(job = %id, ?state, "job cannot make progress");
                }
                _ => {}
            }
        }
    }

    /// Submit every job whose blockers have all succeeded.
    ///
    /// Returns how many jobs were actually started.
    fn submit_ready(&mut self) -> Result<usize> {
        self.monitor.check_cancelled()?;

        let mut started = 0;
        for job in self.state.take_submittable() {
            let id = job.id().to_string();
            debug!(job = %id, label = %job.label(), "submitting job");

            match self
                .executor
                .submit(self.monitor, self.context, job, self.done_tx.clone())
            {
                Ok(handle) => {
                    self.state.start(handle);
                    started += 1;
                }
                Err(err) => {
                    let error = format!("{err:#}");
                    error!(job = %id, %error, "failed to submit job");
                    self.monitor
                        .report_job_status(&id, JobStatus::Failed, Some(&err));
                    self.state.mark_failed(&id);
                    self.apply_policy(&id, Arc::new(err))?;
                }
            }
        }
        Ok(started)
    }

    /// Wait for at least one completion, then take any others already queued.
    async fn drain_completions(&mut self) -> Result<()> {
        let first = self.next_completion().await?;
        self.handle_done(first)?;

        while let Ok(completion) = self.done_rx.try_recv() {
            self.handle_done(completion)?;
        }
        Ok(())
    }

    async fn next_completion(&mut self) -> Result<Completion> {
        loop {
            self.monitor.check_cancelled()?;
            match timeout(CANCEL_POLL_INTERVAL, self.done_rx.recv()).await {
                Ok(Some(completion)) => return Ok(completion),
                // The engine holds a sender, so the channel cannot close.
                Ok(None) => {
                    return Err(PhaseError::Other(anyhow::anyhow!(
                        "completion channel closed unexpectedly"
                    )));
                }
                Err(_elapsed) => continue,
            }
        }
    }

    /// Apply the terminal outcome of one job.
    fn handle_done(&mut self, completion: Completion) -> Result<()> {
        let Completion { job, outcome } = completion;
        let id = job.id();

        if self.state.finish(id).is_none() {
            warn!(job = %id, "completion for a job that is not executing; ignoring");
            return Ok(());
        }

        match outcome {
            JobOutcome::Succeeded => {
                info!(job = %id, "job succeeded");
                self.state.mark_succeeded(id);
                self.monitor.report_job_status(id, JobStatus::Success, None);
                Ok(())
            }
            JobOutcome::Cancelled => {
                warn!(job = %id, "job was cancelled");
                self.state.mark_cancelled(id);
                self.monitor.report_job_status(id, JobStatus::Cancelled, None);
                Ok(())
            }
            JobOutcome::Failed(JobFailure::Interrupted) => {
                warn!(job = %id, "job was interrupted; cancelling phase");
                self.state.mark_cancelled(id);
                self.monitor.report_job_status(id, JobStatus::Cancelled, None);
                Err(PhaseError::Cancelled)
            }
            JobOutcome::Failed(JobFailure::Recoverable(cause)) => {
                let error = format!("{cause:#}");
                error!(job = %id, %error, "job failed");
                self.state.mark_failed(id);
                self.monitor
                    .report_job_status(id, JobStatus::Failed, Some(&*cause));
                self.apply_policy(id, cause)
            }
            JobOutcome::Failed(JobFailure::Fatal(cause)) => {
                let error = format!("{cause:#}");
                error!(job = %id, %error, "job failed fatally");
                self.state.mark_failed(id);
                self.monitor
                    .report_job_status(id, JobStatus::Failed, Some(&*cause));
                Err(PhaseError::JobFatal {
                    job_id: id.to_string(),
                    cause,
                })
            }
        }
    }

    /// Ask the error policy whether a recoverable failure stops the phase.
    ///
    /// A tolerated failure leaves the job's id blocking its dependents, which
    /// are abandoned once nothing else can run.
    fn apply_policy(&self, id: &str, cause: SharedError) -> Result<()> {
        if self.policy.should_continue(self.context, &cause) {
            warn!(job = %id, "error policy tolerates failure; continuing with independent jobs");
            Ok(())
        } else {
            Err(PhaseError::JobFailed {
                job_id: id.to_string(),
                cause,
            })
        }
    }
}
