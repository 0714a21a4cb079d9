// src/exec/pool.rs

//! Thread-pool backed [`JobExecutor`].

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use tokio::runtime::Handle;
use tokio::sync::{Semaphore, oneshot, watch};
use tracing::debug;

use crate::config::ParallelConfig;
use crate::errors::{PhaseError, Result};
use crate::exec::worker::Worker;
use crate::exec::{
    CompletionSender, Executing, ExecutionState, HandleState, JobExecutor, JobOutcome,
    OutcomeFuture,
};
use crate::job::{DEFAULT_RESOURCE_ID, ExecutionContext, Job};
use crate::monitor::PhaseMonitor;

/// Runs each submitted job as a Tokio task, bounded per resource.
///
/// Every resource id listed in the [`ParallelConfig`] gets its own pool; all
/// other jobs share the default pool. Pool sizes are the only knob limiting
/// how many jobs run at once: a single default pool of size 1 runs the phase
/// strictly sequentially.
#[derive(Debug, Clone)]
pub struct ThreadPoolExecutor {
    default_pool: Arc<Semaphore>,
    pools: HashMap<String, Arc<Semaphore>>,
}

impl ThreadPoolExecutor {
    pub fn new(config: &ParallelConfig) -> Result<Self> {
        config.validate()?;

        let pools = config
            .resources
            .iter()
            .filter(|(name, _)| name.as_str() != DEFAULT_RESOURCE_ID)
            .map(|(name, &limit)| (name.clone(), Arc::new(Semaphore::new(limit))))
            .collect();

        Ok(Self {
            default_pool: Arc::new(Semaphore::new(config.default)),
            pools,
        })
    }

    /// Executor with a single default pool of `size` workers.
    pub fn with_size(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(PhaseError::ConfigError(
                "worker pool size must be >= 1 (got 0)".to_string(),
            ));
        }
        Self::new(&ParallelConfig::with_default(size))
    }

    /// Executor that runs one job at a time.
    pub fn sequential() -> Self {
        Self {
            default_pool: Arc::new(Semaphore::new(1)),
            pools: HashMap::new(),
        }
    }

    fn pool_for(&self, resource: &str) -> Arc<Semaphore> {
        match self.pools.get(resource) {
            Some(pool) => Arc::clone(pool),
            None => Arc::clone(&self.default_pool),
        }
    }

    /// Like [`JobExecutor::submit`], but returns the concrete handle.
    pub fn start(
        &self,
        monitor: &dyn PhaseMonitor,
        context: &ExecutionContext,
        job: Arc<dyn Job>,
        done: CompletionSender,
    ) -> anyhow::Result<PooledExecution> {
        let runtime = Handle::try_current()
            .with_context(|| format!("no async runtime available to run job '{}'", job.id()))?;

        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        let (state_tx, state_rx) = watch::channel(HandleState::waiting());

        let worker = Worker {
            job: Arc::clone(&job),
            context: Arc::new(context.clone()),
            monitor: monitor.create_job_monitor(job.id(), 1.0),
            pool: self.pool_for(job.resource_id()),
            state: state_tx,
            cancel: cancel_rx,
            done,
        };

        debug!(job = %job.id(), resource = %job.resource_id(), "submitting job to worker pool");
        runtime.spawn(worker.run());

        Ok(PooledExecution {
            job,
            cancel: Some(cancel_tx),
            state: state_rx,
        })
    }
}

impl JobExecutor for ThreadPoolExecutor {
    fn submit(
        &self,
        monitor: &dyn PhaseMonitor,
        context: &ExecutionContext,
        job: Arc<dyn Job>,
        done: CompletionSender,
    ) -> anyhow::Result<Box<dyn Executing>> {
        Ok(Box::new(self.start(monitor, context, job, done)?))
    }
}

/// Handle returned by [`ThreadPoolExecutor::submit`].
///
/// Dropping the handle counts as a cancellation request.
#[derive(Debug)]
pub struct PooledExecution {
    job: Arc<dyn Job>,
    cancel: Option<oneshot::Sender<()>>,
    state: watch::Receiver<HandleState>,
}

impl PooledExecution {
    /// Wait until the job reaches [`ExecutionState::Done`] and return its
    /// outcome.
    pub async fn wait_done(&mut self) -> JobOutcome {
        let published = self
            .state
            .wait_for(|published| published.outcome.is_some())
            .await
            .ok()
            .and_then(|published| published.outcome.clone());

        match published {
            Some(outcome) => outcome,
            // The worker publishes before it exits, so this only happens when
            // its task was torn down with the runtime.
            None => JobOutcome::fatal(anyhow!(
                "worker for job '{}' stopped without an outcome",
                self.job.id()
            )),
        }
    }
}

impl Executing for PooledExecution {
    fn job(&self) -> &Arc<dyn Job> {
        &self.job
    }

    fn state(&self) -> ExecutionState {
        self.state.borrow().state
    }

    fn outcome(&mut self) -> OutcomeFuture<'_> {
        Box::pin(self.wait_done())
    }

    fn cancel(&mut self) {
        match self.cancel.take() {
            Some(cancel) => {
                if cancel.send(()).is_err() {
                    debug!(job = %self.job.id(), "job already finished while cancelling");
                }
            }
            None => {
                debug!(job = %self.job.id(), "cancellation already requested");
            }
        }
    }
}
