// src/scheduler.rs

//! Public entry point for running a phase.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};

use crate::config::{ParallelConfig, SchedulerConfig};
use crate::engine::Engine;
use crate::errors::Result;
use crate::exec::{JobExecutor, ThreadPoolExecutor};
use crate::job::{ExecutionContext, Job};
use crate::monitor::PhaseMonitor;
use crate::policy::ErrorPolicy;

/// Runs phases on a [`JobExecutor`].
///
/// Each call to [`PhaseScheduler::execute`] builds a fresh [`Engine`]; the
/// scheduler itself keeps no per-phase state and can be reused.
#[derive(Debug, Clone)]
pub struct PhaseScheduler<E: JobExecutor = ThreadPoolExecutor> {
    executor: E,
}

impl PhaseScheduler<ThreadPoolExecutor> {
    /// Scheduler backed by per-resource worker pools.
    pub fn parallel(config: &ParallelConfig) -> Result<Self> {
        Ok(Self::with_executor(ThreadPoolExecutor::new(config)?))
    }

    /// Scheduler that runs one job at a time, in dependency order.
    pub fn sequential() -> Self {
        Self::with_executor(ThreadPoolExecutor::sequential())
    }

    pub fn from_config(cfg: &SchedulerConfig) -> Result<Self> {
        Self::parallel(&cfg.parallel)
    }
}

impl<E: JobExecutor> PhaseScheduler<E> {
    pub fn with_executor(executor: E) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Run `jobs` as one phase.
    ///
    /// Returns `Ok(())` only if every job succeeded. Otherwise returns exactly
    /// one error: the cancellation, the first failure that stopped the phase,
    /// a deadlock, or a summary of tolerated failures. The monitor is opened
    /// with one unit per job and closed on every exit path.
    pub async fn execute(
        &self,
        monitor: &dyn PhaseMonitor,
        context: &ExecutionContext,
        jobs: Vec<Arc<dyn Job>>,
        policy: &dyn ErrorPolicy,
    ) -> Result<()> {
        let started = Instant::now();
        info!(
            batch = %context.batch_id,
            flow = %context.flow_id,
            execution = %context.execution_id,
            phase = %context.phase,
            jobs = jobs.len(),
            "starting phase"
        );

        monitor.open(jobs.len());
        let _close = CloseOnDrop(monitor);

        let result = match Engine::new(&self.executor, monitor, context, jobs, policy) {
            Ok(engine) => engine.run().await,
            Err(err) => Err(err),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(()) => info!(phase = %context.phase, elapsed_ms, "phase completed"),
            Err(err) if err.is_cancellation() => {
                warn!(phase = %context.phase, elapsed_ms, "phase cancelled")
            }
            Err(err) => error!(phase = %context.phase, elapsed_ms, error = %err, "phase failed"),
        }

        result
    }
}

/// Closes the monitor when the phase run ends, however it ends.
struct CloseOnDrop<'a>(&'a dyn PhaseMonitor);

impl Drop for CloseOnDrop<'_> {
    fn drop(&mut self) {
        self.0.close();
    }
}
