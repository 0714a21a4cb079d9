// src/monitor/logging.rs

//! Phase monitor that reports through `tracing`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::errors::{PhaseError, Result};
use crate::job::ExecutionContext;
use crate::monitor::{ExecutionMonitor, PhaseMonitor};
use crate::types::JobStatus;

/// Shareable cancellation request, e.g. raised from a Ctrl-C handler.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
struct Progress {
    total: f64,
    done: f64,
}

impl Progress {
    fn percent(&self) -> f64 {
        if self.total <= 0.0 {
            100.0
        } else {
            (self.done / self.total * 100.0).min(100.0)
        }
    }
}

/// Logs phase lifecycle, per-job status and progress.
#[derive(Debug)]
pub struct LoggingPhaseMonitor {
    phase: String,
    cancel: CancelFlag,
    progress: Arc<Mutex<Progress>>,
}

impl LoggingPhaseMonitor {
    pub fn new(context: &ExecutionContext) -> Self {
        Self::with_cancel_flag(context, CancelFlag::new())
    }

    pub fn with_cancel_flag(context: &ExecutionContext, cancel: CancelFlag) -> Self {
        Self {
            phase: format!(
                "{}/{}/{}/{}",
                context.batch_id, context.flow_id, context.execution_id, context.phase
            ),
            cancel,
            progress: Arc::new(Mutex::new(Progress::default())),
        }
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Phase progress in percent.
    pub fn percent_done(&self) -> f64 {
        self.progress.lock().map(|p| p.percent()).unwrap_or(0.0)
    }
}

impl PhaseMonitor for LoggingPhaseMonitor {
    fn open(&self, total: usize) {
        if let Ok(mut progress) = self.progress.lock() {
            progress.total = total as f64;
            progress.done = 0.0;
        }
        info!(phase = %self.phase, jobs = total, "phase opened");
    }

    fn close(&self) {
        info!(
            phase = %self.phase,
            percent = self.percent_done(),
            "phase closed"
        );
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(PhaseError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn report_job_status(&self, job_id: &str, status: JobStatus, cause: Option<&anyhow::Error>) {
        match (status, cause) {
            (JobStatus::Success, _) => info!(phase = %self.phase, job = %job_id, %status, "job finished"),
            (_, Some(cause)) => {
                let error = format!("{cause:#}");
                warn!(phase = %self.phase, job = %job_id, %status, %error, "job finished")
            }
            (_, None) => warn!(phase = %self.phase, job = %job_id, %status, "job finished"),
        }
    }

    fn create_job_monitor(&self, job_id: &str, weight: f64) -> Box<dyn ExecutionMonitor> {
        Box::new(LoggingExecutionMonitor {
            job_id: job_id.to_string(),
            weight,
            total: 0.0,
            current: 0.0,
            phase: Arc::clone(&self.progress),
        })
    }
}

/// Per-job monitor feeding its progress into the owning phase.
#[derive(Debug)]
struct LoggingExecutionMonitor {
    job_id: String,
    weight: f64,
    total: f64,
    current: f64,
    phase: Arc<Mutex<Progress>>,
}

impl LoggingExecutionMonitor {
    fn advance_to(&mut self, next: f64) {
        let next = next.clamp(0.0, self.total.max(0.0));
        let delta = next - self.current;
        self.current = next;
        if delta <= 0.0 || self.total <= 0.0 {
            return;
        }
        if let Ok(mut progress) = self.phase.lock() {
            progress.done += self.weight * delta / self.total;
            debug!(
                job = %self.job_id,
                percent = progress.percent(),
                "phase progress"
            );
        }
    }
}

impl ExecutionMonitor for LoggingExecutionMonitor {
    fn open(&mut self, total: f64) {
        self.total = total;
        self.current = 0.0;
        debug!(job = %self.job_id, total, "job monitor opened");
    }

    fn progressed(&mut self, delta: f64) {
        let next = self.current + delta;
        self.advance_to(next);
    }

    fn close(&mut self) {
        let total = self.total;
        self.advance_to(total);
        debug!(job = %self.job_id, "job monitor closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_progress_is_weighted_into_phase() {
        let monitor = LoggingPhaseMonitor::new(&ExecutionContext::default());
        monitor.open(2);

        let mut a = monitor.create_job_monitor("a", 1.0);
        a.open(4.0);
        a.progressed(2.0);
        assert!((monitor.percent_done() - 25.0).abs() < 1e-9);
        a.close();
        assert!((monitor.percent_done() - 50.0).abs() < 1e-9);

        let mut b = monitor.create_job_monitor("b", 1.0);
        b.open(1.0);
        b.progressed(10.0);
        b.close();
        assert!((monitor.percent_done() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn cancel_flag_is_shared() {
        let flag = CancelFlag::new();
        let monitor = LoggingPhaseMonitor::with_cancel_flag(&ExecutionContext::default(), flag.clone());
        assert!(monitor.check_cancelled().is_ok());

        flag.cancel();
        assert!(matches!(monitor.check_cancelled(), Err(PhaseError::Cancelled)));
    }
}
