use std::sync::Mutex;

use jobphase::errors::{PhaseError, Result};
use jobphase::monitor::{CancelFlag, ExecutionMonitor, NullExecutionMonitor, PhaseMonitor};
use jobphase::types::JobStatus;

/// One `report_job_status` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub job_id: String,
    pub status: JobStatus,
    pub cause: Option<String>,
}

#[derive(Debug, Default)]
struct Recorded {
    opened: Vec<usize>,
    closed: usize,
    reports: Vec<StatusReport>,
}

/// A phase monitor that remembers every call, for assertions.
#[derive(Debug, Default)]
pub struct RecordingPhaseMonitor {
    recorded: Mutex<Recorded>,
    cancel: CancelFlag,
}

impl RecordingPhaseMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; observed at the engine's next check.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Totals passed to `open`, in call order.
    pub fn opened(&self) -> Vec<usize> {
        self.recorded.lock().unwrap().opened.clone()
    }

    pub fn close_count(&self) -> usize {
        self.recorded.lock().unwrap().closed
    }

    pub fn reports(&self) -> Vec<StatusReport> {
        self.recorded.lock().unwrap().reports.clone()
    }

    /// All statuses reported for `job_id`, in order.
    pub fn statuses_of(&self, job_id: &str) -> Vec<JobStatus> {
        self.reports()
            .into_iter()
            .filter(|r| r.job_id == job_id)
            .map(|r| r.status)
            .collect()
    }

    /// Position of a job's first report in the report stream.
    pub fn report_index(&self, job_id: &str) -> Option<usize> {
        self.reports().iter().position(|r| r.job_id == job_id)
    }
}

impl PhaseMonitor for RecordingPhaseMonitor {
    fn open(&self, total: usize) {
        self.recorded.lock().unwrap().opened.push(total);
    }

    fn close(&self) {
        self.recorded.lock().unwrap().closed += 1;
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(PhaseError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn report_job_status(&self, job_id: &str, status: JobStatus, cause: Option<&anyhow::Error>) {
        self.recorded.lock().unwrap().reports.push(StatusReport {
            job_id: job_id.to_string(),
            status,
            cause: cause.map(|c| format!("{c:#}")),
        });
    }

    fn create_job_monitor(&self, _job_id: &str, _weight: f64) -> Box<dyn ExecutionMonitor> {
        Box::new(NullExecutionMonitor)
    }
}
