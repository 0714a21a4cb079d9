// src/monitor/null.rs

use crate::monitor::{ExecutionMonitor, PhaseMonitor};
use crate::types::JobStatus;

/// A phase monitor that ignores everything and is never cancelled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPhaseMonitor;

impl PhaseMonitor for NullPhaseMonitor {
    fn open(&self, _total: usize) {}

    fn close(&self) {}

    fn report_job_status(&self, _job_id: &str, _status: JobStatus, _cause: Option<&anyhow::Error>) {}

    fn create_job_monitor(&self, _job_id: &str, _weight: f64) -> Box<dyn ExecutionMonitor> {
        Box::new(NullExecutionMonitor)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullExecutionMonitor;

impl ExecutionMonitor for NullExecutionMonitor {
    fn open(&mut self, _total: f64) {}

    fn progressed(&mut self, _delta: f64) {}

    fn close(&mut self) {}
}
