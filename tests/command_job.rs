// tests/command_job.rs
#![cfg(unix)]

mod common;
use crate::common::{RecordingPhaseMonitor, init_tracing, with_timeout};

use std::sync::Arc;

use tempfile::tempdir;

use jobphase::job::{CommandJob, ExecutionContext, Job};
use jobphase::monitor::NullExecutionMonitor;
use jobphase::policy::Strict;
use jobphase::scheduler::PhaseScheduler;
use jobphase::types::{ExecutionPhase, JobStatus};
use jobphase::{JobError, PhaseError};

fn context() -> ExecutionContext {
    ExecutionContext::new("batch", "flow", "exec-1", ExecutionPhase::Main)
        .with_argument("date", "20240101")
}

#[tokio::test]
async fn command_sees_the_execution_context() {
    init_tracing();
    let dir = tempdir().unwrap();
    let out = dir.path().join("env.txt");

    let job = CommandJob::new(
        "env",
        format!(
            "echo \"$JOBPHASE_BATCH_ID $JOBPHASE_PHASE $JOBPHASE_ARG_DATE\" > {}",
            out.display()
        ),
    );

    let result = with_timeout(job.execute(Box::new(NullExecutionMonitor), &context())).await;
    assert!(result.is_ok());

    let written = std::fs::read_to_string(&out).unwrap();
    assert_eq!(written.trim(), "batch main 20240101");
}

#[tokio::test]
async fn non_zero_exit_is_recoverable() {
    init_tracing();

    let job = CommandJob::new("bad", "exit 3");
    let result = with_timeout(job.execute(Box::new(NullExecutionMonitor), &context())).await;

    match result {
        Err(JobError::Recoverable(err)) => assert!(err.to_string().contains("status 3")),
        other => panic!("expected recoverable failure, got {other:?}"),
    }
}

#[tokio::test]
async fn commands_run_after_their_blockers() {
    init_tracing();
    let dir = tempdir().unwrap();
    let out = dir.path().join("order.txt");
    let out = out.display();

    let jobs: Vec<Arc<dyn Job>> = vec![
        Arc::new(CommandJob::new("second", format!("echo second >> {out}")).with_blockers(["first"])),
        Arc::new(CommandJob::new("first", format!("echo first >> {out}"))),
    ];

    let scheduler = PhaseScheduler::sequential();
    let monitor = RecordingPhaseMonitor::new();
    let result = with_timeout(scheduler.execute(&monitor, &context(), jobs, &Strict)).await;
    assert!(result.is_ok());

    let written = std::fs::read_to_string(dir.path().join("order.txt")).unwrap();
    assert_eq!(written.lines().collect::<Vec<_>>(), vec!["first", "second"]);
    assert_eq!(monitor.statuses_of("second"), vec![JobStatus::Success]);
}

#[tokio::test]
async fn failing_command_fails_the_phase() {
    init_tracing();

    let jobs: Vec<Arc<dyn Job>> = vec![
        Arc::new(CommandJob::new("broken", "false")),
        Arc::new(CommandJob::new("after", "true").with_blockers(["broken"])),
    ];

    let scheduler = PhaseScheduler::sequential();
    let monitor = RecordingPhaseMonitor::new();
    let result = with_timeout(scheduler.execute(&monitor, &context(), jobs, &Strict)).await;

    assert!(matches!(result, Err(PhaseError::JobFailed { ref job_id, .. }) if job_id == "broken"));
    assert!(monitor.statuses_of("after").is_empty());
}
