#![allow(dead_code)]

use std::sync::Arc;

use jobphase::Job;
use jobphase::errors::Result;
use jobphase::exec::JobExecutor;
use jobphase::policy::ErrorPolicy;
use jobphase::scheduler::PhaseScheduler;

pub use jobphase_test_utils::builders::{Behaviour, Event, ExecutionLog, MockJob, test_context};
pub use jobphase_test_utils::fake_executor::RecordingExecutor;
pub use jobphase_test_utils::monitor::RecordingPhaseMonitor;
pub use jobphase_test_utils::{init_tracing, with_timeout};

/// Run `jobs` through `executor` with a recording monitor and a 5s deadline.
pub async fn run_phase<E: JobExecutor>(
    executor: E,
    jobs: Vec<Arc<dyn Job>>,
    policy: &dyn ErrorPolicy,
) -> (Result<()>, RecordingPhaseMonitor, PhaseScheduler<E>) {
    let scheduler = PhaseScheduler::with_executor(executor);
    let monitor = RecordingPhaseMonitor::new();
    let context = test_context();
    let result = with_timeout(scheduler.execute(&monitor, &context, jobs, policy)).await;
    (result, monitor, scheduler)
}
