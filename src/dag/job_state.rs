// src/dag/job_state.rs

/// Logical state of a job within one phase run.
///
/// `Blocked` and `Submittable` jobs are still waiting; the last four states
/// are terminal. A job that is not `Succeeded` keeps blocking its
/// dependents for the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobRunState {
    /// Waiting; at least one blocker has not succeeded yet.
    Blocked,
    /// Waiting; every blocker has succeeded.
    Submittable,
    /// Handed to the executor.
    Running,
    Succeeded,
    Cancelled,
    Failed,
    /// Dropped without running because it can never become submittable.
    Abandoned,
}

impl JobRunState {
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            JobRunState::Blocked | JobRunState::Submittable | JobRunState::Running
        )
    }
}
