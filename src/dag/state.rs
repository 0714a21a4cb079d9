// src/dag/state.rs

//! Per-run state management for the jobs of one phase.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use tracing::debug;

use crate::dag::job_state::JobRunState;
use crate::errors::{PhaseError, Result};
use crate::exec::Executing;
use crate::job::{Job, JobId};

/// Bookkeeping for one phase run.
///
/// Owned by the engine's controlling task; nothing here is shared across
/// threads, so none of it is synchronized.
///
/// Invariants:
/// - a job id lives in `waiting` or `executing`, or in neither once it has
///   finished; it never appears twice;
/// - `blockers` starts as every id of the phase and only loses an id when
///   that job succeeds, so anything downstream of a failed or cancelled job
///   stays blocked for good.
pub struct PhaseState {
    waiting: VecDeque<Arc<dyn Job>>,
    executing: HashMap<JobId, Box<dyn Executing>>,
    blockers: HashSet<JobId>,
    finished: HashMap<JobId, JobRunState>,
    saw_error: bool,
}

impl PhaseState {
    /// Build the initial state, rejecting duplicate job ids.
    pub fn new(jobs: Vec<Arc<dyn Job>>) -> Result<Self> {
        let mut blockers = HashSet::with_capacity(jobs.len());
        for job in &jobs {
            if !blockers.insert(job.id().to_string()) {
                return Err(PhaseError::InvalidPhase(format!(
                    "duplicate job id '{}'",
                    job.id()
                )));
            }
        }

        for job in &jobs {
            for blocker in job.blocker_ids() {
                if !blockers.contains(blocker) {
                    debug!(
                        job = %job.id(),
                        blocker = %blocker,
                        "blocker is not part of this phase; treating as satisfied"
                    );
                }
            }
        }

        Ok(Self {
            waiting: jobs.into_iter().collect(),
            executing: HashMap::new(),
            blockers,
            finished: HashMap::new(),
            saw_error: false,
        })
    }

    pub fn has_waiting(&self) -> bool {
        !self.waiting.is_empty()
    }

    pub fn has_executing(&self) -> bool {
        !self.executing.is_empty()
    }

    pub fn executing_count(&self) -> usize {
        self.executing.len()
    }

    /// Whether any job failed, was cancelled or could not be submitted.
    pub fn saw_error(&self) -> bool {
        self.saw_error
    }

    /// A job may start once none of its blockers is still unsucceeded.
    pub fn is_submittable(&self, job: &dyn Job) -> bool {
        !job.blocker_ids().iter().any(|id| self.blockers.contains(id))
    }

    /// Remove and return every waiting job that may start now, keeping the
    /// relative order of the rest.
    pub fn take_submittable(&mut self) -> Vec<Arc<dyn Job>> {
        let (ready, rest): (VecDeque<_>, VecDeque<_>) = std::mem::take(&mut self.waiting)
            .into_iter()
            .partition(|job| self.is_submittable(job.as_ref()));
        self.waiting = rest;
        ready.into_iter().collect()
    }

    /// Record a successfully submitted job.
    pub fn start(&mut self, handle: Box<dyn Executing>) {
        let id = handle.job().id().to_string();
        debug!(job = %id, "job submitted; marking Running");
        self.executing.insert(id, handle);
    }

    /// Remove the handle of a job that reached its terminal state.
    pub fn finish(&mut self, id: &str) -> Option<Box<dyn Executing>> {
        self.executing.remove(id)
    }

    pub fn mark_succeeded(&mut self, id: &str) {
        self.blockers.remove(id);
        self.finished.insert(id.to_string(), JobRunState::Succeeded);
    }

    pub fn mark_cancelled(&mut self, id: &str) {
        self.saw_error = true;
        self.finished.insert(id.to_string(), JobRunState::Cancelled);
    }

    pub fn mark_failed(&mut self, id: &str) {
        self.saw_error = true;
        self.finished.insert(id.to_string(), JobRunState::Failed);
    }

    /// Drop every job still waiting; they can never become submittable.
    pub fn abandon_waiting(&mut self) -> Vec<JobId> {
        let abandoned: Vec<JobId> = self
            .waiting
            .drain(..)
            .map(|job| job.id().to_string())
            .collect();
        for id in &abandoned {
            self.finished.insert(id.clone(), JobRunState::Abandoned);
        }
        abandoned
    }

    /// Best-effort cancellation of every running job.
    pub fn cancel_running(&mut self) {
        for (id, handle) in self.executing.iter_mut() {
            debug!(job = %id, "requesting cancellation of running job");
            handle.cancel();
        }
    }

    /// Ids that have not succeeded yet, sorted.
    pub fn blocked_ids(&self) -> Vec<JobId> {
        let mut ids: Vec<JobId> = self.blockers.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Ids of jobs that ended in the given terminal state, sorted.
    pub fn ids_in(&self, state: JobRunState) -> Vec<JobId> {
        let mut ids: Vec<JobId> = self
            .finished
            .iter()
            .filter(|(_, s)| **s == state)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Read-only view of a job's state; `None` for unknown ids.
    pub fn run_state_of(&self, id: &str) -> Option<JobRunState> {
        if let Some(state) = self.finished.get(id) {
            return Some(*state);
        }
        if self.executing.contains_key(id) {
            return Some(JobRunState::Running);
        }
        self.waiting.iter().find(|job| job.id() == id).map(|job| {
            if self.is_submittable(job.as_ref()) {
                JobRunState::Submittable
            } else {
                JobRunState::Blocked
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::errors::JobError;
    use crate::exec::{ExecutionState, OutcomeFuture};
    use crate::job::{ExecutionContext, JobFuture};
    use crate::monitor::ExecutionMonitor;

    #[derive(Debug)]
    struct Stub {
        id: String,
        blockers: HashSet<String>,
    }

    impl Job for Stub {
        fn id(&self) -> &str {
            &self.id
        }

        fn blocker_ids(&self) -> &HashSet<String> {
            &self.blockers
        }

        fn execute<'a>(
            &'a self,
            _monitor: Box<dyn ExecutionMonitor>,
            _context: &'a ExecutionContext,
        ) -> JobFuture<'a> {
            Box::pin(async { Err(JobError::Interrupted) })
        }
    }

    struct StubHandle {
        job: Arc<dyn Job>,
        cancels: Arc<AtomicUsize>,
    }

    impl Executing for StubHandle {
        fn job(&self) -> &Arc<dyn Job> {
            &self.job
        }

        fn state(&self) -> ExecutionState {
            ExecutionState::Running
        }

        fn outcome(&mut self) -> OutcomeFuture<'_> {
            Box::pin(std::future::pending())
        }

        fn cancel(&mut self) {
            self.cancels.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn job(id: &str, blockers: &[&str]) -> Arc<dyn Job> {
        Arc::new(Stub {
            id: id.to_string(),
            blockers: blockers.iter().map(|s| s.to_string()).collect(),
        })
    }

    fn start(state: &mut PhaseState, job: Arc<dyn Job>) -> Arc<AtomicUsize> {
        let cancels = Arc::new(AtomicUsize::new(0));
        state.start(Box::new(StubHandle {
            job,
            cancels: Arc::clone(&cancels),
        }));
        cancels
    }

    #[test]
    fn dependents_unblock_only_after_success() {
        let mut state = PhaseState::new(vec![job("c", &["a", "b"]), job("a", &[]), job("b", &[])])
            .expect("valid phase");

        let ready: Vec<_> = state.take_submittable();
        let ids: Vec<_> = ready.iter().map(|j| j.id().to_string()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(state.run_state_of("c"), Some(JobRunState::Blocked));

        for j in ready {
            start(&mut state, j);
        }
        assert!(state.take_submittable().is_empty());

        state.finish("a");
        state.mark_succeeded("a");
        assert!(state.take_submittable().is_empty());

        state.finish("b");
        state.mark_succeeded("b");
        assert_eq!(state.run_state_of("c"), Some(JobRunState::Submittable));
        assert_eq!(state.take_submittable().len(), 1);
        assert!(!state.has_waiting());
    }

    #[test]
    fn failed_job_keeps_blocking_forever() {
        let mut state = PhaseState::new(vec![job("a", &[]), job("b", &["a"])]).expect("valid phase");
        let ready = state.take_submittable();
        assert_eq!(ready.len(), 1);
        start(&mut state, Arc::clone(&ready[0]));

        state.finish("a");
        state.mark_failed("a");
        assert!(state.saw_error());
        assert!(state.take_submittable().is_empty());
        assert_eq!(state.blocked_ids(), vec!["a", "b"]);

        assert_eq!(state.abandon_waiting(), vec!["b".to_string()]);
        assert_eq!(state.run_state_of("b"), Some(JobRunState::Abandoned));
        assert!(JobRunState::Abandoned.is_terminal());
        assert_eq!(state.ids_in(JobRunState::Failed), vec!["a".to_string()]);
    }

    #[test]
    fn unknown_blockers_are_satisfied() {
        let mut state = PhaseState::new(vec![job("a", &["elsewhere"])]).expect("valid phase");
        assert_eq!(state.take_submittable().len(), 1);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = PhaseState::new(vec![job("a", &[]), job("a", &[])])
            .err()
            .expect("duplicate must fail");
        assert!(matches!(err, PhaseError::InvalidPhase(_)));
    }

    #[test]
    fn cancel_running_reaches_every_handle() {
        let mut state = PhaseState::new(vec![job("a", &[]), job("b", &[])]).expect("valid phase");
        let counters: Vec<_> = state
            .take_submittable()
            .into_iter()
            .map(|j| start(&mut state, j))
            .collect();
        state.cancel_running();
        assert_eq!(state.executing_count(), 2);
        assert!(counters.iter().all(|c| c.load(Ordering::SeqCst) == 1));
        assert_eq!(state.run_state_of("a"), Some(JobRunState::Running));
    }
}
