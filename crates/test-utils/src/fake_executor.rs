use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use jobphase::exec::{
    CompletionSender, Executing, ExecutionState, JobExecutor, OutcomeFuture, ThreadPoolExecutor,
};
use jobphase::job::{ExecutionContext, Job};
use jobphase::monitor::PhaseMonitor;

/// Wraps another executor and records what the engine asks of it:
/// - which jobs were submitted, in order
/// - which handles received a cancellation request
///
/// It can also refuse to submit chosen jobs, to exercise submission failures,
/// or cancel chosen jobs right after submitting them.
pub struct RecordingExecutor<E: JobExecutor = ThreadPoolExecutor> {
    inner: E,
    submitted: Arc<Mutex<Vec<String>>>,
    cancelled: Arc<Mutex<Vec<String>>>,
    refuse: HashSet<String>,
    cancel_on_submit: HashSet<String>,
}

impl<E: JobExecutor> RecordingExecutor<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            submitted: Arc::new(Mutex::new(Vec::new())),
            cancelled: Arc::new(Mutex::new(Vec::new())),
            refuse: HashSet::new(),
            cancel_on_submit: HashSet::new(),
        }
    }

    /// Make `submit` fail for the job with this id.
    pub fn refusing(mut self, id: &str) -> Self {
        self.refuse.insert(id.to_string());
        self
    }

    /// Cancel the job with this id as soon as it has been submitted.
    pub fn cancelling(mut self, id: &str) -> Self {
        self.cancel_on_submit.insert(id.to_string());
        self
    }

    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn submit_count(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }

    pub fn cancel_requests(&self) -> Vec<String> {
        self.cancelled.lock().unwrap().clone()
    }

    pub fn was_cancelled(&self, id: &str) -> bool {
        self.cancel_requests().iter().any(|c| c == id)
    }
}

impl RecordingExecutor<ThreadPoolExecutor> {
    /// Recording wrapper around a single default pool of `size` workers.
    pub fn pool(size: usize) -> Self {
        Self::new(ThreadPoolExecutor::with_size(size).expect("valid pool size"))
    }
}

impl<E: JobExecutor> JobExecutor for RecordingExecutor<E> {
    fn submit(
        &self,
        monitor: &dyn PhaseMonitor,
        context: &ExecutionContext,
        job: Arc<dyn Job>,
        done: CompletionSender,
    ) -> anyhow::Result<Box<dyn Executing>> {
        let id = job.id().to_string();
        self.submitted.lock().unwrap().push(id.clone());

        if self.refuse.contains(&id) {
            return Err(anyhow!("executor refused to start job '{id}'"));
        }

        let inner = self.inner.submit(monitor, context, job, done)?;
        let mut handle = RecordingHandle {
            id,
            inner,
            cancelled: Arc::clone(&self.cancelled),
        };
        if self.cancel_on_submit.contains(&handle.id) {
            handle.cancel();
        }
        Ok(Box::new(handle))
    }
}

struct RecordingHandle {
    id: String,
    inner: Box<dyn Executing>,
    cancelled: Arc<Mutex<Vec<String>>>,
}

impl Executing for RecordingHandle {
    fn job(&self) -> &Arc<dyn Job> {
        self.inner.job()
    }

    fn state(&self) -> ExecutionState {
        self.inner.state()
    }

    fn outcome(&mut self) -> OutcomeFuture<'_> {
        self.inner.outcome()
    }

    fn cancel(&mut self) {
        self.cancelled.lock().unwrap().push(self.id.clone());
        self.inner.cancel();
    }
}
