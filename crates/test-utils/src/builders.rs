use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use tokio::sync::Barrier;

use jobphase::errors::JobError;
use jobphase::job::{DEFAULT_RESOURCE_ID, ExecutionContext, Job, JobFuture};
use jobphase::monitor::ExecutionMonitor;

/// What a [`MockJob`] does when it runs.
#[derive(Debug, Clone)]
pub enum Behaviour {
    Succeed,
    /// Fail with a recoverable error carrying this message.
    Fail(String),
    /// Fail with a fatal error carrying this message.
    Fatal(String),
    /// Panic with this message.
    Panic(String),
    /// Report that the caller interrupted the job.
    Interrupt,
    /// Succeed after sleeping.
    Sleep(Duration),
    /// Succeed once every party reached the barrier.
    Barrier(Arc<Barrier>),
    /// Never finish on its own.
    Hang,
}

/// Start/finish events recorded by mock jobs, shared across a test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Started(String),
    Finished(String),
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionLog(Arc<Mutex<Vec<Event>>>);

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    /// Ids of jobs that started, in start order.
    pub fn started(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Started(id) => Some(id),
                Event::Finished(_) => None,
            })
            .collect()
    }

    pub fn was_started(&self, id: &str) -> bool {
        self.started().iter().any(|s| s == id)
    }

    /// Whether `first` finished before `then` started.
    pub fn finished_before_started(&self, first: &str, then: &str) -> bool {
        let events = self.events();
        let finished = events
            .iter()
            .position(|e| *e == Event::Finished(first.to_string()));
        let started = events
            .iter()
            .position(|e| *e == Event::Started(then.to_string()));
        matches!((finished, started), (Some(f), Some(s)) if f < s)
    }
}

/// Scriptable job for scheduler tests.
#[derive(Debug, Clone)]
pub struct MockJob {
    id: String,
    blockers: HashSet<String>,
    resource: String,
    behaviour: Behaviour,
    log: ExecutionLog,
}

impl MockJob {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            blockers: HashSet::new(),
            resource: DEFAULT_RESOURCE_ID.to_string(),
            behaviour: Behaviour::Succeed,
            log: ExecutionLog::new(),
        }
    }

    pub fn after(mut self, blocker: &str) -> Self {
        self.blockers.insert(blocker.to_string());
        self
    }

    pub fn resource(mut self, resource: &str) -> Self {
        self.resource = resource.to_string();
        self
    }

    pub fn behaviour(mut self, behaviour: Behaviour) -> Self {
        self.behaviour = behaviour;
        self
    }

    pub fn fails(self, message: &str) -> Self {
        self.behaviour(Behaviour::Fail(message.to_string()))
    }

    pub fn hangs(self) -> Self {
        self.behaviour(Behaviour::Hang)
    }

    pub fn logged_to(mut self, log: &ExecutionLog) -> Self {
        self.log = log.clone();
        self
    }

    pub fn build(self) -> Arc<dyn Job> {
        Arc::new(self)
    }

    async fn run(&self, mut monitor: Box<dyn ExecutionMonitor>) -> Result<(), JobError> {
        monitor.open(1.0);
        self.log.push(Event::Started(self.id.clone()));

        let result = match &self.behaviour {
            Behaviour::Succeed => Ok(()),
            Behaviour::Fail(msg) => Err(JobError::recoverable(anyhow!("{msg}"))),
            Behaviour::Fatal(msg) => Err(JobError::fatal(anyhow!("{msg}"))),
            Behaviour::Panic(msg) => panic!("{msg}"),
            Behaviour::Interrupt => Err(JobError::Interrupted),
            Behaviour::Sleep(d) => {
                tokio::time::sleep(*d).await;
                Ok(())
            }
            Behaviour::Barrier(barrier) => {
                barrier.wait().await;
                Ok(())
            }
            Behaviour::Hang => std::future::pending::<Result<(), JobError>>().await,
        };

        self.log.push(Event::Finished(self.id.clone()));
        monitor.close();
        result
    }
}

impl Job for MockJob {
    fn id(&self) -> &str {
        &self.id
    }

    fn blocker_ids(&self) -> &HashSet<String> {
        &self.blockers
    }

    fn resource_id(&self) -> &str {
        &self.resource
    }

    fn execute<'a>(
        &'a self,
        monitor: Box<dyn ExecutionMonitor>,
        _context: &'a ExecutionContext,
    ) -> JobFuture<'a> {
        Box::pin(self.run(monitor))
    }
}

/// Context used by tests that don't care about it.
pub fn test_context() -> ExecutionContext {
    ExecutionContext::new("b", "f", "e", jobphase::types::ExecutionPhase::Main)
}
