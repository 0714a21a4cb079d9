use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;

use crate::errors::{PhaseError, Result};
use crate::job::{CommandJob, DEFAULT_RESOURCE_ID, ExecutionContext, Job};
use crate::types::{ExecutionPhase, PolicyKind};

/// Phase file as read from TOML, before validation.
///
/// ```toml
/// error_policy = "best_effort"
///
/// [context]
/// batch_id = "b"
/// flow_id = "f"
/// execution_id = "e"
/// phase = "main"
///
/// [scheduler.parallel]
/// default = 2
/// db = 1
///
/// [job.extract]
/// cmd = "echo extract"
/// resource = "db"
///
/// [job.load]
/// cmd = "echo load"
/// blockers = ["extract"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawPhaseFile {
    /// Overrides the phase's default error policy.
    #[serde(default)]
    pub error_policy: Option<PolicyKind>,

    #[serde(default)]
    pub context: ContextSection,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// All jobs from `[job.<id>]`, keyed by job id.
    #[serde(default)]
    pub job: BTreeMap<String, JobConfig>,
}

/// A validated phase file.
///
/// Only constructed through `TryFrom<RawPhaseFile>` (see `validate.rs`).
#[derive(Debug, Clone)]
pub struct PhaseFile {
    pub error_policy: Option<PolicyKind>,
    pub context: ContextSection,
    pub scheduler: SchedulerConfig,
    pub job: BTreeMap<String, JobConfig>,
}

impl PhaseFile {
    pub(crate) fn new_unchecked(raw: RawPhaseFile) -> Self {
        Self {
            error_policy: raw.error_policy,
            context: raw.context,
            scheduler: raw.scheduler,
            job: raw.job,
        }
    }

    pub fn execution_context(&self) -> ExecutionContext {
        self.context.to_execution_context()
    }

    /// Configured policy, falling back to the phase default.
    pub fn policy_kind(&self) -> PolicyKind {
        self.error_policy
            .unwrap_or_else(|| self.context.phase.default_policy())
    }

    /// Build the runnable jobs, ordered by job id.
    pub fn jobs(&self) -> Vec<Arc<dyn Job>> {
        self.job
            .iter()
            .map(|(id, jc)| Arc::new(jc.to_command_job(id)) as Arc<dyn Job>)
            .collect()
    }
}

/// `[context]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ContextSection {
    #[serde(default = "default_batch_id")]
    pub batch_id: String,

    #[serde(default = "default_flow_id")]
    pub flow_id: String,

    #[serde(default = "default_execution_id")]
    pub execution_id: String,

    #[serde(default)]
    pub phase: ExecutionPhase,

    /// Batch arguments, exported to commands as `JOBPHASE_ARG_<KEY>`.
    #[serde(default)]
    pub arguments: BTreeMap<String, String>,
}

fn default_batch_id() -> String {
    "batch".to_string()
}

fn default_flow_id() -> String {
    "flow".to_string()
}

fn default_execution_id() -> String {
    "execution".to_string()
}

impl Default for ContextSection {
    fn default() -> Self {
        Self {
            batch_id: default_batch_id(),
            flow_id: default_flow_id(),
            execution_id: default_execution_id(),
            phase: ExecutionPhase::default(),
            arguments: BTreeMap::new(),
        }
    }
}

impl ContextSection {
    pub fn to_execution_context(&self) -> ExecutionContext {
        ExecutionContext {
            batch_id: self.batch_id.clone(),
            flow_id: self.flow_id.clone(),
            execution_id: self.execution_id.clone(),
            phase: self.phase,
            arguments: self.arguments.clone(),
        }
    }
}

/// `[scheduler]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub parallel: ParallelConfig,
}

/// `[scheduler.parallel]`: worker pool sizes.
///
/// `default` is mandatory; every other key names a resource with its own
/// pool.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ParallelConfig {
    pub default: usize,

    #[serde(flatten)]
    pub resources: BTreeMap<String, usize>,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self::with_default(1)
    }
}

impl ParallelConfig {
    pub fn with_default(size: usize) -> Self {
        Self {
            default: size,
            resources: BTreeMap::new(),
        }
    }

    pub fn with_resource(mut self, resource: impl Into<String>, size: usize) -> Self {
        self.resources.insert(resource.into(), size);
        self
    }

    /// Every pool must allow at least one job.
    pub fn validate(&self) -> Result<()> {
        if self.default == 0 {
            return Err(PhaseError::ConfigError(format!(
                "[scheduler.parallel].{DEFAULT_RESOURCE_ID} must be >= 1 (got 0)"
            )));
        }
        for (resource, &limit) in &self.resources {
            if limit == 0 {
                return Err(PhaseError::ConfigError(format!(
                    "[scheduler.parallel].{resource} must be >= 1 (got 0)"
                )));
            }
        }
        Ok(())
    }
}

/// `[job.<id>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    /// Shell command to run.
    pub cmd: String,

    /// Jobs that must succeed before this one starts.
    #[serde(default)]
    pub blockers: Vec<String>,

    #[serde(default)]
    pub label: Option<String>,

    /// Worker pool to run on; `default` if unset.
    #[serde(default)]
    pub resource: Option<String>,
}

impl JobConfig {
    pub fn to_command_job(&self, id: &str) -> CommandJob {
        let mut job = CommandJob::new(id, self.cmd.clone()).with_blockers(self.blockers.iter().cloned());
        if let Some(ref label) = self.label {
            job = job.with_label(label.clone());
        }
        if let Some(ref resource) = self.resource {
            job = job.with_resource(resource.clone());
        }
        job
    }
}
