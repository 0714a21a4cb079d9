// src/job/context.rs

use std::collections::BTreeMap;

use crate::types::ExecutionPhase;

/// Identifiers and variables of the execution a phase belongs to.
///
/// The scheduler passes this through to jobs, monitors and error policies
/// without looking at it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionContext {
    pub batch_id: String,
    pub flow_id: String,
    pub execution_id: String,
    pub phase: ExecutionPhase,
    pub arguments: BTreeMap<String, String>,
}

impl ExecutionContext {
    pub fn new(
        batch_id: impl Into<String>,
        flow_id: impl Into<String>,
        execution_id: impl Into<String>,
        phase: ExecutionPhase,
    ) -> Self {
        Self {
            batch_id: batch_id.into(),
            flow_id: flow_id.into(),
            execution_id: execution_id.into(),
            phase,
            arguments: BTreeMap::new(),
        }
    }

    pub fn with_argument(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    /// Environment variables describing this context, for external commands.
    pub fn environment(&self) -> Vec<(String, String)> {
        let mut env = vec![
            ("JOBPHASE_BATCH_ID".to_string(), self.batch_id.clone()),
            ("JOBPHASE_FLOW_ID".to_string(), self.flow_id.clone()),
            ("JOBPHASE_EXECUTION_ID".to_string(), self.execution_id.clone()),
            ("JOBPHASE_PHASE".to_string(), self.phase.to_string()),
        ];
        for (key, value) in &self.arguments {
            env.push((format!("JOBPHASE_ARG_{}", key.to_uppercase()), value.clone()));
        }
        env
    }
}
