// src/policy.rs

//! Error policies: whether a phase keeps going after a recoverable failure.

use crate::job::ExecutionContext;
use crate::types::PolicyKind;

/// Decides whether a recoverable job failure is tolerated.
///
/// Only recoverable failures (and failed submissions) reach the policy;
/// cancellations and fatal failures always abort the phase.
pub trait ErrorPolicy: Send + Sync {
    fn should_continue(&self, context: &ExecutionContext, error: &anyhow::Error) -> bool;
}

impl<F> ErrorPolicy for F
where
    F: Fn(&ExecutionContext, &anyhow::Error) -> bool + Send + Sync,
{
    fn should_continue(&self, context: &ExecutionContext, error: &anyhow::Error) -> bool {
        self(context, error)
    }
}

/// Never tolerates a failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct Strict;

impl ErrorPolicy for Strict {
    fn should_continue(&self, _context: &ExecutionContext, _error: &anyhow::Error) -> bool {
        false
    }
}

/// Always tolerates recoverable failures.
#[derive(Debug, Clone, Copy, Default)]
pub struct BestEffort;

impl ErrorPolicy for BestEffort {
    fn should_continue(&self, _context: &ExecutionContext, _error: &anyhow::Error) -> bool {
        true
    }
}

impl PolicyKind {
    pub fn policy(&self) -> &'static dyn ErrorPolicy {
        match self {
            PolicyKind::Strict => &Strict,
            PolicyKind::BestEffort => &BestEffort,
        }
    }
}
