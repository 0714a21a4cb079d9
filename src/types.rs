use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// The phase of a flow execution a job batch belongs to.
///
/// Phases run one after another; each phase is one scheduler run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionPhase {
    Setup,
    Initialize,
    Import,
    Prologue,
    #[default]
    Main,
    Epilogue,
    Export,
    Finalize,
    Cleanup,
}

impl ExecutionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionPhase::Setup => "setup",
            ExecutionPhase::Initialize => "initialize",
            ExecutionPhase::Import => "import",
            ExecutionPhase::Prologue => "prologue",
            ExecutionPhase::Main => "main",
            ExecutionPhase::Epilogue => "epilogue",
            ExecutionPhase::Export => "export",
            ExecutionPhase::Finalize => "finalize",
            ExecutionPhase::Cleanup => "cleanup",
        }
    }

    /// Error policy used when none is configured explicitly.
    ///
    /// Finalize and cleanup are best-effort so that as much as possible gets
    /// tidied up; every other phase stops at the first failure.
    pub fn default_policy(&self) -> PolicyKind {
        match self {
            ExecutionPhase::Finalize | ExecutionPhase::Cleanup => PolicyKind::BestEffort,
            _ => PolicyKind::Strict,
        }
    }
}

impl fmt::Display for ExecutionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "setup" => Ok(ExecutionPhase::Setup),
            "initialize" => Ok(ExecutionPhase::Initialize),
            "import" => Ok(ExecutionPhase::Import),
            "prologue" => Ok(ExecutionPhase::Prologue),
            "main" => Ok(ExecutionPhase::Main),
            "epilogue" => Ok(ExecutionPhase::Epilogue),
            "export" => Ok(ExecutionPhase::Export),
            "finalize" => Ok(ExecutionPhase::Finalize),
            "cleanup" => Ok(ExecutionPhase::Cleanup),
            other => Err(format!("invalid execution phase: {other}")),
        }
    }
}

/// Which built-in error policy to apply to a phase.
///
/// - `Strict`: the first recoverable failure aborts the phase.
/// - `BestEffort`: recoverable failures are tolerated; independent work keeps
///   running and the phase still ends in failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    Strict,
    BestEffort,
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "strict" => Ok(PolicyKind::Strict),
            "best_effort" => Ok(PolicyKind::BestEffort),
            other => Err(format!(
                "invalid error policy: {other} (expected \"strict\" or \"best_effort\")"
            )),
        }
    }
}

/// Terminal status reported to the phase monitor, once per submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Success,
    Failed,
    Cancelled,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Success => "SUCCESS",
            JobStatus::Failed => "FAILED",
            JobStatus::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleanup_phases_default_to_best_effort() {
        assert_eq!(ExecutionPhase::Cleanup.default_policy(), PolicyKind::BestEffort);
        assert_eq!(ExecutionPhase::Finalize.default_policy(), PolicyKind::BestEffort);
        assert_eq!(ExecutionPhase::Setup.default_policy(), PolicyKind::Strict);
        assert_eq!(ExecutionPhase::Main.default_policy(), PolicyKind::Strict);
    }

    #[test]
    fn policy_kind_accepts_dashes() {
        assert_eq!("best-effort".parse::<PolicyKind>(), Ok(PolicyKind::BestEffort));
        assert_eq!(" STRICT ".parse::<PolicyKind>(), Ok(PolicyKind::Strict));
        assert!("lenient".parse::<PolicyKind>().is_err());
    }
}
