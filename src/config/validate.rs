// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::warn;

use crate::config::model::{PhaseFile, RawPhaseFile};
use crate::errors::{PhaseError, Result};
use crate::job::JobId;

impl TryFrom<RawPhaseFile> for PhaseFile {
    type Error = PhaseError;

    fn try_from(raw: RawPhaseFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_phase(&raw)?;
        Ok(PhaseFile::new_unchecked(raw))
    }
}

fn validate_raw_phase(cfg: &RawPhaseFile) -> Result<()> {
    ensure_has_jobs(cfg)?;
    cfg.scheduler.parallel.validate()?;
    validate_blockers(cfg)?;
    Ok(())
}

fn ensure_has_jobs(cfg: &RawPhaseFile) -> Result<()> {
    if cfg.job.is_empty() {
        return Err(PhaseError::ConfigError(
            "phase file must contain at least one [job.<id>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_blockers(cfg: &RawPhaseFile) -> Result<()> {
    for (id, job) in cfg.job.iter() {
        for blocker in job.blockers.iter() {
            if blocker == id {
                return Err(PhaseError::ConfigError(format!(
                    "job '{id}' cannot list itself in `blockers`"
                )));
            }
            if !cfg.job.contains_key(blocker) {
                // Not fatal: the scheduler treats blockers outside the phase
                // as already satisfied.
                warn!(
                    job = %id,
                    blocker = %blocker,
                    "blocker is not part of this phase; it will be treated as satisfied"
                );
            }
        }
    }
    Ok(())
}

/// Compute one dependency-respecting order of the phase's jobs.
///
/// Fails with a `ConfigError` naming a job on a cycle. Blockers outside the
/// phase are ignored.
pub fn execution_order(cfg: &PhaseFile) -> Result<Vec<JobId>> {
    // Edge direction: blocker -> job.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for id in cfg.job.keys() {
        graph.add_node(id.as_str());
    }

    for (id, job) in cfg.job.iter() {
        for blocker in job.blockers.iter() {
            if cfg.job.contains_key(blocker) {
                graph.add_edge(blocker.as_str(), id.as_str(), ());
            }
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
        Err(cycle) => Err(PhaseError::ConfigError(format!(
            "cycle detected in job graph involving job '{}'",
            cycle.node_id()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Result<PhaseFile> {
        let raw: RawPhaseFile = toml::from_str(src)?;
        PhaseFile::try_from(raw)
    }

    #[test]
    fn order_respects_blockers() {
        let cfg = parse(
            r#"
[job.c]
cmd = "echo c"
blockers = ["a", "b"]

[job.b]
cmd = "echo b"
blockers = ["a"]

[job.a]
cmd = "echo a"
"#,
        )
        .expect("valid phase");

        let order = execution_order(&cfg).expect("acyclic");
        let pos = |id: &str| order.iter().position(|j| j == id).unwrap();
        assert!(pos("a") < pos("b"));
        assert!(pos("b") < pos("c"));
    }

    #[test]
    fn cycle_is_reported_by_execution_order_not_by_loading() {
        let cfg = parse(
            r#"
[job.a]
cmd = "echo a"
blockers = ["b"]

[job.b]
cmd = "echo b"
blockers = ["a"]
"#,
        )
        .expect("cycles are accepted at load time");

        match execution_order(&cfg) {
            Err(PhaseError::ConfigError(msg)) => assert!(msg.contains("cycle detected")),
            other => panic!("expected cycle error, got {other:?}"),
        }
    }

    #[test]
    fn self_blocker_is_rejected() {
        let err = parse(
            r#"
[job.a]
cmd = "echo a"
blockers = ["a"]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, PhaseError::ConfigError(ref msg) if msg.contains("itself")));
    }
}
