// tests/config_loading.rs

use std::io::Write;

use tempfile::NamedTempFile;

use jobphase::config::{execution_order, load_and_validate};
use jobphase::errors::PhaseError;
use jobphase::types::{ExecutionPhase, PolicyKind};

fn phase_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn full_phase_file_is_loaded() {
    let file = phase_file(
        r#"
error_policy = "strict"

[context]
batch_id = "nightly"
flow_id = "orders"
execution_id = "2024-01-01"
phase = "finalize"

[context.arguments]
date = "20240101"

[scheduler.parallel]
default = 2
db = 1

[job.extract]
cmd = "echo extract"
resource = "db"
label = "Extract orders"

[job.load]
cmd = "echo load"
blockers = ["extract"]
"#,
    );

    let phase = load_and_validate(file.path()).expect("valid phase file");

    assert_eq!(phase.context.phase, ExecutionPhase::Finalize);
    assert_eq!(phase.policy_kind(), PolicyKind::Strict);
    assert_eq!(phase.scheduler.parallel.default, 2);
    assert_eq!(phase.scheduler.parallel.resources.get("db"), Some(&1));

    let ctx = phase.execution_context();
    assert_eq!(ctx.batch_id, "nightly");
    assert_eq!(ctx.arguments.get("date").map(String::as_str), Some("20240101"));

    let jobs = phase.jobs();
    assert_eq!(jobs.len(), 2);
    let extract = jobs.iter().find(|j| j.id() == "extract").unwrap();
    assert_eq!(extract.label(), "Extract orders");
    assert_eq!(extract.resource_id(), "db");
    let load = jobs.iter().find(|j| j.id() == "load").unwrap();
    assert!(load.blocker_ids().contains("extract"));
    assert_eq!(load.resource_id(), "default");

    assert_eq!(execution_order(&phase).unwrap(), vec!["extract", "load"]);
}

#[test]
fn defaults_apply_when_sections_are_missing() {
    let file = phase_file(
        r#"
[job.only]
cmd = "true"
"#,
    );

    let phase = load_and_validate(file.path()).unwrap();

    assert_eq!(phase.context.phase, ExecutionPhase::Main);
    assert_eq!(ExecutionPhase::default(), ExecutionPhase::Main);
    assert_eq!(phase.scheduler.parallel.default, 1);
    assert!(phase.scheduler.parallel.resources.is_empty());
    assert_eq!(phase.policy_kind(), PolicyKind::Strict);
}

#[test]
fn jobs_are_built_in_id_order_not_file_order() {
    let file = phase_file(
        r#"
[job.zeta]
cmd = "true"

[job.alpha]
cmd = "true"

[job.mid]
cmd = "true"
"#,
    );

    let phase = load_and_validate(file.path()).unwrap();
    let ids: Vec<String> = phase.jobs().iter().map(|j| j.id().to_string()).collect();
    assert_eq!(ids, vec!["alpha", "mid", "zeta"]);
}

#[test]
fn cleanup_phase_defaults_to_best_effort() {
    let file = phase_file(
        r#"
[context]
phase = "cleanup"

[job.rm]
cmd = "true"
"#,
    );

    let phase = load_and_validate(file.path()).unwrap();
    assert_eq!(phase.policy_kind(), PolicyKind::BestEffort);
}

#[test]
fn phase_without_jobs_is_rejected() {
    let file = phase_file(
        r#"
[scheduler.parallel]
default = 1
"#,
    );

    match load_and_validate(file.path()) {
        Err(PhaseError::ConfigError(msg)) => assert!(msg.contains("at least one")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn zero_sized_resource_pool_is_rejected() {
    let file = phase_file(
        r#"
[scheduler.parallel]
default = 1
db = 0

[job.a]
cmd = "true"
"#,
    );

    match load_and_validate(file.path()) {
        Err(PhaseError::ConfigError(msg)) => assert!(msg.contains("db")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn parallel_section_requires_a_default_pool() {
    let file = phase_file(
        r#"
[scheduler.parallel]
db = 2

[job.a]
cmd = "true"
"#,
    );

    assert!(matches!(
        load_and_validate(file.path()),
        Err(PhaseError::TomlError(_))
    ));
}

#[test]
fn unknown_policy_name_is_a_parse_error() {
    let file = phase_file(
        r#"
error_policy = "sometimes"

[job.a]
cmd = "true"
"#,
    );

    assert!(matches!(
        load_and_validate(file.path()),
        Err(PhaseError::TomlError(_))
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("Phase.toml");

    assert!(matches!(
        load_and_validate(&missing),
        Err(PhaseError::IoError(_))
    ));
}
