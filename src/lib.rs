// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod job;
pub mod logging;
pub mod monitor;
pub mod policy;
pub mod scheduler;
pub mod types;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{PhaseFile, execution_order, load_and_validate};
use crate::monitor::{CancelFlag, LoggingPhaseMonitor};
use crate::types::PolicyKind;

pub use crate::errors::{JobError, PhaseError};
pub use crate::job::{ExecutionContext, Job, JobId};
pub use crate::monitor::PhaseMonitor;
pub use crate::policy::{BestEffort, ErrorPolicy, Strict};
pub use crate::scheduler::PhaseScheduler;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - phase file loading
/// - the logging monitor and Ctrl-C cancellation
/// - the thread-pool scheduler
pub async fn run(args: CliArgs) -> Result<()> {
    let phase_path = PathBuf::from(&args.phase);
    let phase = load_and_validate(&phase_path)
        .with_context(|| format!("loading phase file {}", phase_path.display()))?;

    let policy = args
        .policy
        .map(PolicyKind::from)
        .unwrap_or_else(|| phase.policy_kind());

    if args.dry_run {
        print_dry_run(&phase, policy);
        return Ok(());
    }

    let context = phase.execution_context();
    let cancel = CancelFlag::new();
    let monitor = LoggingPhaseMonitor::with_cancel_flag(&context, cancel.clone());

    // Ctrl-C → cancel the phase; running jobs get a cancellation request.
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        info!("Ctrl+C received; cancelling phase");
        cancel.cancel();
    });

    let scheduler = PhaseScheduler::from_config(&phase.scheduler)?;
    info!(?policy, "running phase from {}", phase_path.display());

    scheduler
        .execute(&monitor, &context, phase.jobs(), policy.policy())
        .await?;

    Ok(())
}

/// Dry-run output: context, pools, and one valid execution order.
fn print_dry_run(phase: &PhaseFile, policy: PolicyKind) {
    let ctx = &phase.context;
    println!("jobphase dry-run");
    println!(
        "  context = {}/{}/{} phase={}",
        ctx.batch_id, ctx.flow_id, ctx.execution_id, ctx.phase
    );
    println!("  error_policy = {policy:?}");
    println!("  parallel.default = {}", phase.scheduler.parallel.default);
    for (resource, limit) in &phase.scheduler.parallel.resources {
        println!("  parallel.{resource} = {limit}");
    }
    println!();

    match execution_order(phase) {
        Ok(order) => {
            println!("jobs ({}), in execution order:", order.len());
            for id in order {
                let Some(job) = phase.job.get(&id) else {
                    continue;
                };
                println!("  - {id}");
                println!("      cmd: {}", job.cmd);
                if let Some(ref label) = job.label {
                    println!("      label: {label}");
                }
                if !job.blockers.is_empty() {
                    println!("      blockers: {:?}", job.blockers);
                }
                if let Some(ref resource) = job.resource {
                    println!("      resource: {resource}");
                }
            }
        }
        Err(err) => {
            println!("jobs ({}): {err}", phase.job.len());
            println!("  running this phase would end in a deadlock");
        }
    }

    debug!("dry-run complete (no execution)");
}
