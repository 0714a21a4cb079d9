// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::types::PolicyKind;

/// Command-line arguments for `jobphase`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "jobphase",
    version,
    about = "Run a phase of dependent jobs on bounded worker pools.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the phase file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Phase.toml")]
    pub phase: String,

    /// Error policy, overriding the phase file and the phase default.
    #[arg(long, value_enum, value_name = "POLICY")]
    pub policy: Option<PolicyArg>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `JOBPHASE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the execution order, but don't run any job.
    #[arg(long)]
    pub dry_run: bool,
}

/// Error policy as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum PolicyArg {
    Strict,
    BestEffort,
}

impl From<PolicyArg> for PolicyKind {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Strict => PolicyKind::Strict,
            PolicyArg::BestEffort => PolicyKind::BestEffort,
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
