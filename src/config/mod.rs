// src/config/mod.rs

//! Phase file loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a phase file from disk (`loader.rs`).
//! - Validate basic invariants like pool sizes and job references
//!   (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{
    ContextSection, JobConfig, ParallelConfig, PhaseFile, RawPhaseFile, SchedulerConfig,
};
pub use validate::execution_order;
