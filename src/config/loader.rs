// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{PhaseFile, RawPhaseFile};
use crate::errors::Result;

/// Load a phase file from a given path and return the raw `RawPhaseFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawPhaseFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    let raw: RawPhaseFile = toml::from_str(&contents)?;
    Ok(raw)
}

/// Load a phase file from path and validate it.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks for:
///   - at least one job,
///   - sane worker pool sizes,
///   - jobs blocking on themselves.
///
/// Cycles are left to the scheduler, which reports them as a deadlock.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<PhaseFile> {
    let raw = load_from_path(&path)?;
    PhaseFile::try_from(raw)
}
