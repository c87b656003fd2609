// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{RawRoutinesFile, RoutinesFile};
use crate::errors::Result;

/// Environment variable naming the routines file.
pub const CONFIG_ENV: &str = "ROUTINES_CONFIG";

/// Load a routines file from a given path and return the raw `RawRoutinesFile`.
///
/// This only performs TOML deserialization; it does **not** build routines.
/// Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawRoutinesFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let raw: RawRoutinesFile = toml::from_str(&contents)?;

    Ok(raw)
}

/// Load a routines file from path and build the routine registry.
///
/// This is the recommended entry point for the rest of the application:
///
/// - Reads TOML (unknown keys are rejected).
/// - Builds each routine and command, in priority order.
/// - Reports every malformed declaration as improperly configured.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<RoutinesFile> {
    let raw = load_from_path(&path)?;
    RoutinesFile::try_from(raw)
}

/// Parse and validate routines from a TOML string.
pub fn parse_str(contents: &str) -> Result<RoutinesFile> {
    let raw: RawRoutinesFile = toml::from_str(contents)?;
    RoutinesFile::try_from(raw)
}

/// Resolve the default routines file path.
///
/// `ROUTINES_CONFIG` if set, otherwise `Routines.toml` in the current
/// working directory.
pub fn default_config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("Routines.toml"))
}
