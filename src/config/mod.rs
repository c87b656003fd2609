// src/config/mod.rs

//! Routines file loading.
//!
//! - [`model`] mirrors the TOML layout with `serde`.
//! - [`loader`] reads files.
//! - [`validate`] turns the raw model into a frozen routine registry.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{CONFIG_ENV, default_config_path, load_and_validate, load_from_path, parse_str};
pub use model::{ConfigSection, Invocation, RawCommand, RawRoutine, RawRoutinesFile, RoutinesFile};
