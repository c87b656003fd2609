// src/errors.rs

//! Crate-wide error type and result alias.

use clap::error::ErrorKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RoutineError {
    /// Malformed routine declaration, unknown hook reference, bad TOML.
    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    #[error("Routine not found: {0}")]
    RoutineNotFound(String),

    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Subprocess command failed: {command} with return code {code}.")]
    SubprocessFailed { command: String, code: i32 },

    #[error("Failed to convert {command} options to CLI format: {options}")]
    UnconvertibleOptions { command: String, options: String },

    #[error("{0}")]
    Usage(String),

    /// `--help` was requested; carries the rendered help text.
    #[error("{0}")]
    Help(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<toml::de::Error> for RoutineError {
    fn from(err: toml::de::Error) -> Self {
        RoutineError::ImproperlyConfigured(format!("invalid routines TOML: {err}"))
    }
}

impl From<clap::Error> for RoutineError {
    fn from(err: clap::Error) -> Self {
        match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                RoutineError::Help(err.render().to_string())
            }
            _ => RoutineError::Usage(err.to_string()),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RoutineError>;
