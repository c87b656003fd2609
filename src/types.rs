// src/types.rs

//! Small shared types: option maps, command outcomes, name normalisation.

use std::collections::BTreeMap;
use std::fmt;

/// Keyword options passed to an in-process command.
///
/// Values come straight from the TOML declaration (or are parsed back from
/// CLI flags when a command is re-invoked with `routine call`).
pub type Options = BTreeMap<String, toml::Value>;

/// Normalise a routine or switch name into a symbol.
///
/// Leading dashes are stripped and internal dashes become underscores, so
/// `--initial-data`, `initial-data` and `initial_data` all refer to the same
/// switch.
pub fn to_symbol(name: &str) -> String {
    name.trim_start_matches('-').replace('-', "_")
}

/// Render a symbol as a long CLI option (`initial_data` -> `--initial-data`).
pub fn to_cli_option(name: &str) -> String {
    format!("--{}", to_symbol(name).replace('_', "-"))
}

/// Render an option value the way it appears on a command line or in a
/// plan listing (strings unquoted).
pub fn option_value_to_string(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Integer(i) => i.to_string(),
        toml::Value::Float(f) => f.to_string(),
        toml::Value::Boolean(b) => b.to_string(),
        toml::Value::Datetime(d) => d.to_string(),
        other => other.to_string(),
    }
}

/// Captured result of an external process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessOutput {
    /// Exit code; `-1` when the process was terminated by a signal.
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// What a command produced when it ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Return value of an in-process handler.
    Returned(Option<String>),
    /// Outcome of an external process.
    Process(ProcessOutput),
}

impl CommandOutcome {
    /// Text form of the outcome: the handler's return value or the captured
    /// stdout of a process.
    pub fn text(&self) -> Option<&str> {
        match self {
            CommandOutcome::Returned(value) => value.as_deref(),
            CommandOutcome::Process(out) => Some(out.stdout.as_str()),
        }
    }
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandOutcome::Returned(Some(value)) => write!(f, "{value}"),
            CommandOutcome::Returned(None) => write!(f, "None"),
            CommandOutcome::Process(out) => write!(f, "exit code {}", out.code),
        }
    }
}
