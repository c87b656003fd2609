// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::routine::RoutineRegistry;
use crate::types::Options;

/// Top-level routines file as read from TOML.
///
/// ```toml
/// [config]
/// manage_script = "./bin/app"
///
/// [routine.deploy]
/// help_text = "Deploy the site."
/// switch_helps = { prepare = "Prepare the deployment." }
///
/// [[routine.deploy.commands]]
/// management = ["migrate"]
/// switches = ["prepare"]
/// ```
///
/// All sections are optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRoutinesFile {
    /// Global settings from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// All routines from `[routine.<name>]`, keyed by routine name.
    #[serde(default)]
    pub routine: BTreeMap<String, RawRoutine>,
}

/// `[config]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    /// Default for `--manage-script`: the program used to re-invoke
    /// in-process commands when they run as subprocesses.
    #[serde(default)]
    pub manage_script: Option<String>,
}

/// `[routine.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRoutine {
    #[serde(default)]
    pub help_text: String,

    #[serde(default)]
    pub subprocess: bool,

    #[serde(default)]
    pub atomic: bool,

    #[serde(default)]
    pub continue_on_error: bool,

    /// Named callbacks, resolved at run time.
    #[serde(default)]
    pub initialize: Option<String>,
    #[serde(default)]
    pub finalize: Option<String>,
    #[serde(default)]
    pub pre_hook: Option<String>,
    #[serde(default)]
    pub post_hook: Option<String>,

    #[serde(default)]
    pub switch_helps: BTreeMap<String, String>,

    #[serde(default)]
    pub commands: Vec<RawCommand>,
}

/// One `[[routine.<name>.commands]]` entry.
///
/// Exactly one of `management`, `command` (an alias of `management`) or
/// `system` must be given.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawCommand {
    #[serde(default)]
    pub management: Option<Invocation>,
    #[serde(default)]
    pub command: Option<Invocation>,
    #[serde(default)]
    pub system: Option<Invocation>,

    #[serde(default)]
    pub priority: i64,

    #[serde(default)]
    pub switches: Vec<String>,

    /// Keyword options; management commands only.
    #[serde(default)]
    pub options: Option<Options>,

    #[serde(default)]
    pub pre_hook: Option<String>,
    #[serde(default)]
    pub post_hook: Option<String>,
}

/// A command invocation: either a whitespace-separated line or the tokens.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Invocation {
    Line(String),
    Tokens(Vec<String>),
}

impl Invocation {
    pub fn into_tokens(self) -> Vec<String> {
        match self {
            Invocation::Line(line) => line.split_whitespace().map(str::to_string).collect(),
            Invocation::Tokens(tokens) => tokens,
        }
    }
}

/// Validated routines file.
///
/// Only constructed through `TryFrom<RawRoutinesFile>` (see
/// [`crate::config::validate`]), so the registry is always well formed.
#[derive(Debug, Clone)]
pub struct RoutinesFile {
    pub config: ConfigSection,
    pub registry: RoutineRegistry,
}
