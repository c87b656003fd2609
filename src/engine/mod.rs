// src/engine/mod.rs

//! Routine execution engine.
//!
//! This module ties together:
//! - the effective policy of a run (routine defaults plus per-run overrides)
//! - the failure decision taken when a command errors
//! - transaction scoping for atomic runs
//! - the async runner that walks the resolved plan
//!
//! The pure decisions live in [`policy`]; the async/IO shell is implemented
//! in [`runner`].

use std::collections::{BTreeMap, BTreeSet};

use crate::routine::Command;
use crate::types::{CommandOutcome, to_symbol};

pub mod policy;
pub mod runner;
pub mod transaction;

pub use policy::{FailureAction, Policy, PolicyOverrides, decide_failure};
pub use runner::Runner;
pub use transaction::{NoTransactions, Transaction, TransactionProvider};

/// Default script name used to re-invoke in-process commands as subprocesses.
pub const DEFAULT_MANAGE_SCRIPT: &str = "routine";

/// Options visible to hooks, callbacks and signal listeners during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub subprocess: bool,
    pub atomic: bool,
    pub continue_on_error: bool,
    pub all: bool,
    /// Every switch the routine declares, with whether it is active.
    pub switches: BTreeMap<String, bool>,
    pub verbosity: u8,
    /// True when the verbosity was explicitly requested for this run.
    pub verbosity_explicit: bool,
    pub manage_script: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            subprocess: false,
            atomic: false,
            continue_on_error: false,
            all: false,
            switches: BTreeMap::new(),
            verbosity: 1,
            verbosity_explicit: false,
            manage_script: DEFAULT_MANAGE_SCRIPT.to_string(),
        }
    }
}

/// What the caller asks of a single run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunRequest {
    /// Requested switch names (normalised on use).
    pub switches: BTreeSet<String>,
    /// Activate every switch the routine declares.
    pub all: bool,
    pub overrides: PolicyOverrides,
    /// Explicit verbosity; `None` keeps the default of 1 and is not
    /// forwarded to commands.
    pub verbosity: Option<u8>,
}

impl RunRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_switches<I, S>(mut self, switches: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.switches
            .extend(switches.into_iter().map(|s| to_symbol(s.as_ref())));
        self
    }

    pub fn with_all(mut self, all: bool) -> Self {
        self.all = all;
        self
    }

    pub fn with_subprocess(mut self, subprocess: bool) -> Self {
        self.overrides.subprocess = Some(subprocess);
        self
    }

    pub fn with_atomic(mut self, atomic: bool) -> Self {
        self.overrides.atomic = Some(atomic);
        self
    }

    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.overrides.continue_on_error = Some(continue_on_error);
        self
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = Some(verbosity);
        self
    }
}

/// What a finished run hands back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub routine: String,
    /// The resolved plan, with each executed command's `result` filled in.
    pub plan: Vec<Command>,
    /// Outcomes in execution order (skipped commands contribute nothing).
    pub results: Vec<CommandOutcome>,
    pub early_exit: bool,
    /// Plan index of the last command that actually ran.
    pub last_index: Option<usize>,
}
