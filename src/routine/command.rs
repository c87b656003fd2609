// src/routine/command.rs

//! A single unit of work inside a routine.

use std::collections::BTreeSet;
use std::fmt;

use crate::errors::{Result, RoutineError};
use crate::hooks::HookRef;
use crate::types::{CommandOutcome, Options, option_value_to_string, to_symbol};

/// Which side of the process boundary a command runs on.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    /// In-process command, dispatched by name to a registered handler.
    ///
    /// `options` are keyword options passed to the handler (or converted to
    /// CLI flags when the command is forced into a subprocess).
    Management { options: Options },
    /// External process; the invocation is the argv passed to the OS.
    System,
}

impl CommandKind {
    pub fn label(&self) -> &'static str {
        match self {
            CommandKind::Management { .. } => "management",
            CommandKind::System => "system",
        }
    }
}

/// One command of a routine.
///
/// Commands are plain values: a run always works on its own copy, so any
/// mutation done by hooks (rewriting the invocation, replacing the result)
/// stays local to that run.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub kind: CommandKind,
    /// Command name followed by its arguments. Never empty.
    pub invocation: Vec<String>,
    /// Execution order within the routine; ties run in declaration order.
    pub priority: i64,
    /// Normalised switch names; an empty list means "always included".
    pub switches: Vec<String>,
    pub pre_hook: Option<HookRef>,
    pub post_hook: Option<HookRef>,
    /// Filled in by the runner once the command has executed.
    pub result: Option<CommandOutcome>,
}

impl Command {
    /// An in-process command.
    pub fn management<I, S>(invocation: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            CommandKind::Management {
                options: Options::new(),
            },
            invocation,
        )
    }

    /// An external-process command.
    pub fn system<I, S>(invocation: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(CommandKind::System, invocation)
    }

    fn new<I, S>(kind: CommandKind, invocation: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let invocation: Vec<String> = invocation.into_iter().map(Into::into).collect();
        if invocation.first().is_none_or(|name| name.is_empty()) {
            return Err(RoutineError::ImproperlyConfigured(format!(
                "`{}` must be set for a {} command",
                kind.label(),
                kind.label()
            )));
        }
        Ok(Self {
            kind,
            invocation,
            priority: 0,
            switches: Vec::new(),
            pre_hook: None,
            post_hook: None,
            result: None,
        })
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    /// Gate the command behind the given switches (names are normalised and
    /// de-duplicated, declaration order kept).
    pub fn with_switches<I, S>(mut self, switches: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for switch in switches {
            let symbol = to_symbol(switch.as_ref());
            if !self.switches.contains(&symbol) {
                self.switches.push(symbol);
            }
        }
        self
    }

    /// Set a keyword option. Only management commands take options.
    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<toml::Value>) -> Result<Self> {
        match &mut self.kind {
            CommandKind::Management { options } => {
                options.insert(name.into(), value.into());
                Ok(self)
            }
            CommandKind::System => Err(RoutineError::ImproperlyConfigured(format!(
                "options are not valid for system command `{}`",
                self.invocation.join(" ")
            ))),
        }
    }

    pub fn with_pre_hook(mut self, hook: HookRef) -> Self {
        self.pre_hook = Some(hook);
        self
    }

    pub fn with_post_hook(mut self, hook: HookRef) -> Self {
        self.post_hook = Some(hook);
        self
    }

    pub fn name(&self) -> &str {
        // Constructors reject empty invocations; hooks that clear it get "".
        self.invocation.first().map(String::as_str).unwrap_or("")
    }

    pub fn args(&self) -> &[String] {
        self.invocation.get(1..).unwrap_or(&[])
    }

    pub fn is_management(&self) -> bool {
        matches!(self.kind, CommandKind::Management { .. })
    }

    /// Keyword options (always empty for system commands).
    pub fn options(&self) -> Option<&Options> {
        match &self.kind {
            CommandKind::Management { options } => Some(options),
            CommandKind::System => None,
        }
    }

    /// True if the command runs for the given set of active switches.
    pub fn is_active(&self, active: &BTreeSet<String>) -> bool {
        self.switches.is_empty() || self.switches.iter().any(|s| active.contains(s))
    }

    /// One-line listing form: `[priority] command (k=v, ...) | switch, ...`.
    pub fn listing(&self) -> String {
        let mut line = format!("[{}] {}", self.priority, self);
        if let Some(options) = self.options().filter(|o| !o.is_empty()) {
            let rendered: Vec<String> = options
                .iter()
                .map(|(k, v)| format!("{k}={}", option_value_to_string(v)))
                .collect();
            line.push_str(&format!(" ({})", rendered.join(", ")));
        }
        if !self.switches.is_empty() {
            let switches: Vec<String> = self
                .switches
                .iter()
                .map(|s| s.replace('_', "-"))
                .collect();
            line.push_str(&format!(" | {}", switches.join(", ")));
        }
        line
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.invocation.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_invocation_is_rejected() {
        assert!(Command::management(Vec::<String>::new()).is_err());
        assert!(Command::system([""]).is_err());
    }

    #[test]
    fn name_and_args_split_the_invocation() {
        let cmd = Command::management(["track", "2", "--x"]).unwrap();
        assert_eq!(cmd.name(), "track");
        assert_eq!(cmd.args(), ["2".to_string(), "--x".to_string()]);
        assert_eq!(cmd.to_string(), "track 2 --x");
    }

    #[test]
    fn system_commands_reject_options() {
        let cmd = Command::system(["echo", "hi"]).unwrap();
        assert!(cmd.with_option("demo", 1).is_err());
    }

    #[test]
    fn switches_are_normalised_and_deduplicated() {
        let cmd = Command::system(["ls"])
            .unwrap()
            .with_switches(["--initial-data", "demo", "initial_data"]);
        assert_eq!(cmd.switches, vec!["initial_data", "demo"]);
    }

    #[test]
    fn listing_shows_options_and_switches() {
        let cmd = Command::management(["track", "4"])
            .unwrap()
            .with_priority(3)
            .with_option("demo", 6)
            .unwrap()
            .with_option("flag", true)
            .unwrap()
            .with_switches(["initial", "demo"]);
        assert_eq!(cmd.listing(), "[3] track 4 (demo=6, flag=true) | initial, demo");
        assert_eq!(Command::system(["ls"]).unwrap().listing(), "[0] ls");
    }
}
