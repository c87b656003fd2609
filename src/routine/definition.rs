// src/routine/definition.rs

use std::collections::{BTreeMap, BTreeSet};

use crate::hooks::{FinalizeRef, HookRef, InitializeRef};
use crate::routine::command::Command;
use crate::types::to_symbol;

/// A named, ordered batch of commands plus its execution policy.
///
/// `commands` is always sorted by ascending priority, with ties kept in
/// insertion order. The only way to add a command is [`Routine::add`], which
/// performs an ordered insert after the last command of equal priority.
#[derive(Debug, Clone, PartialEq)]
pub struct Routine {
    name: String,
    pub help_text: String,
    commands: Vec<Command>,
    /// Help text per (normalised) switch name.
    pub switch_helps: BTreeMap<String, String>,
    /// Run every command as a subprocess by default.
    pub subprocess: bool,
    /// Wrap the run in a single transaction by default.
    pub atomic: bool,
    /// Keep going after a failing command by default.
    pub continue_on_error: bool,
    pub initialize: Option<InitializeRef>,
    pub finalize: Option<FinalizeRef>,
    /// Default pre-hook for commands without their own.
    pub pre_hook: Option<HookRef>,
    /// Default post-hook for commands without their own.
    pub post_hook: Option<HookRef>,
}

impl Routine {
    pub fn new(name: &str, help_text: impl Into<String>) -> Self {
        Self {
            name: to_symbol(name),
            help_text: help_text.into(),
            commands: Vec::new(),
            switch_helps: BTreeMap::new(),
            subprocess: false,
            atomic: false,
            continue_on_error: false,
            initialize: None,
            finalize: None,
            pre_hook: None,
            post_hook: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Insert a command, keeping the priority order stable.
    pub fn add(&mut self, command: Command) -> &Command {
        let at = self
            .commands
            .partition_point(|existing| existing.priority <= command.priority);
        self.commands.insert(at, command);
        &self.commands[at]
    }

    pub fn with_command(mut self, command: Command) -> Self {
        self.add(command);
        self
    }

    pub fn with_switch_help(mut self, switch: &str, help: impl Into<String>) -> Self {
        self.switch_helps.insert(to_symbol(switch), help.into());
        self
    }

    /// Every distinct switch used by any command, sorted.
    pub fn switches(&self) -> Vec<String> {
        let switches: BTreeSet<&String> = self
            .commands
            .iter()
            .flat_map(|cmd| cmd.switches.iter())
            .collect();
        switches.into_iter().cloned().collect()
    }

    /// Help for one switch, empty if none was declared.
    pub fn switch_help(&self, switch: &str) -> &str {
        self.switch_helps
            .get(&to_symbol(switch))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Replace this routine's declaration with `newer` while keeping the
    /// commands already declared.
    ///
    /// Help text is kept when `newer` has none; switch help is merged with
    /// `newer` taking precedence; policy and callbacks come from `newer`.
    pub(crate) fn redeclare(&mut self, newer: Routine) {
        let Routine {
            help_text,
            commands,
            switch_helps,
            subprocess,
            atomic,
            continue_on_error,
            initialize,
            finalize,
            pre_hook,
            post_hook,
            ..
        } = newer;

        if !help_text.is_empty() {
            self.help_text = help_text;
        }
        self.switch_helps.extend(switch_helps);
        self.subprocess = subprocess;
        self.atomic = atomic;
        self.continue_on_error = continue_on_error;
        self.initialize = initialize;
        self.finalize = finalize;
        self.pre_hook = pre_hook;
        self.post_hook = post_hook;
        for command in commands {
            self.add(command);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str, priority: i64) -> Command {
        Command::management(["track", id]).unwrap().with_priority(priority)
    }

    #[test]
    fn add_keeps_priority_order_with_stable_ties() {
        let mut routine = Routine::new("test", "");
        routine.add(track("a", 3));
        routine.add(track("b", 0));
        routine.add(track("c", 3));
        routine.add(track("d", -1));
        routine.add(track("e", 0));

        let order: Vec<String> = routine.commands().iter().map(|c| c.to_string()).collect();
        assert_eq!(order, ["track d", "track b", "track e", "track a", "track c"]);
    }

    #[test]
    fn names_are_normalised() {
        let routine = Routine::new("--my-routine", "").with_switch_help("--initial-data", "x");
        assert_eq!(routine.name(), "my_routine");
        assert_eq!(routine.switch_help("initial_data"), "x");
    }

    #[test]
    fn switches_are_sorted_and_unique() {
        let routine = Routine::new("r", "")
            .with_command(track("1", 0).with_switches(["initial", "demo"]))
            .with_command(track("2", 0).with_switches(["demo"]));
        assert_eq!(routine.switches(), ["demo", "initial"]);
    }

    #[test]
    fn redeclaration_keeps_commands_and_help() {
        let mut routine = Routine::new("deploy", "Deploy it")
            .with_switch_help("prepare", "Prepare")
            .with_command(track("0", 0));
        let mut newer = Routine::new("deploy", "").with_switch_help("demo", "Demo");
        newer.atomic = true;
        routine.redeclare(newer.with_command(track("1", 0)));

        assert_eq!(routine.help_text, "Deploy it");
        assert!(routine.atomic);
        assert_eq!(routine.len(), 2);
        assert_eq!(routine.switch_help("prepare"), "Prepare");
        assert_eq!(routine.switch_help("demo"), "Demo");
    }
}
