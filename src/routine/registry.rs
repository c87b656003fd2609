// src/routine/registry.rs

//! Routine registry with an init-then-freeze lifecycle.
//!
//! [`RegistryBuilder`] collects declarations at startup (from a config file
//! and/or code). [`RegistryBuilder::build`] freezes them into a
//! [`RoutineRegistry`], which is only ever read afterwards.

use std::collections::BTreeMap;

use tracing::debug;

use crate::errors::{Result, RoutineError};
use crate::routine::command::Command;
use crate::routine::definition::Routine;
use crate::types::to_symbol;

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    routines: BTreeMap<String, Routine>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a routine.
    ///
    /// Declaring a name that already exists keeps the commands added so far
    /// (see [`Routine`] redeclaration rules).
    pub fn routine(&mut self, routine: Routine) -> &mut Routine {
        let name = routine.name().to_string();
        match self.routines.entry(name) {
            std::collections::btree_map::Entry::Occupied(entry) => {
                debug!(routine = %entry.key(), "redeclaring routine");
                let existing = entry.into_mut();
                existing.redeclare(routine);
                existing
            }
            std::collections::btree_map::Entry::Vacant(entry) => entry.insert(routine),
        }
    }

    /// Add a command to a routine, creating the routine (with no help text)
    /// if it has not been declared yet.
    pub fn command(&mut self, routine: &str, command: Command) -> &Command {
        let name = to_symbol(routine);
        self.routines
            .entry(name.clone())
            .or_insert_with(|| Routine::new(&name, ""))
            .add(command)
    }

    /// Shorthand for adding an in-process command by its tokens.
    pub fn management<I, S>(&mut self, routine: &str, invocation: I) -> Result<&Command>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(self.command(routine, Command::management(invocation)?))
    }

    /// Shorthand for adding an external-process command by its argv.
    pub fn system<I, S>(&mut self, routine: &str, invocation: I) -> Result<&Command>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(self.command(routine, Command::system(invocation)?))
    }

    pub fn build(self) -> RoutineRegistry {
        RoutineRegistry {
            routines: self.routines,
        }
    }
}

/// Frozen table of declared routines.
#[derive(Debug, Clone, Default)]
pub struct RoutineRegistry {
    routines: BTreeMap<String, Routine>,
}

impl RoutineRegistry {
    /// Look a routine up by name.
    ///
    /// The name is normalised first (`--my-routine` finds `my_routine`); if
    /// that fails, a case-insensitive match is tried.
    pub fn get(&self, name: &str) -> Result<&Routine> {
        let symbol = to_symbol(name);
        if let Some(routine) = self.routines.get(&symbol) {
            return Ok(routine);
        }
        let lowered = symbol.to_lowercase();
        self.routines
            .iter()
            .find(|(key, _)| key.to_lowercase() == lowered)
            .map(|(_, routine)| routine)
            .ok_or_else(|| RoutineError::RoutineNotFound(name.to_string()))
    }

    /// All routines, ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = &Routine> {
        self.routines.values()
    }

    pub fn len(&self) -> usize {
        self.routines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routines.is_empty()
    }
}
