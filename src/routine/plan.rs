// src/routine/plan.rs

//! Plan resolution: which commands of a routine run for a set of switches.

use std::collections::BTreeSet;

use crate::routine::command::Command;
use crate::routine::definition::Routine;
use crate::types::to_symbol;

/// Resolve the ordered execution plan for `routine` given the active switches.
///
/// - a command is included iff it has no switches or shares one with `active`
/// - order is the routine's stored priority order; the plan is never re-sorted
/// - the routine's default hooks fill empty hook slots on the returned copies
///   (an explicit per-command hook is never replaced)
///
/// The routine itself is left untouched.
pub fn resolve_plan(routine: &Routine, active: &BTreeSet<String>) -> Vec<Command> {
    routine
        .commands()
        .iter()
        .filter(|command| command.is_active(active))
        .map(|command| {
            let mut command = command.clone();
            if command.pre_hook.is_none() {
                command.pre_hook = routine.pre_hook.clone();
            }
            if command.post_hook.is_none() {
                command.post_hook = routine.post_hook.clone();
            }
            command
        })
        .collect()
}

/// Normalise requested switch names; `all` activates every switch the
/// routine declares.
pub fn active_switches<I, S>(routine: &Routine, requested: I, all: bool) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut active: BTreeSet<String> = requested
        .into_iter()
        .map(|s| to_symbol(s.as_ref()))
        .collect();
    if all {
        active.extend(routine.switches());
    }
    active
}

/// Lines printed by `routine <name> list`.
pub fn render_listing(plan: &[Command]) -> Vec<String> {
    plan.iter().map(Command::listing).collect()
}
