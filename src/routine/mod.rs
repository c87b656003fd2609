// src/routine/mod.rs

//! Routine data model.
//!
//! - [`command`] defines a single [`Command`] (in-process or external).
//! - [`definition`] holds the priority-ordered [`Routine`] aggregate.
//! - [`plan`] resolves the commands to run for a set of switches.
//! - [`registry`] stores declared routines (init-then-freeze).

pub mod command;
pub mod definition;
pub mod plan;
pub mod registry;

pub use command::{Command, CommandKind};
pub use definition::Routine;
pub use plan::{active_switches, render_listing, resolve_plan};
pub use registry::{RegistryBuilder, RoutineRegistry};
