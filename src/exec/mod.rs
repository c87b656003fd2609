// src/exec/mod.rs

//! Command execution layer.
//!
//! - [`dispatcher`] resolves in-process command names to handlers.
//! - [`launcher`] provides the `ProcessLauncher` trait and the concrete
//!   `TokioLauncher` used in production, which tests can replace with a fake.
//! - [`argv`] converts keyword options to CLI flags and back, and builds the
//!   argv used when a command runs as a subprocess.

pub mod argv;
pub mod dispatcher;
pub mod launcher;

pub use argv::{call_parser, flags_to_options, options_to_flags, subprocess_argv};
pub use dispatcher::{CommandHandler, CommandTable, Dispatcher, ParamKind, Parameter, invoke};
pub use launcher::{Environment, ProcessLauncher, TokioLauncher, current_environment};
