// src/lib.rs

pub mod builtin;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod hooks;
pub mod logging;
pub mod routine;
pub mod signals;
pub mod types;

use std::fmt;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use tracing::debug;

use crate::cli::{CliArgs, CliCommand, parse_routine_args, routine_index};
use crate::config::{RoutinesFile, default_config_path, load_and_validate};
use crate::engine::{DEFAULT_MANAGE_SCRIPT, RunReport, Runner};
use crate::exec::{Dispatcher, ProcessLauncher, TokioLauncher, invoke};
use crate::routine::{RoutineRegistry, active_switches, render_listing, resolve_plan};

/// What a routine invocation produced.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutineOutcome {
    /// No routine was named: one line per routine.
    Index(Vec<String>),
    /// `--help` for a routine (or the top level).
    Help(String),
    /// `<routine> list`: the plan, without running it.
    Listed(Vec<String>),
    Ran(RunReport),
}

/// A frozen routine registry plus the runner that executes it.
pub struct App<L: ProcessLauncher = TokioLauncher> {
    registry: RoutineRegistry,
    runner: Runner<L>,
}

impl<L: ProcessLauncher> fmt::Debug for App<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("routines", &self.registry.len())
            .field("runner", &self.runner)
            .finish()
    }
}

impl<L: ProcessLauncher> App<L> {
    pub fn new(registry: RoutineRegistry, runner: Runner<L>) -> Self {
        Self { registry, runner }
    }

    pub fn registry(&self) -> &RoutineRegistry {
        &self.registry
    }

    pub fn runner(&self) -> &Runner<L> {
        &self.runner
    }

    /// Handle `<routine> [flags] [list]`; an empty `argv` lists routines.
    pub async fn invoke_routine(&self, argv: &[String], verbosity: Option<u8>) -> errors::Result<RoutineOutcome> {
        let Some((name, rest)) = argv.split_first() else {
            return Ok(RoutineOutcome::Index(routine_index(&self.registry)));
        };
        let routine = self.registry.get(name)?;

        let args = match parse_routine_args(routine, rest) {
            Ok(args) => args,
            Err(err) if err.kind() == ErrorKind::DisplayHelp => {
                return Ok(RoutineOutcome::Help(err.render().to_string()));
            }
            Err(err) => return Err(err.into()),
        };

        if args.list {
            let active = active_switches(routine, &args.switches, args.all);
            return Ok(RoutineOutcome::Listed(render_listing(&resolve_plan(routine, &active))));
        }

        let report = self.runner.run(routine, &args.request(verbosity)).await?;
        Ok(RoutineOutcome::Ran(report))
    }

    /// Handle `call <command> [args] [--flags]`.
    pub fn call(&self, argv: &[String], verbosity: Option<u8>) -> errors::Result<Option<String>> {
        call_command(self.runner.dispatcher(), argv, verbosity)
    }
}

/// Run one in-process command from CLI tokens.
pub fn call_command(
    dispatcher: &dyn Dispatcher,
    argv: &[String],
    verbosity: Option<u8>,
) -> errors::Result<Option<String>> {
    debug!(argv = ?argv, "calling command");
    invoke(dispatcher, argv, None, verbosity)
}

/// Build the production app from a routines file and the built-ins.
pub fn app_from_file(file: RoutinesFile, manage_script: Option<String>) -> App {
    let manage_script = manage_script
        .or(file.config.manage_script)
        .or_else(|| std::env::args().next())
        .unwrap_or_else(|| DEFAULT_MANAGE_SCRIPT.to_string());

    let runner = Runner::new(std::sync::Arc::new(builtin::commands()), TokioLauncher::new())
        .with_callbacks(std::sync::Arc::new(builtin::callbacks()))
        .with_manage_script(manage_script);
    App::new(file.registry, runner)
}

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - routines file loading (only needed for routine invocations)
/// - the built-in commands and callbacks
/// - the runner with the `tokio` process launcher
pub async fn run(args: CliArgs) -> Result<()> {
    match args.command {
        Some(CliCommand::Call { argv }) => {
            match call_command(&builtin::commands(), &argv, args.verbosity) {
                Ok(Some(output)) => println!("{output}"),
                Ok(None) => {}
                Err(errors::RoutineError::Help(text)) => print!("{text}"),
                Err(err) => return Err(err.into()),
            }
            Ok(())
        }
        command => {
            let argv = match command {
                Some(CliCommand::Routine(argv)) => argv,
                _ => Vec::new(),
            };
            let path = args.config.clone().unwrap_or_else(default_config_path);
            debug!(path = %path.display(), "loading routines");
            let file = load_and_validate(&path)
                .with_context(|| format!("loading routines from {}", path.display()))?;
            let app = app_from_file(file, args.manage_script.clone());

            match app.invoke_routine(&argv, args.verbosity).await? {
                RoutineOutcome::Index(lines) | RoutineOutcome::Listed(lines) => {
                    for line in lines {
                        println!("{line}");
                    }
                }
                RoutineOutcome::Help(text) => print!("{text}"),
                RoutineOutcome::Ran(report) => {
                    debug!(routine = %report.routine, early_exit = report.early_exit, "routine run complete");
                }
            }
            Ok(())
        }
    }
}
