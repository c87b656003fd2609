// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! The top level is a derive parser. Each routine's own flags are only known
//! once the routines file is loaded, so the per-routine parser is built at
//! runtime with the builder API from the routine definition.

use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgMatches, Parser, Subcommand, ValueEnum};
use tracing::warn;

use crate::engine::{PolicyOverrides, RunRequest};
use crate::routine::{Command, Routine, RoutineRegistry};
use crate::types::to_cli_option;

/// Command-line arguments for `routine`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "routine",
    version,
    about = "Run named, ordered batches of commands.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the routines file (TOML).
    ///
    /// Default: `ROUTINES_CONFIG`, or `Routines.toml` in the current
    /// working directory.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// The manage script to use if running in-process commands as
    /// subprocesses.
    #[arg(long, value_name = "PATH")]
    pub manage_script: Option<String>,

    /// Verbosity level; 0 silences the per-command echo. When given, it is
    /// also passed on to commands that accept a `verbosity` option.
    #[arg(long, short = 'v', value_name = "0-3", value_parser = clap::value_parser!(u8).range(0..=3))]
    pub verbosity: Option<u8>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ROUTINES_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum CliCommand {
    /// Run a single in-process command (the target used when routines run
    /// in-process commands as subprocesses).
    Call {
        /// Command name followed by its arguments and flags.
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        argv: Vec<String>,
    },

    /// `<ROUTINE> [flags] [list]`
    #[command(external_subcommand)]
    Routine(Vec<String>),
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

/// Flags parsed for one routine invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutineArgs {
    pub switches: BTreeSet<String>,
    pub all: bool,
    pub overrides: PolicyOverrides,
    /// `list` subcommand: print the plan instead of running it.
    pub list: bool,
}

impl RoutineArgs {
    pub fn request(&self, verbosity: Option<u8>) -> RunRequest {
        RunRequest {
            switches: self.switches.clone(),
            all: self.all,
            overrides: self.overrides,
            verbosity,
        }
    }
}

const RESERVED: &[&str] = &[
    "all",
    "subprocess",
    "no_subprocess",
    "atomic",
    "non_atomic",
    "continue",
    "halt",
    "help",
];

/// Help body shown under a routine: its help text, a ruler and the listing
/// of every declared command.
pub fn routine_help(routine: &Routine) -> String {
    let lines: Vec<String> = routine.commands().iter().map(Command::listing).collect();
    let width = lines.iter().map(String::len).max().unwrap_or(0);
    let mut help = routine.help_text.clone();
    if !lines.is_empty() {
        help.push('\n');
        help.push_str(&"-".repeat(width));
        help.push('\n');
        help.push_str(&lines.join("\n"));
    }
    help
}

/// Build the parser for one routine's flags.
pub fn routine_command(routine: &Routine) -> clap::Command {
    let mut cmd = clap::Command::new(routine.name().replace('_', "-"))
        .no_binary_name(true)
        .about(routine.help_text.clone())
        .long_about(routine_help(routine))
        .arg(flag("all", "Include all switched commands."))
        .subcommand(clap::Command::new("list").about("List the commands that will be run."));

    for switch in routine.switches() {
        if RESERVED.contains(&switch.as_str()) {
            warn!(routine = %routine.name(), %switch, "switch name clashes with a built-in flag; only --all activates it");
            continue;
        }
        cmd = cmd.arg(flag(&switch, routine.switch_help(&switch)));
    }

    cmd.arg(if routine.subprocess {
        flag("no_subprocess", "Do not run commands as subprocesses.")
    } else {
        flag("subprocess", "Run commands as subprocesses.")
    })
    .arg(if routine.atomic {
        flag("non_atomic", "Do not run all commands in the same transaction.")
    } else {
        flag("atomic", "Run all commands in the same transaction.")
    })
    .arg(if routine.continue_on_error {
        flag("halt", "Halt if any command fails.")
    } else {
        flag("continue", "Continue through the routine if any commands fail.")
    })
}

fn flag(id: &str, help: &str) -> Arg {
    let long = to_cli_option(id).trim_start_matches('-').to_string();
    Arg::new(id.to_string())
        .long(long)
        .action(ArgAction::SetTrue)
        .help(help.to_string())
}

/// Parse `argv` (everything after the routine name) for `routine`.
pub fn parse_routine_args<I, S>(routine: &Routine, argv: I) -> Result<RoutineArgs, clap::Error>
where
    I: IntoIterator<Item = S>,
    S: Into<std::ffi::OsString> + Clone,
{
    let matches = routine_command(routine).try_get_matches_from(argv)?;
    Ok(routine_args_from(routine, &matches))
}

fn routine_args_from(routine: &Routine, matches: &ArgMatches) -> RoutineArgs {
    let is_set = |id: &str| matches.try_get_one::<bool>(id).ok().flatten().copied().unwrap_or(false);

    let switches = routine
        .switches()
        .into_iter()
        .filter(|s| !RESERVED.contains(&s.as_str()) && is_set(s))
        .collect();

    let toggled = |on: &str, off: &str| {
        if is_set(on) {
            Some(true)
        } else if is_set(off) {
            Some(false)
        } else {
            None
        }
    };

    RoutineArgs {
        switches,
        all: is_set("all"),
        overrides: PolicyOverrides {
            subprocess: toggled("subprocess", "no_subprocess"),
            atomic: toggled("atomic", "non_atomic"),
            continue_on_error: toggled("continue", "halt"),
        },
        list: matches.subcommand_matches("list").is_some(),
    }
}

/// One line per routine (`name  help`), as printed by `routine` without
/// arguments.
pub fn routine_index(registry: &RoutineRegistry) -> Vec<String> {
    let width = registry
        .iter()
        .map(|r| r.name().len())
        .max()
        .unwrap_or(0);
    registry
        .iter()
        .map(|r| {
            let name = r.name().replace('_', "-");
            format!("{name:<width$}  {}", r.help_text).trim_end().to_string()
        })
        .collect()
}
