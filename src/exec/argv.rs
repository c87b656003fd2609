// src/exec/argv.rs

//! Conversion between keyword options and command-line flags.
//!
//! When an in-process command is forced into a subprocess, its options are
//! rendered as flags and the command is re-invoked through
//! `<manage-script> call <name> <args...> <flags...>`. The `call`
//! subcommand parses the flags back with [`flags_to_options`].

use clap::parser::ValueSource;
use clap::{Arg, ArgAction};

use crate::errors::{Result, RoutineError};
use crate::exec::dispatcher::{Dispatcher, ParamKind, Parameter};
use crate::routine::{Command, CommandKind};
use crate::types::{Options, option_value_to_string};

/// Render `options` as CLI flags using the handler's parameter declarations.
///
/// - a boolean for a flag parameter becomes the bare flag, and only when it
///   differs from the flag's default (an equal value is simply dropped)
/// - every other value becomes `--name=value`
///
/// Options without a matching parameter cannot be expressed on a command
/// line, which is reported as [`RoutineError::UnconvertibleOptions`].
pub fn options_to_flags(command: &str, options: &Options, parameters: &[Parameter]) -> Result<Vec<String>> {
    let mut flags = Vec::with_capacity(options.len());
    let mut expected = options.len();

    for (name, value) in options {
        let Some(param) = parameters.iter().find(|p| p.name == *name) else {
            continue;
        };
        match (&param.kind, value) {
            (ParamKind::Flag { default }, toml::Value::Boolean(b)) => {
                if b != default {
                    flags.push(param.cli.clone());
                } else {
                    expected -= 1;
                }
            }
            _ => flags.push(format!("{}={}", param.cli, option_value_to_string(value))),
        }
    }

    if flags.len() != expected {
        let rendered: Vec<String> = options
            .iter()
            .map(|(k, v)| format!("{k}={}", option_value_to_string(v)))
            .collect();
        return Err(RoutineError::UnconvertibleOptions {
            command: command.to_string(),
            options: format!("{{{}}}", rendered.join(", ")),
        });
    }
    Ok(flags)
}

/// Id of the positional arguments in the parser built by [`call_parser`].
const POSITIONAL: &str = "positional";

/// Parser for `call <command> ...`, built from the handler's parameters.
///
/// Flags toggle their default (`SetTrue` or `SetFalse`), `Int` values are
/// parsed as `i64`, and everything that is not a flag is positional.
pub fn call_parser(command: &str, parameters: &[Parameter]) -> clap::Command {
    let mut cmd = clap::Command::new(command.to_string())
        .no_binary_name(true)
        .arg(
            Arg::new(POSITIONAL)
                .value_name("ARGS")
                .num_args(0..)
                .action(ArgAction::Append)
                .allow_negative_numbers(true),
        );

    for param in parameters {
        let arg = Arg::new(param.name.clone()).long(param.cli.trim_start_matches('-').to_string());
        cmd = cmd.arg(match param.kind {
            ParamKind::Flag { default: false } => arg.action(ArgAction::SetTrue),
            ParamKind::Flag { default: true } => arg.action(ArgAction::SetFalse),
            ParamKind::Int => arg
                .action(ArgAction::Set)
                .value_parser(clap::value_parser!(i64))
                .allow_negative_numbers(true),
            ParamKind::Str => arg.action(ArgAction::Set).allow_hyphen_values(true),
        });
    }
    cmd
}

/// Split CLI tokens into positional arguments and keyword options.
///
/// `--name=value` and `--name value` are both accepted for valued
/// parameters; a flag parameter flips its default. Everything after a bare
/// `--` is positional. Only options given on the command line end up in the
/// returned map, so declared defaults stay with the handler.
pub fn flags_to_options(
    command: &str,
    parameters: &[Parameter],
    tokens: &[String],
) -> Result<(Vec<String>, Options)> {
    let matches = call_parser(command, parameters).try_get_matches_from(tokens)?;

    let args = matches
        .get_many::<String>(POSITIONAL)
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    let mut options = Options::new();
    for param in parameters {
        let id = param.name.as_str();
        if matches.value_source(id) != Some(ValueSource::CommandLine) {
            continue;
        }
        let value = match param.kind {
            ParamKind::Flag { .. } => Some(toml::Value::Boolean(matches.get_flag(id))),
            ParamKind::Int => matches.get_one::<i64>(id).map(|v| toml::Value::Integer(*v)),
            ParamKind::Str => matches
                .get_one::<String>(id)
                .map(|v| toml::Value::String(v.clone())),
        };
        if let Some(value) = value {
            options.insert(param.name.clone(), value);
        }
    }

    Ok((args, options))
}

/// Build the argv used to run `command` as a subprocess.
///
/// System commands run as declared. In-process commands are re-invoked via
/// `manage_script call`, with their options rendered as flags; the handler is
/// only looked up when there are options to convert.
pub fn subprocess_argv(command: &Command, manage_script: &str, dispatcher: &dyn Dispatcher) -> Result<Vec<String>> {
    match &command.kind {
        CommandKind::System => Ok(command.invocation.clone()),
        CommandKind::Management { options } => {
            let flags = if options.is_empty() {
                Vec::new()
            } else {
                let handler = dispatcher.resolve(command.name())?;
                options_to_flags(command.name(), options, handler.parameters())?
            };
            let mut argv = Vec::with_capacity(command.invocation.len() + flags.len() + 2);
            argv.push(manage_script.to_string());
            argv.push("call".to_string());
            argv.extend(command.invocation.iter().cloned());
            argv.extend(flags);
            Ok(argv)
        }
    }
}
