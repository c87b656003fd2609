// src/exec/dispatcher.rs

//! In-process command dispatch.
//!
//! A [`Dispatcher`] maps a command name to a [`CommandHandler`]. Handlers
//! declare their keyword parameters so that options can be converted to
//! CLI flags (and back) when a command crosses a process boundary.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::{Result, RoutineError};
use crate::exec::argv::flags_to_options;
use crate::types::{Options, to_cli_option, to_symbol};

/// Type of a declared keyword parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKind {
    /// Boolean switch; giving the flag on a command line flips `default`.
    Flag { default: bool },
    Int,
    Str,
}

/// A keyword parameter accepted by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Option key as it appears in [`Options`].
    pub name: String,
    pub kind: ParamKind,
    /// Long CLI spelling, `--kebab-name` unless overridden.
    pub cli: String,
}

impl Parameter {
    fn new(name: &str, kind: ParamKind) -> Self {
        Self {
            name: to_symbol(name),
            kind,
            cli: to_cli_option(name),
        }
    }

    pub fn flag(name: &str, default: bool) -> Self {
        Self::new(name, ParamKind::Flag { default })
    }

    pub fn int(name: &str) -> Self {
        Self::new(name, ParamKind::Int)
    }

    pub fn string(name: &str) -> Self {
        Self::new(name, ParamKind::Str)
    }

    /// Use a different CLI spelling (e.g. `--no-input` for a flag that
    /// defaults to `true`).
    pub fn with_cli(mut self, cli: impl Into<String>) -> Self {
        self.cli = cli.into();
        self
    }
}

/// An in-process command implementation.
pub trait CommandHandler: Send + Sync {
    /// Keyword parameters understood by [`handle`](CommandHandler::handle).
    fn parameters(&self) -> &[Parameter] {
        &[]
    }

    /// Run the command with positional `args` and keyword `options`.
    fn handle(&self, args: &[String], options: &Options) -> anyhow::Result<Option<String>>;
}

/// Looks handlers up by command name.
pub trait Dispatcher: Send + Sync {
    /// Resolve `name`, failing with [`RoutineError::CommandNotFound`].
    fn resolve(&self, name: &str) -> Result<Arc<dyn CommandHandler>>;
}

/// Resolve and run one in-process command.
///
/// `tokens` is the command name followed by its arguments; `--flags` among
/// the arguments are parsed into options with the handler's parameters, then
/// `declared` options are layered on top. A `verbosity` is only passed to
/// handlers that declare that parameter and never overrides one already
/// given by the command itself.
pub fn invoke(
    dispatcher: &dyn Dispatcher,
    tokens: &[String],
    declared: Option<&Options>,
    verbosity: Option<u8>,
) -> Result<Option<String>> {
    let Some((name, rest)) = tokens.split_first() else {
        return Err(RoutineError::Usage("no command given".to_string()));
    };
    let handler = dispatcher.resolve(name)?;
    let (args, mut options) = flags_to_options(name, handler.parameters(), rest)?;
    if let Some(declared) = declared {
        options.extend(declared.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    let takes_verbosity = handler.parameters().iter().any(|p| p.name == "verbosity");
    if let (Some(verbosity), true) = (verbosity, takes_verbosity) {
        options
            .entry("verbosity".to_string())
            .or_insert_with(|| toml::Value::Integer(i64::from(verbosity)));
    }
    Ok(handler.handle(&args, &options)?)
}

type HandlerFn = dyn Fn(&[String], &Options) -> anyhow::Result<Option<String>> + Send + Sync;

struct FnHandler {
    parameters: Vec<Parameter>,
    f: Box<HandlerFn>,
}

impl CommandHandler for FnHandler {
    fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    fn handle(&self, args: &[String], options: &Options) -> anyhow::Result<Option<String>> {
        (self.f)(args, options)
    }
}

/// Name → handler table filled in at startup.
#[derive(Clone, Default)]
pub struct CommandTable {
    handlers: BTreeMap<String, Arc<dyn CommandHandler>>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, name: impl Into<String>, handler: H) -> &mut Self
    where
        H: CommandHandler + 'static,
    {
        self.handlers.insert(name.into(), Arc::new(handler));
        self
    }

    /// Register a closure together with its parameter declarations.
    pub fn register_fn<F>(
        &mut self,
        name: impl Into<String>,
        parameters: Vec<Parameter>,
        f: F,
    ) -> &mut Self
    where
        F: Fn(&[String], &Options) -> anyhow::Result<Option<String>> + Send + Sync + 'static,
    {
        self.register(
            name,
            FnHandler {
                parameters,
                f: Box::new(f),
            },
        )
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }
}

impl fmt::Debug for CommandTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandTable")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Dispatcher for CommandTable {
    fn resolve(&self, name: &str) -> Result<Arc<dyn CommandHandler>> {
        self.handlers
            .get(name)
            .cloned()
            .ok_or_else(|| RoutineError::CommandNotFound(name.to_string()))
    }
}
