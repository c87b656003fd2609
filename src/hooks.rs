// src/hooks.rs

//! Hook and callback references.
//!
//! A routine (or a single command) can carry four kinds of callbacks:
//!
//! - pre-hooks, run before a command; returning `true` skips the command
//! - post-hooks, run after a command; returning `true` ends the routine early
//! - an initialize callback, run once with the resolved plan
//! - a finalize callback, run once with the collected results
//!
//! Each is referenced either directly (an `Arc`'d closure) or by name. Named
//! references are resolved lazily, at the moment they are first needed,
//! through a [`CallbackResolver`] (normally a [`CallbackTable`] populated by
//! the application at startup).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::engine::RunOptions;
use crate::errors::{Result, RoutineError};
use crate::routine::{Command, Routine};
use crate::types::CommandOutcome;

/// Signature shared by pre- and post-hooks.
///
/// `(routine, command, neighbour, options) -> skip_or_exit`. The neighbour is
/// the previous plan entry for pre-hooks and the next one for post-hooks.
pub type HookFn = dyn Fn(&Routine, &mut Command, Option<&mut Command>, &RunOptions) -> anyhow::Result<bool>
    + Send
    + Sync;

/// `(routine, plan, active_switches, options)`; may rewrite plan entries.
pub type InitializeFn = dyn Fn(&Routine, &mut [Command], &BTreeSet<String>, &RunOptions) -> anyhow::Result<()>
    + Send
    + Sync;

/// `(routine, results)`.
pub type FinalizeFn =
    dyn Fn(&Routine, &mut Vec<CommandOutcome>) -> anyhow::Result<()> + Send + Sync;

/// A callable reference: either the callable itself or a name to look up.
pub enum Callback<F: ?Sized> {
    Direct(Arc<F>),
    Named(String),
}

pub type HookRef = Callback<HookFn>;
pub type InitializeRef = Callback<InitializeFn>;
pub type FinalizeRef = Callback<FinalizeFn>;

impl<F: ?Sized> Callback<F> {
    pub fn named(name: impl Into<String>) -> Self {
        Callback::Named(name.into())
    }

    /// Resolve to a callable, looking named references up with `lookup`.
    ///
    /// An unknown name is a configuration problem and is reported as
    /// [`RoutineError::ImproperlyConfigured`].
    pub fn resolve(
        &self,
        kind: &str,
        lookup: impl FnOnce(&str) -> Option<Arc<F>>,
    ) -> Result<Arc<F>> {
        match self {
            Callback::Direct(f) => Ok(Arc::clone(f)),
            Callback::Named(name) => lookup(name).ok_or_else(|| {
                RoutineError::ImproperlyConfigured(format!("unable to resolve {kind} '{name}'"))
            }),
        }
    }
}

impl HookRef {
    /// Wrap a closure as a hook reference.
    pub fn hook<H>(f: H) -> Self
    where
        H: Fn(&Routine, &mut Command, Option<&mut Command>, &RunOptions) -> anyhow::Result<bool>
            + Send
            + Sync
            + 'static,
    {
        let f: Arc<HookFn> = Arc::new(f);
        Callback::Direct(f)
    }
}

impl InitializeRef {
    pub fn initialize<I>(f: I) -> Self
    where
        I: Fn(&Routine, &mut [Command], &BTreeSet<String>, &RunOptions) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        let f: Arc<InitializeFn> = Arc::new(f);
        Callback::Direct(f)
    }
}

impl FinalizeRef {
    pub fn finalize<G>(f: G) -> Self
    where
        G: Fn(&Routine, &mut Vec<CommandOutcome>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let f: Arc<FinalizeFn> = Arc::new(f);
        Callback::Direct(f)
    }
}

impl<F: ?Sized> Clone for Callback<F> {
    fn clone(&self) -> Self {
        match self {
            Callback::Direct(f) => Callback::Direct(Arc::clone(f)),
            Callback::Named(name) => Callback::Named(name.clone()),
        }
    }
}

impl<F: ?Sized> PartialEq for Callback<F> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Callback::Direct(a), Callback::Direct(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            (Callback::Named(a), Callback::Named(b)) => a == b,
            _ => false,
        }
    }
}

impl<F: ?Sized> fmt::Debug for Callback<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callback::Direct(_) => f.write_str("Direct(<fn>)"),
            Callback::Named(name) => f.debug_tuple("Named").field(name).finish(),
        }
    }
}

/// Collaborator that maps callback names to callables.
pub trait CallbackResolver: Send + Sync {
    fn hook(&self, name: &str) -> Option<Arc<HookFn>>;
    fn initializer(&self, name: &str) -> Option<Arc<InitializeFn>>;
    fn finalizer(&self, name: &str) -> Option<Arc<FinalizeFn>>;
}

/// Name → callable table filled in at startup.
#[derive(Clone, Default)]
pub struct CallbackTable {
    hooks: BTreeMap<String, Arc<HookFn>>,
    initializers: BTreeMap<String, Arc<InitializeFn>>,
    finalizers: BTreeMap<String, Arc<FinalizeFn>>,
}

impl CallbackTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_hook<H>(&mut self, name: impl Into<String>, f: H) -> &mut Self
    where
        H: Fn(&Routine, &mut Command, Option<&mut Command>, &RunOptions) -> anyhow::Result<bool>
            + Send
            + Sync
            + 'static,
    {
        self.hooks.insert(name.into(), Arc::new(f));
        self
    }

    pub fn register_initializer<I>(&mut self, name: impl Into<String>, f: I) -> &mut Self
    where
        I: Fn(&Routine, &mut [Command], &BTreeSet<String>, &RunOptions) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.initializers.insert(name.into(), Arc::new(f));
        self
    }

    pub fn register_finalizer<G>(&mut self, name: impl Into<String>, f: G) -> &mut Self
    where
        G: Fn(&Routine, &mut Vec<CommandOutcome>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.finalizers.insert(name.into(), Arc::new(f));
        self
    }

    /// Copy every entry of `other` into this table (later entries win).
    pub fn extend(&mut self, other: CallbackTable) -> &mut Self {
        self.hooks.extend(other.hooks);
        self.initializers.extend(other.initializers);
        self.finalizers.extend(other.finalizers);
        self
    }
}

impl fmt::Debug for CallbackTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackTable")
            .field("hooks", &self.hooks.keys().collect::<Vec<_>>())
            .field("initializers", &self.initializers.keys().collect::<Vec<_>>())
            .field("finalizers", &self.finalizers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl CallbackResolver for CallbackTable {
    fn hook(&self, name: &str) -> Option<Arc<HookFn>> {
        self.hooks.get(name).cloned()
    }

    fn initializer(&self, name: &str) -> Option<Arc<InitializeFn>> {
        self.initializers.get(name).cloned()
    }

    fn finalizer(&self, name: &str) -> Option<Arc<FinalizeFn>> {
        self.finalizers.get(name).cloned()
    }
}
