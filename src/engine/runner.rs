// src/engine/runner.rs

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::errors::{Result, RoutineError};
use crate::exec::{Dispatcher, ProcessLauncher, current_environment, invoke, subprocess_argv};
use crate::hooks::{Callback, CallbackResolver, CallbackTable, HookFn, HookRef};
use crate::routine::{Command, Routine, active_switches, resolve_plan};
use crate::signals::{RoutineFailed, RoutineFinished, RoutineStarted, Signals};
use crate::types::{CommandOutcome, ProcessOutput};

use super::policy::{FailureAction, Policy, decide_failure};
use super::transaction::{NoTransactions, TransactionProvider};
use super::{DEFAULT_MANAGE_SCRIPT, RunOptions, RunReport, RunRequest};

/// Executes routines.
///
/// The runner owns its collaborators: the in-process [`Dispatcher`], a
/// [`ProcessLauncher`] for external commands, the [`CallbackResolver`] used
/// for named hooks, the lifecycle [`Signals`] and the
/// [`TransactionProvider`] used by atomic runs. Commands run strictly one at
/// a time, in plan order.
pub struct Runner<L: ProcessLauncher> {
    dispatcher: Arc<dyn Dispatcher>,
    launcher: L,
    callbacks: Arc<dyn CallbackResolver>,
    signals: Arc<Signals>,
    transactions: Arc<dyn TransactionProvider>,
    manage_script: String,
}

impl<L: ProcessLauncher> fmt::Debug for Runner<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("signals", &self.signals)
            .field("manage_script", &self.manage_script)
            .finish_non_exhaustive()
    }
}

/// How a single plan entry ended when it did not error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// The pre-hook asked to skip it.
    Skipped,
    Ran,
    /// It ran and its post-hook asked to stop the routine.
    ExitEarly,
}

#[derive(Debug, Default)]
struct Walk {
    results: Vec<CommandOutcome>,
    early_exit: bool,
    last_index: Option<usize>,
}

/// Named hooks resolved during one run.
struct HookCache<'r> {
    resolver: &'r dyn CallbackResolver,
    resolved: HashMap<String, Arc<HookFn>>,
}

impl<'r> HookCache<'r> {
    fn new(resolver: &'r dyn CallbackResolver) -> Self {
        Self {
            resolver,
            resolved: HashMap::new(),
        }
    }

    fn get(&mut self, hook: &HookRef) -> Result<Arc<HookFn>> {
        let Callback::Named(name) = hook else {
            return hook.resolve("hook", |_| None);
        };
        if let Some(f) = self.resolved.get(name) {
            return Ok(Arc::clone(f));
        }
        let f = hook.resolve("hook", |n| self.resolver.hook(n))?;
        self.resolved.insert(name.clone(), Arc::clone(&f));
        Ok(f)
    }
}

impl<L: ProcessLauncher> Runner<L> {
    pub fn new(dispatcher: Arc<dyn Dispatcher>, launcher: L) -> Self {
        Self {
            dispatcher,
            launcher,
            callbacks: Arc::new(CallbackTable::new()),
            signals: Arc::new(Signals::new()),
            transactions: Arc::new(NoTransactions),
            manage_script: DEFAULT_MANAGE_SCRIPT.to_string(),
        }
    }

    pub fn with_callbacks(mut self, callbacks: Arc<dyn CallbackResolver>) -> Self {
        self.callbacks = callbacks;
        self
    }

    pub fn with_signals(mut self, signals: Arc<Signals>) -> Self {
        self.signals = signals;
        self
    }

    pub fn with_transactions(mut self, transactions: Arc<dyn TransactionProvider>) -> Self {
        self.transactions = transactions;
        self
    }

    /// Script used to re-invoke in-process commands in subprocess mode.
    pub fn with_manage_script(mut self, manage_script: impl Into<String>) -> Self {
        self.manage_script = manage_script.into();
        self
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    pub fn dispatcher(&self) -> &dyn Dispatcher {
        self.dispatcher.as_ref()
    }

    /// Options a run of `routine` with `request` would expose to callbacks.
    pub fn options_for(&self, routine: &Routine, request: &RunRequest) -> RunOptions {
        let policy = request.overrides.resolve(routine);
        let active = active_switches(routine, &request.switches, request.all);
        self.run_options(routine, &active, request, policy)
    }

    fn run_options(
        &self,
        routine: &Routine,
        active: &BTreeSet<String>,
        request: &RunRequest,
        policy: Policy,
    ) -> RunOptions {
        RunOptions {
            subprocess: policy.subprocess,
            atomic: policy.atomic,
            continue_on_error: policy.continue_on_error,
            all: request.all,
            switches: routine
                .switches()
                .into_iter()
                .map(|s| {
                    let on = active.contains(&s);
                    (s, on)
                })
                .collect(),
            verbosity: request.verbosity.unwrap_or(1),
            verbosity_explicit: request.verbosity.is_some(),
            manage_script: self.manage_script.clone(),
        }
    }

    /// Run `routine` once.
    ///
    /// The routine is snapshotted first, so nothing declared after this call
    /// starts affects the run. Returns the report on success or early exit;
    /// an unhandled command failure rolls back an atomic scope and is
    /// returned as the error, without `finished` or `finalize`.
    pub async fn run(&self, declared: &Routine, request: &RunRequest) -> Result<RunReport> {
        let routine = declared.clone();
        let policy = request.overrides.resolve(&routine);
        let active = active_switches(&routine, &request.switches, request.all);
        let options = self.run_options(&routine, &active, request, policy);

        info!(
            routine = %routine.name(),
            subprocess = policy.subprocess,
            atomic = policy.atomic,
            continue_on_error = policy.continue_on_error,
            switches = ?active,
            "starting routine"
        );
        self.signals.send_started(&RoutineStarted {
            routine: routine.name(),
            options: &options,
        });

        let mut plan = resolve_plan(&routine, &active);
        debug!(routine = %routine.name(), commands = plan.len(), "resolved plan");

        let transaction = if policy.atomic {
            Some(self.transactions.begin()?)
        } else {
            None
        };

        let walk = match self.walk(&routine, &mut plan, &active, &options, policy).await {
            Ok(walk) => walk,
            Err(err) => {
                if let Some(tx) = transaction {
                    warn!(routine = %routine.name(), "rolling back routine transaction");
                    if let Err(rollback_err) = tx.rollback() {
                        error!(
                            routine = %routine.name(),
                            error = %rollback_err,
                            "rollback failed"
                        );
                    }
                }
                return Err(err);
            }
        };

        if let Some(tx) = transaction {
            tx.commit()?;
            debug!(routine = %routine.name(), "committed routine transaction");
        }

        self.signals.send_finished(&RoutineFinished {
            routine: routine.name(),
            early_exit: walk.early_exit,
            last_index: walk.last_index,
            options: &options,
        });

        let Walk {
            mut results,
            early_exit,
            last_index,
        } = walk;

        if let Some(finalize) = &routine.finalize {
            let finalize =
                finalize.resolve("finalize callback", |name| self.callbacks.finalizer(name))?;
            finalize(&routine, &mut results)?;
        }

        info!(
            routine = %routine.name(),
            results = results.len(),
            early_exit,
            last_index = ?last_index,
            "routine finished"
        );

        Ok(RunReport {
            routine: routine.name().to_string(),
            plan,
            results,
            early_exit,
            last_index,
        })
    }

    /// `initialize` followed by the command loop, all inside the
    /// transaction scope opened by [`run`](Self::run).
    async fn walk(
        &self,
        routine: &Routine,
        plan: &mut [Command],
        active: &BTreeSet<String>,
        options: &RunOptions,
        policy: Policy,
    ) -> Result<Walk> {
        if let Some(initialize) = &routine.initialize {
            let initialize = initialize
                .resolve("initialize callback", |name| self.callbacks.initializer(name))?;
            initialize(routine, &mut *plan, active, options)?;
        }

        let mut hooks = HookCache::new(self.callbacks.as_ref());
        let mut walk = Walk::default();

        for index in 0..plan.len() {
            let (before, rest) = plan.split_at_mut(index);
            let Some((command, after)) = rest.split_first_mut() else {
                break;
            };
            let step = self
                .step(
                    routine,
                    command,
                    before.last_mut(),
                    after.first_mut(),
                    options,
                    policy,
                    &mut hooks,
                    &mut walk.results,
                )
                .await;

            match step {
                Ok(Step::Skipped) => {
                    debug!(routine = %routine.name(), index, command = %command, "pre-hook skipped command");
                }
                Ok(Step::Ran) => walk.last_index = Some(index),
                Ok(Step::ExitEarly) => {
                    info!(routine = %routine.name(), index, command = %command, "post-hook requested early exit");
                    walk.last_index = Some(index);
                    walk.early_exit = true;
                    return Ok(walk);
                }
                Err(err) => {
                    error!(routine = %routine.name(), index, command = %command, error = %err, "command failed");
                    let response = self.signals.send_failed(&RoutineFailed {
                        routine: routine.name(),
                        failed_index: index,
                        error: &err,
                        options,
                    });
                    match decide_failure(response, policy.continue_on_error) {
                        FailureAction::Continue => {
                            warn!(routine = %routine.name(), index, "continuing after failure");
                        }
                        FailureAction::ExitEarly => {
                            info!(routine = %routine.name(), index, "failure listener requested early exit");
                            walk.last_index = Some(index);
                            walk.early_exit = true;
                            return Ok(walk);
                        }
                        FailureAction::Abort => return Err(err),
                    }
                }
            }
        }

        Ok(walk)
    }

    #[allow(clippy::too_many_arguments)]
    async fn step(
        &self,
        routine: &Routine,
        command: &mut Command,
        previous: Option<&mut Command>,
        next: Option<&mut Command>,
        options: &RunOptions,
        policy: Policy,
        hooks: &mut HookCache<'_>,
        results: &mut Vec<CommandOutcome>,
    ) -> Result<Step> {
        if let Some(pre) = command.pre_hook.clone() {
            let hook = hooks.get(&pre)?;
            if hook(routine, command, previous, options)? {
                return Ok(Step::Skipped);
            }
        }

        if command.is_management() && !policy.subprocess {
            debug!(command = %command, mode = "in-process", "dispatching command");
            let value = self.call_in_process(command, options)?;
            record(command, results, CommandOutcome::Returned(value));
        } else {
            debug!(command = %command, mode = "subprocess", "dispatching command");
            let (argv, output) = self.call_subprocess(command, options).await?;
            let code = output.code;
            record(command, results, CommandOutcome::Process(output));
            if code != 0 {
                return Err(RoutineError::SubprocessFailed {
                    command: argv.join(" "),
                    code,
                });
            }
        }

        if let Some(post) = command.post_hook.clone() {
            let hook = hooks.get(&post)?;
            if hook(routine, command, next, options)? {
                return Ok(Step::ExitEarly);
            }
        }
        Ok(Step::Ran)
    }

    fn call_in_process(&self, command: &Command, options: &RunOptions) -> Result<Option<String>> {
        if options.verbosity > 0 {
            println!("{command}");
        }
        let verbosity = options.verbosity_explicit.then_some(options.verbosity);
        let value = invoke(
            self.dispatcher.as_ref(),
            &command.invocation,
            command.options(),
            verbosity,
        )?;
        if let Some(text) = &value {
            println!("{text}");
        }
        Ok(value)
    }

    async fn call_subprocess(
        &self,
        command: &Command,
        options: &RunOptions,
    ) -> Result<(Vec<String>, ProcessOutput)> {
        let argv = subprocess_argv(command, &options.manage_script, self.dispatcher.as_ref())?;
        if options.verbosity > 0 {
            println!("{}", argv.join(" "));
        }
        let output = self
            .launcher
            .launch(argv.clone(), current_environment())
            .await?;
        Ok((argv, output))
    }
}

fn record(command: &mut Command, results: &mut Vec<CommandOutcome>, outcome: CommandOutcome) {
    command.result = Some(outcome.clone());
    results.push(outcome);
}
