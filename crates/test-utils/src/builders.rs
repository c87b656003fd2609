use std::sync::Arc;

use routines::engine::Runner;
use routines::exec::CommandTable;
use routines::hooks::{CallbackTable, HookRef};
use routines::routine::{Command, Routine};
use routines::signals::Signals;

use crate::fake_launcher::FakeLauncher;
use crate::store::{EditHandler, MemoryStore};
use crate::tracker::Tracker;

/// `track <id>` as an in-process command.
pub fn track(id: i64) -> Command {
    Command::management(["track".to_string(), id.to_string()]).expect("track invocation is never empty")
}

/// Builder for `Routine` to simplify test setup.
pub struct RoutineBuilder {
    routine: Routine,
}

impl RoutineBuilder {
    pub fn new(name: &str, help: &str) -> Self {
        Self {
            routine: Routine::new(name, help),
        }
    }

    pub fn command(mut self, command: Command) -> Self {
        self.routine.add(command);
        self
    }

    /// Add `track <id>` with the given priority and switches.
    pub fn track(self, id: i64, priority: i64, switches: &[&str]) -> Self {
        self.command(track(id).with_priority(priority).with_switches(switches))
    }

    /// Add an in-process command from its tokens.
    pub fn management(self, tokens: &[&str]) -> Self {
        let command = Command::management(tokens.iter().copied()).expect("non-empty invocation");
        self.command(command)
    }

    /// Add an external command from its argv.
    pub fn system(self, argv: &[&str]) -> Self {
        let command = Command::system(argv.iter().copied()).expect("non-empty argv");
        self.command(command)
    }

    pub fn subprocess(mut self, on: bool) -> Self {
        self.routine.subprocess = on;
        self
    }

    pub fn atomic(mut self, on: bool) -> Self {
        self.routine.atomic = on;
        self
    }

    pub fn continue_on_error(mut self, on: bool) -> Self {
        self.routine.continue_on_error = on;
        self
    }

    pub fn pre_hook(mut self, hook: HookRef) -> Self {
        self.routine.pre_hook = Some(hook);
        self
    }

    pub fn post_hook(mut self, hook: HookRef) -> Self {
        self.routine.post_hook = Some(hook);
        self
    }

    pub fn build(self) -> Routine {
        self.routine
    }
}

/// Collaborators for runner tests: `track` and `edit` handlers, a fake
/// launcher, an in-memory store and empty callback/signal tables.
pub struct Harness {
    pub tracker: Tracker,
    pub store: Arc<MemoryStore>,
    pub launcher: FakeLauncher,
    pub commands: CommandTable,
    pub callbacks: CallbackTable,
    pub signals: Signals,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        let tracker = Tracker::new();
        let store = MemoryStore::new();
        let mut commands = CommandTable::new();
        commands
            .register("track", tracker.clone())
            .register("edit", EditHandler::new(Arc::clone(&store)));
        Self {
            tracker,
            store,
            launcher: FakeLauncher::new(),
            commands,
            callbacks: CallbackTable::new(),
            signals: Signals::new(),
        }
    }

    /// Build a runner over these collaborators.
    ///
    /// Signal listeners registered so far move into the runner.
    pub fn runner(&mut self) -> Runner<FakeLauncher> {
        let signals = std::mem::take(&mut self.signals);
        Runner::new(Arc::new(self.commands.clone()), self.launcher.clone())
            .with_callbacks(Arc::new(self.callbacks.clone()))
            .with_signals(Arc::new(signals))
            .with_transactions(Arc::clone(&self.store) as _)
            .with_manage_script("./manage")
    }
}
