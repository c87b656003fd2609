// src/signals.rs

//! Routine lifecycle signals.
//!
//! Three broadcasts fire during a run: `started`, `failed` and `finished`.
//! Any number of listeners can subscribe to each. Listener return values are
//! ignored except on `failed`, where a listener can ask the runner to carry
//! on with the next command or to end the routine early without an error.

use std::fmt;

use crate::engine::RunOptions;
use crate::errors::RoutineError;

/// Payload of the `started` signal.
#[derive(Debug, Clone, Copy)]
pub struct RoutineStarted<'a> {
    pub routine: &'a str,
    pub options: &'a RunOptions,
}

/// Payload of the `failed` signal.
#[derive(Debug, Clone, Copy)]
pub struct RoutineFailed<'a> {
    pub routine: &'a str,
    /// Plan index of the failing command.
    pub failed_index: usize,
    pub error: &'a RoutineError,
    pub options: &'a RunOptions,
}

/// Payload of the `finished` signal.
#[derive(Debug, Clone, Copy)]
pub struct RoutineFinished<'a> {
    pub routine: &'a str,
    /// True if a post-hook or failure listener ended the routine early.
    pub early_exit: bool,
    /// Plan index of the last command that actually ran, if any.
    pub last_index: Option<usize>,
    pub options: &'a RunOptions,
}

/// What a `failed` listener wants the runner to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureResponse {
    /// No opinion; the routine's continue-on-error policy decides.
    #[default]
    Propagate,
    /// Treat the failure as handled and run the next command.
    Continue,
    /// Treat the failure as handled and stop the routine (not an error).
    ExitEarly,
}

type StartedListener = Box<dyn Fn(&RoutineStarted<'_>) + Send + Sync>;
type FailedListener = Box<dyn Fn(&RoutineFailed<'_>) -> FailureResponse + Send + Sync>;
type FinishedListener = Box<dyn Fn(&RoutineFinished<'_>) + Send + Sync>;

/// Listener lists for the three lifecycle signals.
#[derive(Default)]
pub struct Signals {
    started: Vec<StartedListener>,
    failed: Vec<FailedListener>,
    finished: Vec<FinishedListener>,
}

impl Signals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_started<F>(&mut self, listener: F) -> &mut Self
    where
        F: Fn(&RoutineStarted<'_>) + Send + Sync + 'static,
    {
        self.started.push(Box::new(listener));
        self
    }

    pub fn on_failed<F>(&mut self, listener: F) -> &mut Self
    where
        F: Fn(&RoutineFailed<'_>) -> FailureResponse + Send + Sync + 'static,
    {
        self.failed.push(Box::new(listener));
        self
    }

    pub fn on_finished<F>(&mut self, listener: F) -> &mut Self
    where
        F: Fn(&RoutineFinished<'_>) + Send + Sync + 'static,
    {
        self.finished.push(Box::new(listener));
        self
    }

    pub fn send_started(&self, event: &RoutineStarted<'_>) {
        for listener in &self.started {
            listener(event);
        }
    }

    /// Broadcast a failure and aggregate the listeners' responses.
    ///
    /// A listener answering [`FailureResponse::ExitEarly`] stops the
    /// broadcast immediately; otherwise any [`FailureResponse::Continue`]
    /// wins over [`FailureResponse::Propagate`].
    pub fn send_failed(&self, event: &RoutineFailed<'_>) -> FailureResponse {
        let mut response = FailureResponse::Propagate;
        for listener in &self.failed {
            match listener(event) {
                FailureResponse::ExitEarly => return FailureResponse::ExitEarly,
                FailureResponse::Continue => response = FailureResponse::Continue,
                FailureResponse::Propagate => {}
            }
        }
        response
    }

    pub fn send_finished(&self, event: &RoutineFinished<'_>) {
        for listener in &self.finished {
            listener(event);
        }
    }
}

impl fmt::Debug for Signals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signals")
            .field("started", &self.started.len())
            .field("failed", &self.failed.len())
            .field("finished", &self.finished.len())
            .finish()
    }
}
