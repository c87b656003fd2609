// src/engine/policy.rs

//! Pure policy decisions of the runner.
//!
//! Nothing in here does IO; the runner asks these functions what to do and
//! then does it.

use crate::routine::Routine;
use crate::signals::FailureResponse;

/// Effective execution policy of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Policy {
    pub subprocess: bool,
    pub atomic: bool,
    pub continue_on_error: bool,
}

/// Per-run overrides; `None` falls back to the routine's own default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PolicyOverrides {
    pub subprocess: Option<bool>,
    pub atomic: Option<bool>,
    pub continue_on_error: Option<bool>,
}

impl PolicyOverrides {
    pub fn resolve(&self, routine: &Routine) -> Policy {
        Policy {
            subprocess: self.subprocess.unwrap_or(routine.subprocess),
            atomic: self.atomic.unwrap_or(routine.atomic),
            continue_on_error: self.continue_on_error.unwrap_or(routine.continue_on_error),
        }
    }
}

/// What the runner does after a command failed and `failed` was broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    /// Move on to the next command.
    Continue,
    /// Stop the routine, reporting an early exit at the failing index.
    ExitEarly,
    /// Roll back and propagate the error to the caller.
    Abort,
}

/// Combine the listeners' verdict with the continue-on-error policy.
///
/// Listeners are consulted first: an early-exit request beats everything,
/// and a listener that handled the failure lets the run continue even when
/// the policy would abort.
pub fn decide_failure(response: FailureResponse, continue_on_error: bool) -> FailureAction {
    match response {
        FailureResponse::ExitEarly => FailureAction::ExitEarly,
        FailureResponse::Continue => FailureAction::Continue,
        FailureResponse::Propagate if continue_on_error => FailureAction::Continue,
        FailureResponse::Propagate => FailureAction::Abort,
    }
}
