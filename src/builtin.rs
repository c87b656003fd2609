// src/builtin.rs

//! Commands and callbacks shipped with the `routine` binary.
//!
//! Applications embedding the library register their own handlers next to
//! (or instead of) these.

use std::time::Duration;

use anyhow::bail;
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::info;

use crate::exec::{CommandTable, Parameter};
use crate::hooks::CallbackTable;

/// `echo [--upper] <words...>`, `sleep [--seconds N]` and `fail [message]`.
pub fn commands() -> CommandTable {
    let mut table = CommandTable::new();
    table
        .register_fn("echo", vec![Parameter::flag("upper", false)], |args, options| {
            let mut line = args.join(" ");
            if options.get("upper").and_then(|v| v.as_bool()).unwrap_or(false) {
                line = line.to_uppercase();
            }
            Ok(Some(line))
        })
        .register_fn("sleep", vec![Parameter::int("seconds")], |_, options| {
            let seconds = options
                .get("seconds")
                .and_then(|v| v.as_integer())
                .unwrap_or(1);
            if seconds < 0 {
                bail!("--seconds must not be negative (got {seconds})");
            }
            let duration = Duration::from_secs(seconds.unsigned_abs());
            blocking(|| std::thread::sleep(duration));
            Ok(None)
        })
        .register_fn("fail", Vec::new(), |args, _| {
            if args.is_empty() {
                bail!("command failed");
            }
            bail!("{}", args.join(" "))
        });
    table
}

/// Run a blocking section without stalling the runtime's other tasks.
///
/// Handlers are synchronous; on a multi-threaded runtime the worker hands
/// its queue off first. Elsewhere (current-thread runtime, no runtime) the
/// closure simply runs.
fn blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

/// Hook `log` (traces the command, never skips) and finalize callback
/// `summary` (logs how many results were collected).
pub fn callbacks() -> CallbackTable {
    let mut table = CallbackTable::new();
    table
        .register_hook("log", |routine, command, _, _| {
            info!(routine = %routine.name(), command = %command, "running command");
            Ok(false)
        })
        .register_finalizer("summary", |routine, results| {
            info!(routine = %routine.name(), results = results.len(), "routine summary");
            Ok(())
        });
    table
}
