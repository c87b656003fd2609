// src/exec/launcher.rs

//! Pluggable process launcher.
//!
//! The runner talks to a [`ProcessLauncher`] instead of spawning processes
//! itself. Production code uses [`TokioLauncher`]; tests can provide a fake
//! that records argv and returns canned outputs.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::{Result, RoutineError};
use crate::types::ProcessOutput;

/// Environment handed to a child process.
pub type Environment = BTreeMap<OsString, OsString>;

/// Snapshot of the current process environment, byte for byte.
pub fn current_environment() -> Environment {
    std::env::vars_os().collect()
}

/// Trait abstracting how external processes are run.
pub trait ProcessLauncher: Send + Sync {
    /// Run `argv` to completion with exactly `env` as its environment.
    ///
    /// A process that starts and exits non-zero is *not* an error here; the
    /// exit code is part of the returned [`ProcessOutput`]. Only failing to
    /// start or wait for the process is.
    fn launch(
        &self,
        argv: Vec<String>,
        env: Environment,
    ) -> Pin<Box<dyn Future<Output = Result<ProcessOutput>> + Send + '_>>;
}

/// Launcher backed by `tokio::process`.
///
/// Output is captured; with `echo` on (the default) each line is also
/// forwarded to this process's stdout/stderr as it arrives.
#[derive(Debug, Clone, Copy)]
pub struct TokioLauncher {
    pub echo: bool,
}

impl Default for TokioLauncher {
    fn default() -> Self {
        Self { echo: true }
    }
}

impl TokioLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quiet() -> Self {
        Self { echo: false }
    }
}

impl ProcessLauncher for TokioLauncher {
    fn launch(
        &self,
        argv: Vec<String>,
        env: Environment,
    ) -> Pin<Box<dyn Future<Output = Result<ProcessOutput>> + Send + '_>> {
        let echo = self.echo;
        Box::pin(async move { run_process(argv, env, echo).await })
    }
}

async fn run_process(argv: Vec<String>, env: Environment, echo: bool) -> Result<ProcessOutput> {
    let Some((program, args)) = argv.split_first() else {
        return Err(RoutineError::ImproperlyConfigured(
            "cannot run a process with an empty argv".to_string(),
        ));
    };

    info!(cmd = %argv.join(" "), "starting process");

    let mut child = Command::new(program)
        .args(args)
        .env_clear()
        .envs(&env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let (stdout, stderr, status) = tokio::join!(
        collect_lines(stdout, echo, Stream::Stdout),
        collect_lines(stderr, echo, Stream::Stderr),
        child.wait(),
    );
    let status = status?;

    let code = status.code().unwrap_or(-1);
    info!(cmd = %program, exit_code = code, success = status.success(), "process exited");

    Ok(ProcessOutput {
        code,
        stdout: stdout?,
        stderr: stderr?,
    })
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

async fn collect_lines<R>(reader: Option<R>, echo: bool, stream: Stream) -> Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut captured = String::new();
    let Some(reader) = reader else {
        return Ok(captured);
    };

    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        match stream {
            Stream::Stdout if echo => println!("{line}"),
            Stream::Stderr if echo => eprintln!("{line}"),
            _ => debug!(?stream, "{}", line),
        }
        captured.push_str(&line);
        captured.push('\n');
    }
    Ok(captured)
}
