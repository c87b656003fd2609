use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use routines::errors::Result;
use routines::exec::{Environment, ProcessLauncher};
use routines::types::ProcessOutput;

/// A fake launcher that:
/// - records the argv of every "launched" process
/// - exits 0 with the joined argv as stdout, unless a failure rule matches.
#[derive(Debug, Clone, Default)]
pub struct FakeLauncher {
    launched: Arc<Mutex<Vec<Vec<String>>>>,
    failures: Arc<Mutex<Vec<(String, i32)>>>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make any process whose joined argv contains `needle` exit with `code`.
    pub fn fail_on(self, needle: &str, code: i32) -> Self {
        self.failures
            .lock()
            .unwrap()
            .push((needle.to_string(), code));
        self
    }

    /// Every argv launched so far, in order.
    pub fn launched(&self) -> Vec<Vec<String>> {
        self.launched.lock().unwrap().clone()
    }

    /// Launched argv rendered as space-joined strings.
    pub fn launched_lines(&self) -> Vec<String> {
        self.launched().iter().map(|argv| argv.join(" ")).collect()
    }
}

impl ProcessLauncher for FakeLauncher {
    fn launch(
        &self,
        argv: Vec<String>,
        _env: Environment,
    ) -> Pin<Box<dyn Future<Output = Result<ProcessOutput>> + Send + '_>> {
        let line = argv.join(" ");
        self.launched.lock().unwrap().push(argv);
        let code = self
            .failures
            .lock()
            .unwrap()
            .iter()
            .find(|(needle, _)| line.contains(needle.as_str()))
            .map(|(_, code)| *code)
            .unwrap_or(0);

        Box::pin(async move {
            Ok(ProcessOutput {
                code,
                stdout: format!("{line}\n"),
                stderr: String::new(),
            })
        })
    }
}
