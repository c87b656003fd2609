use std::sync::{Arc, Mutex};

use anyhow::{Context, bail};
use routines::exec::{CommandHandler, Parameter};
use routines::types::Options;

/// One recorded invocation of the `track` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRecord {
    pub id: i64,
    pub demo: Option<i64>,
    pub flag: bool,
    pub verbosity: Option<i64>,
}

impl TrackRecord {
    pub fn id(id: i64) -> Self {
        Self {
            id,
            demo: None,
            flag: false,
            verbosity: None,
        }
    }
}

/// `track <id>... [--demo N] [--flag] [--raise] [--verbosity N]`.
///
/// Records each id it is called with and returns them space-joined.
/// `--raise` makes it fail after recording.
#[derive(Debug, Clone)]
pub struct Tracker {
    records: Arc<Mutex<Vec<TrackRecord>>>,
    parameters: Vec<Parameter>,
}

impl Default for Tracker {
    fn default() -> Self {
        Self {
            records: Arc::default(),
            parameters: vec![
                Parameter::int("demo"),
                Parameter::flag("flag", false),
                Parameter::flag("raise", false),
                Parameter::int("verbosity"),
            ],
        }
    }
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<TrackRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Recorded ids, in call order.
    pub fn ids(&self) -> Vec<i64> {
        self.records().iter().map(|r| r.id).collect()
    }
}

impl CommandHandler for Tracker {
    fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    fn handle(&self, args: &[String], options: &Options) -> anyhow::Result<Option<String>> {
        let int = |key: &str| options.get(key).and_then(|v| v.as_integer());
        let flag = |key: &str| options.get(key).and_then(|v| v.as_bool()).unwrap_or(false);

        for arg in args {
            let id = arg
                .parse::<i64>()
                .with_context(|| format!("track id must be an integer, got '{arg}'"))?;
            self.records.lock().unwrap().push(TrackRecord {
                id,
                demo: int("demo"),
                flag: flag("flag"),
                verbosity: int("verbosity"),
            });
        }
        if flag("raise") {
            bail!("track failed for {}", args.join(" "));
        }
        Ok(Some(args.join(" ")))
    }
}
