use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use anyhow::bail;
use routines::engine::{Transaction, TransactionProvider};
use routines::errors::Result;
use routines::exec::{CommandHandler, Parameter};
use routines::types::Options;

/// In-memory key/value store whose transactions snapshot and restore it.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, key: &str, value: &str) {
        self.data
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.data.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.data.lock().unwrap().keys().cloned().collect()
    }
}

struct MemoryTransaction<'a> {
    store: &'a MemoryStore,
    snapshot: BTreeMap<String, String>,
}

impl Transaction for MemoryTransaction<'_> {
    fn commit(self: Box<Self>) -> Result<()> {
        Ok(())
    }

    fn rollback(self: Box<Self>) -> Result<()> {
        let MemoryTransaction { store, snapshot } = *self;
        *store.data.lock().unwrap() = snapshot;
        Ok(())
    }
}

impl TransactionProvider for MemoryStore {
    fn begin(&self) -> Result<Box<dyn Transaction + '_>> {
        let snapshot = self.data.lock().unwrap().clone();
        Ok(Box::new(MemoryTransaction {
            store: self,
            snapshot,
        }))
    }
}

/// `edit <key> [--value V] [--raise]`: writes into a [`MemoryStore`].
///
/// `--raise` fails *after* writing, so a rollback is observable.
#[derive(Debug, Clone)]
pub struct EditHandler {
    store: Arc<MemoryStore>,
    parameters: Vec<Parameter>,
}

impl EditHandler {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            parameters: vec![Parameter::string("value"), Parameter::flag("raise", false)],
        }
    }
}

impl CommandHandler for EditHandler {
    fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    fn handle(&self, args: &[String], options: &Options) -> anyhow::Result<Option<String>> {
        let value = options
            .get("value")
            .and_then(|v| v.as_str())
            .unwrap_or("edited");
        for key in args {
            self.store.set(key, value);
        }
        if options.get("raise").and_then(|v| v.as_bool()).unwrap_or(false) {
            bail!("edit failed after writing {}", args.join(" "));
        }
        Ok(None)
    }
}
