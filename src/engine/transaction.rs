// src/engine/transaction.rs

//! Transaction scoping for atomic runs.
//!
//! The engine has no storage of its own. Applications that want `atomic`
//! runs to mean something plug in a [`TransactionProvider`]; the runner opens
//! one transaction before `initialize`, commits it once every command has run
//! (or the routine exited early) and rolls it back when an error escapes.

use crate::errors::Result;

/// An open transaction. Consumed by either [`commit`](Transaction::commit)
/// or [`rollback`](Transaction::rollback).
pub trait Transaction: Send {
    fn commit(self: Box<Self>) -> Result<()>;
    fn rollback(self: Box<Self>) -> Result<()>;
}

/// Opens transactions for atomic runs.
pub trait TransactionProvider: Send + Sync {
    fn begin(&self) -> Result<Box<dyn Transaction + '_>>;
}

/// Provider for applications without transactional storage.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTransactions;

struct NoopTransaction;

impl Transaction for NoopTransaction {
    fn commit(self: Box<Self>) -> Result<()> {
        Ok(())
    }

    fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

impl TransactionProvider for NoTransactions {
    fn begin(&self) -> Result<Box<dyn Transaction + '_>> {
        Ok(Box::new(NoopTransaction))
    }
}
