//! Transactions and completion notification for dependent statements.

use crate::database::Database;
use crate::error::{Error, Result};
use crate::protocol::constants::*;
use crate::protocol::messages::{HandleMessage, StartTransactionMessage};
use std::sync::{Arc, Mutex, Weak};

/// Transaction parameter buffer used when none is given:
/// read-write, read committed with record versions, wait on conflicts.
pub fn default_tpb() -> Vec<u8> {
    vec![
        ISC_TPB_VERSION3,
        ISC_TPB_WRITE,
        ISC_TPB_READ_COMMITTED,
        ISC_TPB_REC_VERSION,
        ISC_TPB_WAIT,
    ]
}

/// Lifecycle of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    RolledBack,
}

/// Told when the transaction it subscribed to commits or rolls back.
///
/// The transaction keeps weak references only, so dropped observers fall out
/// of its list on their own.
pub(crate) trait CompletionObserver: Send + Sync {
    fn notify_completed(&self);
}

pub(crate) struct TransactionInner {
    db: Database,
    handle: i32,
    state: Mutex<TransactionState>,
    observers: Mutex<Vec<Weak<dyn CompletionObserver>>>,
}

impl TransactionInner {
    pub(crate) fn handle(&self) -> i32 {
        self.handle
    }

    pub(crate) fn is_active(&self) -> bool {
        self.state
            .lock()
            .map(|state| *state == TransactionState::Active)
            .unwrap_or(false)
    }

    fn subscribe(&self, observer: Weak<dyn CompletionObserver>) {
        if let Ok(mut observers) = self.observers.lock() {
            observers.retain(|o| o.strong_count() > 0);
            observers.push(observer);
        }
    }

    pub(crate) fn unsubscribe(&self, observer: &Weak<dyn CompletionObserver>) {
        if let Ok(mut observers) = self.observers.lock() {
            observers.retain(|o| o.strong_count() > 0 && !std::ptr::addr_eq(o.as_ptr(), observer.as_ptr()));
        }
    }

    fn complete(&self, state: TransactionState) {
        if let Ok(mut current) = self.state.lock() {
            *current = state;
        }
        let observers = self
            .observers
            .lock()
            .map(|mut o| std::mem::take(&mut *o))
            .unwrap_or_default();
        tracing::debug!(
            handle = self.handle,
            ?state,
            observers = observers.len(),
            "transaction completed"
        );
        for observer in observers.iter().filter_map(Weak::upgrade) {
            observer.notify_completed();
        }
    }
}

impl Drop for TransactionInner {
    fn drop(&mut self) {
        if self.is_active() {
            tracing::debug!(handle = self.handle, "active transaction dropped without commit or rollback");
        }
    }
}

/// A started transaction.
///
/// Cloning shares the transaction. Statements bound to it are told when it
/// commits or rolls back; their open cursors are closed at that point.
#[derive(Clone)]
pub struct Transaction {
    inner: Arc<TransactionInner>,
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("handle", &self.inner.handle)
            .field("state", &self.state())
            .finish()
    }
}

impl Transaction {
    /// Start a transaction with `tpb`, or [`default_tpb`] when `None`.
    pub async fn begin(db: &Database, tpb: Option<&[u8]>) -> Result<Self> {
        let default;
        let tpb = match tpb {
            Some(tpb) => tpb,
            None => {
                default = default_tpb();
                &default
            }
        };

        let response = {
            let mut conv = db.conversation().await;
            conv.call(&StartTransactionMessage {
                database: db.handle(),
                tpb,
            })
            .await?
        };
        tracing::debug!(handle = response.handle, "transaction started");

        Ok(Self {
            inner: Arc::new(TransactionInner {
                db: db.clone(),
                handle: response.handle,
                state: Mutex::new(TransactionState::Active),
                observers: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn handle(&self) -> i32 {
        self.inner.handle
    }

    pub fn state(&self) -> TransactionState {
        self.inner
            .state
            .lock()
            .map(|s| *s)
            .unwrap_or(TransactionState::RolledBack)
    }

    pub fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    pub async fn commit(&self) -> Result<()> {
        self.finish(OP_COMMIT).await?;
        self.inner.complete(TransactionState::Committed);
        Ok(())
    }

    pub async fn rollback(&self) -> Result<()> {
        self.finish(OP_ROLLBACK).await?;
        self.inner.complete(TransactionState::RolledBack);
        Ok(())
    }

    /// Commit and keep the transaction context; open cursors stay usable.
    pub async fn commit_retaining(&self) -> Result<()> {
        self.finish(OP_COMMIT_RETAINING).await
    }

    /// Roll back and keep the transaction context.
    pub async fn rollback_retaining(&self) -> Result<()> {
        self.finish(OP_ROLLBACK_RETAINING).await
    }

    async fn finish(&self, operation: i32) -> Result<()> {
        if !self.is_active() {
            return Err(Error::invalid_state("Transaction is not active."));
        }
        let mut conv = self.inner.db.conversation().await;
        conv.call(&HandleMessage::new(operation, self.inner.handle))
            .await
            .map(|_| ())
    }

    /// Register `observer` for the commit or rollback of this transaction.
    pub(crate) fn subscribe(&self, observer: Weak<dyn CompletionObserver>) -> Weak<TransactionInner> {
        self.inner.subscribe(observer);
        Arc::downgrade(&self.inner)
    }
}
