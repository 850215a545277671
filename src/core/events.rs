//! Ledger change events
//!
//! After every successful mutation the ledger publishes a [`LedgerEvent`]
//! carrying the new snapshot and the transaction that produced it. Delivery
//! uses a `tokio::sync::broadcast` channel: publishing never blocks, every
//! subscriber sees events in publication order, and events published while
//! nobody listens are dropped.

use crate::types::{AccountSnapshot, Transaction};
use tokio::sync::broadcast;
use tracing::trace;

/// New account state paired with the transaction that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEvent {
    pub snapshot: AccountSnapshot,
    pub transaction: Transaction,
}

/// Fan-out channel for [`LedgerEvent`]s
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<LedgerEvent>,
}

impl EventBus {
    /// Create a bus retaining up to `capacity` undelivered events per subscriber
    ///
    /// A slow subscriber that falls further behind receives
    /// `RecvError::Lagged` and skips ahead.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.sender.subscribe()
    }

    pub(crate) fn publish(&self, event: LedgerEvent) {
        // Err only means there is currently no subscriber
        if self.sender.send(event).is_err() {
            trace!("ledger event dropped, no subscribers");
        }
    }
}
