//! Transaction history views
//!
//! A [`TransactionHistory`] pairs a shared prefix of an account's log with a
//! [`HistoryFilter`]. Filtering happens lazily while iterating, the sequence
//! is finite (the prefix never grows), and every call to
//! [`TransactionHistory::iter`] starts over from the oldest entry.
//!
//! The history owns its own reference to the log, so iterating it never
//! holds the account lock.

use crate::types::{HistoryFilter, Transaction};
use std::sync::Arc;

/// Ordered, filtered view over a fixed log prefix
#[derive(Debug, Clone)]
pub struct TransactionHistory {
    log: Arc<Vec<Transaction>>,
    filter: HistoryFilter,
}

impl TransactionHistory {
    pub(crate) fn new(log: Arc<Vec<Transaction>>, filter: HistoryFilter) -> Self {
        Self { log, filter }
    }

    /// Iterate matching transactions, oldest first
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.log.iter(),
            filter: &self.filter,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Collect matching transactions into an owned vector
    pub fn to_vec(&self) -> Vec<Transaction> {
        self.iter().cloned().collect()
    }
}

/// Borrowing iterator over a [`TransactionHistory`]
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    inner: std::slice::Iter<'a, Transaction>,
    filter: &'a HistoryFilter,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Transaction;

    fn next(&mut self) -> Option<Self::Item> {
        let filter = self.filter;
        self.inner.find(|tx| filter.matches(tx))
    }
}

impl<'a> IntoIterator for &'a TransactionHistory {
    type Item = &'a Transaction;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Owning iterator over a [`TransactionHistory`]
#[derive(Debug)]
pub struct IntoIter {
    history: TransactionHistory,
    position: usize,
}

impl Iterator for IntoIter {
    type Item = Transaction;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(tx) = self.history.log.get(self.position) {
            self.position += 1;
            if self.history.filter.matches(tx) {
                return Some(tx.clone());
            }
        }
        None
    }
}

impl IntoIterator for TransactionHistory {
    type Item = Transaction;
    type IntoIter = IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            history: self,
            position: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        AccountId, AllocationKey, AssetType, TransactionKind, TransactionStatus,
    };
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn log() -> Arc<Vec<Transaction>> {
        let account_id = AccountId::new();
        let btc = AllocationKey::new(AssetType::Crypto, "BTC").unwrap();
        let entries = [
            (TransactionKind::Deposit, None),
            (TransactionKind::Allocation, Some(btc.clone())),
            (TransactionKind::Withdrawal, None),
            (TransactionKind::Deallocation, Some(btc)),
        ];
        Arc::new(
            entries
                .into_iter()
                .enumerate()
                .map(|(i, (kind, asset))| Transaction {
                    id: i as u64 + 1,
                    account_id,
                    kind,
                    amount: Decimal::ONE,
                    asset,
                    timestamp: Utc::now(),
                    status: TransactionStatus::Completed,
                    note: None,
                })
                .collect(),
        )
    }

    #[test]
    fn test_iteration_is_ordered_and_restartable() {
        let history = TransactionHistory::new(log(), HistoryFilter::new());

        let first: Vec<u64> = history.iter().map(|tx| tx.id).collect();
        let second: Vec<u64> = history.iter().map(|tx| tx.id).collect();

        assert_eq!(first, vec![1, 2, 3, 4]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_filter_is_applied_lazily() {
        let filter = HistoryFilter::new().asset_type(AssetType::Crypto);
        let history = TransactionHistory::new(log(), filter);

        let mut iter = history.iter();
        assert_eq!(iter.next().map(|tx| tx.id), Some(2));
        assert_eq!(iter.next().map(|tx| tx.id), Some(4));
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn test_owned_iteration_matches_borrowed() {
        let filter = HistoryFilter::new().kind(TransactionKind::Withdrawal);
        let history = TransactionHistory::new(log(), filter);
        let borrowed = history.to_vec();

        let owned: Vec<Transaction> = history.into_iter().collect();

        assert_eq!(owned, borrowed);
        assert_eq!(owned.len(), 1);
    }

    #[test]
    fn test_empty_history() {
        let history = TransactionHistory::new(Arc::new(Vec::new()), HistoryFilter::new());
        assert!(history.is_empty());
        assert_eq!((&history).into_iter().count(), 0);
    }
}
