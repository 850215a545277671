//! Batch processing with user-based partitioning for journal replay
//!
//! This module provides the `BatchProcessor` struct, which applies batches of
//! journal records to a shared [`Ledger`] concurrently while maintaining
//! per-user ordering.
//!
//! # Design
//!
//! Each batch is partitioned by user. Every user's records run sequentially
//! inside one tokio task, and the tasks for different users run in parallel.
//! Records of one user always touch the same account, so the ledger's
//! per-account lock is never contended by the processor itself.
//!
//! # Thread Safety
//!
//! The processor is cloneable and can be safely shared across async tasks.
//! The ledger is shared through an `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::error;

use super::Ledger;
use crate::types::{AccountSnapshot, JournalRecord, LedgerError, UserId};

/// Result of applying a single journal record
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// The record that was applied
    pub record: JournalRecord,

    /// The account state after the record, or why it was rejected
    pub result: Result<AccountSnapshot, LedgerError>,
}

/// Batch processor with user-based partitioning
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    ledger: Arc<Ledger>,
}

impl BatchProcessor {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    /// Partition a batch of records by user
    ///
    /// # Guarantees
    ///
    /// - Each record appears in exactly one sub-batch
    /// - Records for each user keep their original order
    pub fn partition_by_user(
        &self,
        batch: Vec<JournalRecord>,
    ) -> HashMap<UserId, Vec<JournalRecord>> {
        let mut user_batches: HashMap<UserId, Vec<JournalRecord>> = HashMap::new();

        for record in batch {
            user_batches
                .entry(record.user.clone())
                .or_default()
                .push(record);
        }

        user_batches
    }

    /// Apply all records of a single user in order
    ///
    /// A rejected record is captured in its result and does not stop the
    /// records after it.
    pub async fn process_user_records(&self, records: Vec<JournalRecord>) -> Vec<ProcessingResult> {
        let mut results = Vec::with_capacity(records.len());

        for record in records {
            let result = self.ledger.apply_record(&record);
            results.push(ProcessingResult { record, result });
        }

        results
    }

    /// Apply a batch, one concurrent task per user
    ///
    /// Results are grouped by user; their order across users is unspecified.
    pub async fn process_batch(&self, batch: Vec<JournalRecord>) -> Vec<ProcessingResult> {
        let user_batches = self.partition_by_user(batch);

        let mut tasks = Vec::with_capacity(user_batches.len());
        for (_user, records) in user_batches {
            let processor = self.clone();
            tasks.push(tokio::spawn(async move {
                processor.process_user_records(records).await
            }));
        }

        let mut results = Vec::new();
        for task in tasks {
            match task.await {
                Ok(user_results) => results.extend(user_results),
                Err(e) => error!(error = %e, "replay task failed"),
            }
        }

        results
    }
}
