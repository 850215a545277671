//! Synchronous processing strategy
//!
//! This module provides a synchronous, single-threaded implementation of the
//! ProcessingStrategy trait.
//!
//! # Design
//!
//! The SyncProcessingStrategy focuses on orchestration, delegating:
//! - CSV parsing to `SyncReader` (iterator interface)
//! - Operation validation and application to `Ledger`
//! - CSV output to `strategy::write_report`
//!
//! Records are streamed one at a time, so memory grows with the ledger
//! contents and never with the size of the journal file itself.

use crate::core::Ledger;
use crate::io::sync_reader::SyncReader;
use crate::strategy::{PipelineConfig, ProcessingStrategy, ReplaySummary};
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Synchronous processing strategy
///
/// # Examples
///
/// ```no_run
/// use fund_ledger::strategy::{PipelineConfig, ProcessingStrategy, SyncProcessingStrategy};
/// use std::path::Path;
/// use std::io;
///
/// let strategy = SyncProcessingStrategy::new(PipelineConfig::default());
/// let mut output = io::stdout();
///
/// strategy.process(Path::new("journal.csv"), &mut output)
///     .expect("Processing failed");
/// ```
#[derive(Debug, Clone, Default)]
pub struct SyncProcessingStrategy {
    config: PipelineConfig,
}

impl SyncProcessingStrategy {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }
}

impl ProcessingStrategy for SyncProcessingStrategy {
    fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Replay the journal in file order on the calling thread
    ///
    /// Fatal errors (file not found) are returned immediately. Malformed rows
    /// and rejected operations are logged and processing continues.
    fn replay(&self, input_path: &Path) -> Result<Arc<Ledger>, String> {
        let ledger = Ledger::new(self.config.ledger.clone());
        let reader = SyncReader::new(input_path)?;
        let mut summary = ReplaySummary::default();

        for result in reader {
            match result {
                Ok(record) => {
                    let outcome = ledger.apply_record(&record);
                    if let Err(e) = &outcome {
                        warn!(user = %record.user, kind = %record.kind, error = %e, "operation rejected");
                    }
                    summary.record(&outcome);
                }
                Err(e) => {
                    summary.skipped += 1;
                    warn!(error = %e, "skipping journal record");
                }
            }
        }

        summary.log(&ledger);
        Ok(Arc::new(ledger))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserId;
    use rust_decimal::Decimal;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper function to create a temporary CSV file for testing
    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    #[test]
    fn test_sync_strategy_replays_journal() {
        let file = create_temp_csv(
            "type,user,amount,asset_type,asset_id,note\n\
             deposit,alice,1000,,,\n\
             allocation,alice,300,crypto,BTC,\n\
             withdrawal,alice,200,,,\n\
             deposit,bob,50,,,\n",
        );

        let strategy = SyncProcessingStrategy::default();
        let ledger = strategy.replay(file.path()).unwrap();

        assert_eq!(ledger.account_count(), 2);
        let alice = ledger.account_for_user(&UserId::new("alice")).unwrap();
        let snapshot = ledger.snapshot(alice).unwrap();
        assert_eq!(snapshot.total_balance, Decimal::new(800, 0));
        assert_eq!(snapshot.available_balance, Decimal::new(500, 0));
        assert_eq!(snapshot.allocated_balance, Decimal::new(300, 0));
    }

    #[test]
    fn test_sync_strategy_handles_missing_file() {
        let strategy = SyncProcessingStrategy::default();
        let mut output = Vec::new();

        let result = strategy.process(Path::new("nonexistent.csv"), &mut output);
        assert!(result.unwrap_err().contains("Failed to open file"));
    }

    #[test]
    fn test_sync_strategy_continues_on_bad_records() {
        let file = create_temp_csv(
            "type,user,amount,asset_type,asset_id,note\n\
             deposit,alice,100.0\n\
             deposit,bob,invalid\n\
             withdrawal,alice,500\n\
             deposit,carol,50.0\n",
        );

        let strategy = SyncProcessingStrategy::default();
        let mut output = Vec::new();
        strategy.process(file.path(), &mut output).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "user,currency,total,available,allocated\n\
             alice,USD,100.0000,100.0000,0.0000\n\
             carol,USD,50.0000,50.0000,0.0000\n"
        );
    }

    #[test]
    fn test_sync_strategy_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SyncProcessingStrategy>();
    }
}
