//! Processing strategy module for journal replay
//!
//! This module defines the Strategy pattern for complete replay pipelines,
//! encompassing CSV parsing, application of every record to a [`Ledger`] and
//! report output. This allows different processing implementations
//! (synchronous, asynchronous batch) to be selected at runtime.

use crate::cli::{OutputKind, StrategyType};
use crate::core::{Ledger, LedgerConfig};
use crate::io::{write_accounts_csv, write_allocations_csv, write_transactions_csv};
use crate::types::{AccountSnapshot, HistoryFilter, LedgerError};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Settings shared by every strategy
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub ledger: LedgerConfig,
    pub output: OutputKind,

    /// Ignored by the synchronous strategy
    pub batch: BatchConfig,
}

/// Outcome counters of one replay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Records applied to the ledger
    pub applied: usize,

    /// Well-formed records the ledger refused (insufficient funds, ...)
    pub rejected: usize,

    /// Rows that could not be parsed into a record
    pub skipped: usize,
}

impl ReplaySummary {
    pub fn record(&mut self, result: &Result<AccountSnapshot, LedgerError>) {
        match result {
            Ok(_) => self.applied += 1,
            Err(_) => self.rejected += 1,
        }
    }

    fn log(&self, ledger: &Ledger) {
        info!(
            applied = self.applied,
            rejected = self.rejected,
            skipped = self.skipped,
            accounts = ledger.account_count(),
            "journal replayed"
        );
    }
}

/// Processing strategy trait for complete replay pipelines
///
/// Each strategy reads journal records from a CSV file and applies them to a
/// fresh ledger. Individual record errors (malformed rows, rejected
/// operations) are logged and skipped; only fatal errors end the replay.
pub trait ProcessingStrategy: Send + Sync {
    fn config(&self) -> &PipelineConfig;

    /// Replay a journal into a new ledger
    ///
    /// # Arguments
    ///
    /// * `input_path` - Path to the journal CSV
    ///
    /// # Returns
    ///
    /// * `Ok(ledger)` once every record has been applied or skipped
    /// * `Err(String)` if a fatal error occurred (file not found, runtime error, etc.)
    fn replay(&self, input_path: &Path) -> Result<Arc<Ledger>, String>;

    /// Replay a journal and write the configured report to `output`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The input file cannot be opened (file not found, permission denied)
    /// - A fatal I/O error occurs during reading or writing
    /// - Output cannot be written
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String> {
        let ledger = self.replay(input_path)?;
        write_report(&ledger, self.config().output, output)
    }
}

/// Create a processing strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - The type of processing strategy to create (Sync or Async)
/// * `config` - Ledger, report and batching settings
///
/// # Returns
///
/// A boxed trait object implementing the ProcessingStrategy trait
pub fn create_strategy(
    strategy_type: StrategyType,
    config: PipelineConfig,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy::new(config)),
        StrategyType::Async => Box::new(AsyncProcessingStrategy::new(config)),
    }
}

/// Write one of the ledger reports as CSV
pub fn write_report(
    ledger: &Ledger,
    kind: OutputKind,
    output: &mut dyn Write,
) -> Result<(), String> {
    let accounts = ledger.accounts();
    match kind {
        OutputKind::Accounts => write_accounts_csv(&accounts, output),
        OutputKind::Allocations => write_allocations_csv(&accounts, output),
        OutputKind::History => {
            let mut entries = Vec::new();
            for account in &accounts {
                let history = ledger
                    .history(account.id, HistoryFilter::new())
                    .map_err(|e| e.to_string())?;
                entries.extend(
                    history
                        .into_iter()
                        .map(|tx| (account.user_id.clone(), tx)),
                );
            }
            write_transactions_csv(&entries, output)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AllocationKey, AssetType, UserId};
    use rstest::rstest;
    use rust_decimal::Decimal;

    fn ledger() -> Ledger {
        let ledger = Ledger::default();
        let alice = ledger
            .open_account(UserId::new("alice"), Default::default(), Decimal::new(100, 0))
            .unwrap()
            .id;
        ledger
            .allocate(
                alice,
                Decimal::new(40, 0),
                AllocationKey::new(AssetType::Stock, "AAPL").unwrap(),
            )
            .unwrap();
        ledger
    }

    #[rstest]
    #[case::accounts(OutputKind::Accounts, "user,currency,total,available,allocated\nalice,USD,100.0000,60.0000,40.0000\n")]
    #[case::allocations(OutputKind::Allocations, "user,asset_type,asset_id,amount\nalice,stock,AAPL,40.0000\n")]
    fn test_write_report(#[case] kind: OutputKind, #[case] expected: &str) {
        let mut output = Vec::new();
        write_report(&ledger(), kind, &mut output).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), expected);
    }

    #[test]
    fn test_write_history_report() {
        let mut output = Vec::new();
        write_report(&ledger(), OutputKind::History, &mut output).unwrap();

        let output = String::from_utf8(output).unwrap();
        let rows: Vec<&str> = output.lines().collect();
        assert_eq!(rows.len(), 3);
        assert!(rows[1].starts_with("alice,1,deposit,100.0000,,,"));
        assert!(rows[1].ends_with(",Initial deposit"));
        assert!(rows[2].starts_with("alice,2,allocation,40.0000,stock,AAPL,"));
        assert!(rows[2].ends_with(",Allocated for trading stock"));
    }

    #[test]
    fn test_summary_counts() {
        let ledger = ledger();
        let alice = ledger.account_for_user(&UserId::new("alice")).unwrap();
        let mut summary = ReplaySummary::default();

        summary.record(&ledger.deposit(alice, Decimal::ONE));
        summary.record(&ledger.withdraw(alice, Decimal::new(1000, 0)));

        assert_eq!(
            summary,
            ReplaySummary {
                applied: 1,
                rejected: 1,
                skipped: 0
            }
        );
    }
}
