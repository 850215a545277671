use crate::core::LedgerConfig;
use crate::strategy::{BatchConfig, PipelineConfig};
use crate::types::Currency;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Replay a fund ledger journal and report balances
#[derive(Parser, Debug)]
#[command(name = "fund-ledger")]
#[command(about = "Replay a fund ledger journal and report balances", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing journal records
    #[arg(value_name = "INPUT", help = "Path to the journal CSV file")]
    pub input_file: PathBuf,

    /// Processing strategy to use for replaying the journal
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Processing strategy: 'sync' for synchronous or 'async' for asynchronous"
    )]
    pub strategy: StrategyType,

    /// Number of records per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of records per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Maximum number of concurrent batches (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Worker threads for batch processing (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,

    /// Currency of accounts opened while replaying
    #[arg(
        long = "currency",
        value_name = "CODE",
        default_value = "USD",
        help = "Three-letter currency code for new accounts"
    )]
    pub currency: Currency,

    /// Report written to stdout
    #[arg(
        long = "output",
        value_name = "REPORT",
        default_value = "accounts",
        help = "Report to write: balances per account, allocations per asset or the full history"
    )]
    pub output: OutputKind,
}

/// Available processing strategies for journal replay
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

/// Reports the replay can produce
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputKind {
    #[default]
    Accounts,
    Allocations,
    History,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments
    ///
    /// Values not given on the command line come from the defaults; zero
    /// values are replaced by the defaults with a warning.
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }

    pub fn to_ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            default_currency: self.currency,
            ..LedgerConfig::default()
        }
    }

    /// Everything the selected strategy needs
    pub fn to_pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            ledger: self.to_ledger_config(),
            output: self.output,
            batch: self.to_batch_config(),
        }
    }
}
