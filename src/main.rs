//! Fund Ledger CLI
//!
//! Replays an operation journal from a CSV file and prints a report.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- journal.csv > accounts.csv
//! cargo run -- --strategy sync journal.csv > accounts.csv
//! cargo run -- --output allocations journal.csv > allocations.csv
//! cargo run -- --strategy async --batch-size 2000 --max-concurrent 8 journal.csv
//! RUST_LOG=info cargo run -- --output history --currency EUR journal.csv
//! ```
//!
//! Reports go to stdout; logs go to stderr.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (file not found, file not readable, etc.)
//! - 2: Invalid command-line arguments

use fund_ledger::cli;
use fund_ledger::strategy;
use std::process;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = cli::parse_args();
    let strategy = strategy::create_strategy(args.strategy, args.to_pipeline_config());

    let mut output = std::io::stdout();
    if let Err(e) = strategy.process(&args.input_file, &mut output) {
        error!(error = %e, "replay failed");
        process::exit(1);
    }
}
