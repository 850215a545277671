//! Asynchronous batch processing strategy
//!
//! This module provides an asynchronous, multi-threaded implementation of the
//! ProcessingStrategy trait. It replays the journal in batches using
//! thread-based parallelism with user-based partitioning.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncReader (batch CSV reading)
//!     ├── BatchProcessor (user partitioning + tokio tasks)
//!     └── Arc<Ledger> (per-account locking over DashMap)
//! ```
//!
//! # Ordering
//!
//! - Batches are processed one after another, so a user whose records span
//!   several batches still sees them in file order
//! - Within a batch, users are processed in parallel and each user's records
//!   run sequentially in one task

use crate::core::{BatchProcessor, Ledger};
use crate::io::async_reader::AsyncReader;
use crate::strategy::{PipelineConfig, ProcessingStrategy, ReplaySummary};
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Configuration for batch processing
///
/// Controls how records are batched and the number of worker threads
/// for parallel processing within each batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    /// Number of records per batch
    pub batch_size: usize,
    /// Worker threads of the replay runtime
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig, replacing zero values with the defaults
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                batch_size,
                default = default.batch_size,
                "invalid batch_size, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            warn!(
                max_concurrent_batches,
                default = default.max_concurrent_batches,
                "invalid max_concurrent_batches, using default"
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Asynchronous batch processing strategy
///
/// # Configuration
///
/// The strategy reads `PipelineConfig::batch`:
/// - `batch_size`: Number of records per batch (default: 1000)
/// - `max_concurrent_batches`: Number of worker threads (default: CPU cores)
#[derive(Debug, Clone, Default)]
pub struct AsyncProcessingStrategy {
    config: PipelineConfig,
}

impl AsyncProcessingStrategy {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Replay the journal batch by batch on a multi-threaded tokio runtime
    ///
    /// 1. Creates a tokio runtime with `max_concurrent_batches` workers
    /// 2. Reads records in batches using AsyncReader
    /// 3. Applies each batch through the BatchProcessor and waits for it
    ///    before reading the next one
    fn replay(&self, input_path: &Path) -> Result<Arc<Ledger>, String> {
        let batch = &self.config.batch;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(batch.max_concurrent_batches)
            .build()
            .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

        runtime.block_on(async {
            let ledger = Arc::new(Ledger::new(self.config.ledger.clone()));
            let processor = BatchProcessor::new(Arc::clone(&ledger));

            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| format!("Failed to open file '{}': {}", input_path.display(), e))?;

            // csv-async reads through the futures io traits
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);
            let mut summary = ReplaySummary::default();

            loop {
                let records = reader.read_batch(batch.batch_size).await;
                if records.is_empty() {
                    break;
                }

                for outcome in processor.process_batch(records).await {
                    if let Err(e) = &outcome.result {
                        warn!(
                            user = %outcome.record.user,
                            kind = %outcome.record.kind,
                            error = %e,
                            "operation rejected"
                        );
                    }
                    summary.record(&outcome.result);
                }
            }

            summary.skipped = reader.skipped();
            summary.log(&ledger);
            Ok(ledger)
        })
    }
}
