//! Asynchronous CSV journal reader with batch interface
//!
//! # Design
//!
//! The AsyncReader uses:
//! - csv-async for streaming CSV parsing
//! - futures' `AsyncRead`, so any tokio source works through `tokio_util::compat`
//! - Batch reading so the replay pipeline can fan each batch out per user
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of JournalRecords
//!                  ↓
//!           csv_format module
//!           (CsvRecord, convert_csv_record)
//! ```

use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::types::JournalRecord;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

/// Asynchronous CSV journal reader
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    skipped: usize,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            skipped: 0,
        }
    }

    /// Read a batch of journal records
    ///
    /// Reads up to `batch_size` valid records. Malformed rows are logged,
    /// counted in [`AsyncReader::skipped`] and do not count towards the batch.
    ///
    /// # Returns
    ///
    /// A vector of successfully converted records; empty once the input is
    /// exhausted.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<JournalRecord> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<CsvRecord>();

        while batch.len() < batch_size {
            match records.next().await {
                Some(Ok(csv_record)) => match convert_csv_record(csv_record) {
                    Ok(record) => batch.push(record),
                    Err(e) => {
                        self.skipped += 1;
                        warn!(error = %e, "skipping journal record");
                    }
                },
                Some(Err(e)) => {
                    self.skipped += 1;
                    warn!(error = %e, "CSV parse error");
                }
                None => break,
            }
        }

        batch
    }

    /// Number of malformed rows skipped so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}
