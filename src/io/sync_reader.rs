//! Synchronous CSV journal reader with iterator interface
//!
//! Provides a streaming iterator over journal records from a CSV file.
//! Delegates CSV format concerns to the csv_format module.
//!
//! # Design
//!
//! The SyncReader uses csv::Reader to read and deserialize CSV records sequentially,
//! delegating parsing and conversion to the csv_format module. Records are
//! processed one at a time, so the whole journal is never held in memory.
//!
//! ```no_run
//! use fund_ledger::io::sync_reader::SyncReader;
//! use std::path::Path;
//!
//! let reader = SyncReader::new(Path::new("journal.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(record) => println!("Replaying: {:?}", record),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, I/O errors) are returned from `new()`
//! - Individual record parsing errors are yielded as Err variants in the iterator
//! - Line numbers are included in error messages for debugging

use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::types::JournalRecord;
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

/// Synchronous CSV journal reader
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    line_num: usize,
}

impl SyncReader {
    /// Create a new SyncReader from a file path
    ///
    /// The CSV reader is configured to:
    /// - Trim whitespace from all fields
    /// - Allow flexible field counts (trailing asset and note columns may be omitted)
    /// - Use an 8KB buffer for efficient I/O
    ///
    /// # Returns
    ///
    /// * `Ok(SyncReader)` if file opened successfully
    /// * `Err(String)` if file could not be opened
    pub fn new(path: &Path) -> Result<Self, String> {
        let file = File::open(path)
            .map_err(|e| format!("Failed to open file '{}': {}", path.display(), e))?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            line_num: 0,
        })
    }
}

impl Iterator for SyncReader {
    type Item = Result<JournalRecord, String>;

    /// Get the next journal record from the CSV file
    ///
    /// # Returns
    ///
    /// * `Some(Ok(JournalRecord))` - Successfully parsed record
    /// * `Some(Err(String))` - Parse or conversion error with line number
    /// * `None` - End of file reached
    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<CsvRecord>();
        let next = deserializer.next()?;

        self.line_num += 1;
        // +1 for the header row
        let line = self.line_num + 1;

        Some(match next {
            Ok(csv_record) => {
                convert_csv_record(csv_record).map_err(|e| format!("Line {}: {}", line, e))
            }
            Err(e) => Err(format!("Line {}: CSV parse error: {}", line, e)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AllocationKey, AssetType, TransactionKind, UserId};
    use rust_decimal::Decimal;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "type,user,amount,asset_type,asset_id,note\n";

    /// Helper function to create a temporary CSV file for testing
    fn create_temp_csv(rows: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(HEADER.as_bytes())
            .and_then(|_| file.write_all(rows.as_bytes()))
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn read_all(rows: &str) -> Vec<Result<JournalRecord, String>> {
        let file = create_temp_csv(rows);
        SyncReader::new(file.path()).unwrap().collect()
    }

    #[test]
    fn test_sync_reader_new_fails_on_missing_file() {
        let result = SyncReader::new(Path::new("nonexistent.csv"));
        assert!(result.unwrap_err().contains("Failed to open file"));
    }

    #[test]
    fn test_sync_reader_iterates_valid_deposit() {
        let records = read_all("deposit,alice,100.0,,,\n");

        assert_eq!(records.len(), 1);
        let record = records[0].as_ref().unwrap();
        assert_eq!(record.kind, TransactionKind::Deposit);
        assert_eq!(record.user, UserId::new("alice"));
        assert_eq!(record.amount, Decimal::new(1000, 1));
        assert_eq!(record.asset, None);
    }

    #[test]
    fn test_sync_reader_accepts_short_rows() {
        let records = read_all("deposit,alice,100\nwithdrawal,alice,5\n");

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(Result::is_ok));
    }

    #[test]
    fn test_sync_reader_reads_allocation_with_note() {
        let records = read_all("allocation,alice,25,crypto,BTC,weekly rebalance\n");

        let record = records[0].as_ref().unwrap();
        assert_eq!(record.kind, TransactionKind::Allocation);
        assert_eq!(
            record.asset,
            Some(AllocationKey::new(AssetType::Crypto, "BTC").unwrap())
        );
        assert_eq!(record.note.as_deref(), Some("weekly rebalance"));
    }

    #[test]
    fn test_sync_reader_includes_line_numbers_in_errors() {
        let records = read_all(
            "deposit,alice,100.0\n\
             deposit,bob,invalid\n\
             deposit,carol,50.0\n",
        );

        assert_eq!(records.len(), 3);
        assert!(records[0].is_ok());
        assert!(records[2].is_ok());

        let error = records[1].as_ref().unwrap_err();
        assert!(error.contains("Line 3")); // Line 3 because of header
        assert!(error.contains("Invalid amount"));
    }

    #[test]
    fn test_sync_reader_handles_whitespace() {
        let records = read_all("  deposit  ,  alice  ,  100.0  , , ,\n");

        let record = records[0].as_ref().unwrap();
        assert_eq!(record.user, UserId::new("alice"));
        assert_eq!(record.amount, Decimal::new(1000, 1));
        assert_eq!(record.note, None);
    }

    #[test]
    fn test_sync_reader_handles_empty_file_after_header() {
        assert!(read_all("").is_empty());
    }

    #[test]
    fn test_sync_reader_continues_after_error() {
        let records = read_all(
            "deposit,alice,100.0\n\
             transfer,bob,50.0\n\
             deallocation,alice,5\n\
             deposit,carol,75.0\n",
        );

        assert_eq!(records.len(), 4);
        assert!(records[0].is_ok());
        assert!(records[1].is_err());
        assert!(records[2].is_err());
        assert!(records[3].is_ok());
    }

    #[test]
    fn test_sync_reader_case_insensitive_types() {
        let records: Vec<JournalRecord> = read_all(
            "DEPOSIT,alice,100.0\n\
             Withdrawal,alice,50.0\n\
             AlLoCaTiOn,alice,10,STOCK,AAPL\n",
        )
        .into_iter()
        .filter_map(Result::ok)
        .collect();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].kind, TransactionKind::Deposit);
        assert_eq!(records[1].kind, TransactionKind::Withdrawal);
        assert_eq!(records[2].kind, TransactionKind::Allocation);
    }
}
