//! I/O module
//!
//! Handles journal parsing and report output.
//!
//! # Components
//!
//! - `csv_format` - CSV format handling (record conversion, report serialization)
//! - `sync_reader` - Synchronous journal reader with iterator interface
//! - `async_reader` - Asynchronous journal reader with batch reading interface

pub mod async_reader;
pub mod csv_format;
pub mod sync_reader;

pub use async_reader::AsyncReader;
pub use csv_format::{
    convert_csv_record, write_accounts_csv, write_allocations_csv, write_transactions_csv,
    CsvRecord,
};
pub use sync_reader::SyncReader;
