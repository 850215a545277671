//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Account identifiers, currency, asset keys and snapshots
//! - `amount`: Amount parsing and validation
//! - `transaction`: Transaction records and journal input
//! - `filter`: Transaction history filters
//! - `error`: Error types for the fund ledger

pub mod account;
pub mod amount;
pub mod error;
pub mod filter;
pub mod transaction;

pub use account::{AccountId, AccountSnapshot, AllocationKey, AssetType, Currency, UserId};
pub use amount::{ensure_positive, parse_amount, MAX_SCALE};
pub use error::{ErrorKind, LedgerError};
pub use filter::HistoryFilter;
pub use transaction::{
    JournalRecord, Transaction, TransactionId, TransactionKind, TransactionStatus,
};
