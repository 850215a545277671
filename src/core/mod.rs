//! Core ledger components
//!
//! - [`balance`] - Single-account state machine (validation, application, log append)
//! - [`history`] - Lazy, filtered views over an account's transaction log
//! - [`events`] - Change notifications published after each mutation
//! - [`ledger`] - Thread-safe multi-account registry with per-account locking
//! - [`batch_processor`] - Concurrent journal replay partitioned by user

pub mod balance;
pub mod batch_processor;
pub mod events;
pub mod history;
pub mod ledger;

pub use balance::{AccountLedger, Operation};
pub use batch_processor::{BatchProcessor, ProcessingResult};
pub use events::{EventBus, LedgerEvent};
pub use history::TransactionHistory;
pub use ledger::{Ledger, LedgerConfig, INITIAL_DEPOSIT_NOTE};
