//! Fund Ledger Library
//! # Overview
//!
//! This library tracks a trading user's cash account: deposits, withdrawals,
//! and allocations of funds to tradable assets, with an audit trail of every
//! successful operation.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (AccountSnapshot, Transaction, LedgerError, etc.)
//! - [`core`] - Business logic components:
//!   - [`core::balance`] - Single-account state machine
//!   - [`core::ledger`] - Thread-safe multi-account registry
//!   - [`core::history`] - Filtered transaction history views
//!   - [`core::events`] - Change notifications
//!   - [`core::batch_processor`] - Concurrent journal replay
//! - [`api`] - Request/response contract for a service layer
//! - [`io`] - CSV journal reading and report writing
//! - [`strategy`] - Sync and async replay pipelines
//! - [`cli`] - CLI arguments parsing
//!
//! # Operations
//!
//! - **Deposit**: Credit funds to total and available
//! - **Withdraw**: Debit available funds (allocated funds cannot leave the account)
//! - **Allocate**: Move available funds to an asset
//! - **Deallocate**: Release funds from an asset back to available
//!
//! # Account State
//!
//! Each account maintains:
//! - `available_balance`: Funds free for withdrawal or allocation
//! - `allocated_balance`: Funds committed to assets, broken down per asset
//! - `total_balance`: Sum of available and allocated funds

pub mod api;
pub mod cli;
pub mod core;
pub mod io;
pub mod strategy;
pub mod types;

pub use core::{AccountLedger, Ledger, LedgerConfig, LedgerEvent, TransactionHistory};
pub use io::write_accounts_csv;
pub use types::{
    AccountId, AccountSnapshot, AllocationKey, AssetType, Currency, HistoryFilter, LedgerError,
    Transaction, TransactionKind, UserId,
};
