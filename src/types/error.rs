//! Error types for the fund ledger
//!
//! Every failure the ledger can report is a variant of [`LedgerError`]. Each
//! carries enough context to render a user-facing message, and
//! [`LedgerError::kind`] gives the coarse category an API layer maps onto its
//! own status codes.
//!
//! # Error Categories
//!
//! - **Input Errors**: malformed amounts, currencies, assets or history filters
//! - **Balance Errors**: insufficient funds or allocation for the request
//! - **Lookup Errors**: unknown account, duplicate account for a user
//! - **Arithmetic Errors**: a result that would overflow the decimal range
//!
//! No error is ever produced after state has been touched: a failed
//! operation leaves the account exactly as it was.

use super::account::{AccountId, AllocationKey, UserId};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

/// Main error type for the fund ledger
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// Amount is non-positive, non-finite or could not be parsed
    #[error("Invalid amount '{amount}': {reason}")]
    InvalidAmount {
        /// The rejected amount as supplied
        amount: String,
        /// Why it was rejected
        reason: String,
    },

    /// Withdrawal or allocation exceeds the available balance
    #[error("Insufficient funds for {operation} on account {account}: available {available}, requested {requested}")]
    InsufficientFunds {
        account: AccountId,
        operation: String,
        available: Decimal,
        requested: Decimal,
    },

    /// Deallocation names an asset with no active allocation
    #[error("No allocation for {asset} on account {account}")]
    NoSuchAllocation {
        account: AccountId,
        asset: AllocationKey,
    },

    /// Deallocation exceeds the amount allocated to the asset
    #[error("Insufficient allocation for {asset} on account {account}: allocated {allocated}, requested {requested}")]
    InsufficientAllocation {
        account: AccountId,
        asset: AllocationKey,
        allocated: Decimal,
        requested: Decimal,
    },

    /// History query parameters are malformed or contradictory
    #[error("Invalid history filter: {message}")]
    InvalidFilter { message: String },

    #[error("Account {account} not found")]
    AccountNotFound { account: AccountId },

    /// A user may own a single account
    #[error("User {user} already has account {account}")]
    AccountAlreadyExists { user: UserId, account: AccountId },

    #[error("Invalid currency code '{code}'")]
    InvalidCurrency { code: String },

    #[error("Invalid asset '{asset}'")]
    InvalidAsset { asset: String },

    /// The result would not fit in the decimal range
    #[error("Arithmetic overflow in {operation} for account {account}")]
    ArithmeticOverflow {
        operation: String,
        account: AccountId,
    },
}

/// Coarse error category, stable across message wording changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidAmount,
    InsufficientFunds,
    NoSuchAllocation,
    InsufficientAllocation,
    InvalidFilter,
    AccountNotFound,
    AccountAlreadyExists,
    InvalidCurrency,
    InvalidAsset,
    ArithmeticOverflow,
}

impl ErrorKind {
    /// HTTP status an API layer would typically answer with
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::InvalidAmount
            | ErrorKind::InvalidFilter
            | ErrorKind::InvalidCurrency
            | ErrorKind::InvalidAsset => 400,
            ErrorKind::AccountNotFound => 404,
            ErrorKind::AccountAlreadyExists => 409,
            ErrorKind::InsufficientFunds
            | ErrorKind::NoSuchAllocation
            | ErrorKind::InsufficientAllocation
            | ErrorKind::ArithmeticOverflow => 422,
        }
    }
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidAmount { .. } => ErrorKind::InvalidAmount,
            LedgerError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            LedgerError::NoSuchAllocation { .. } => ErrorKind::NoSuchAllocation,
            LedgerError::InsufficientAllocation { .. } => ErrorKind::InsufficientAllocation,
            LedgerError::InvalidFilter { .. } => ErrorKind::InvalidFilter,
            LedgerError::AccountNotFound { .. } => ErrorKind::AccountNotFound,
            LedgerError::AccountAlreadyExists { .. } => ErrorKind::AccountAlreadyExists,
            LedgerError::InvalidCurrency { .. } => ErrorKind::InvalidCurrency,
            LedgerError::InvalidAsset { .. } => ErrorKind::InvalidAsset,
            LedgerError::ArithmeticOverflow { .. } => ErrorKind::ArithmeticOverflow,
        }
    }
}

// Helper functions for creating common errors

impl LedgerError {
    /// Create an InvalidAmount error
    pub fn invalid_amount(amount: impl ToString, reason: &str) -> Self {
        LedgerError::InvalidAmount {
            amount: amount.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(
        account: AccountId,
        operation: &str,
        available: Decimal,
        requested: Decimal,
    ) -> Self {
        LedgerError::InsufficientFunds {
            account,
            operation: operation.to_string(),
            available,
            requested,
        }
    }

    /// Create a NoSuchAllocation error
    pub fn no_such_allocation(account: AccountId, asset: &AllocationKey) -> Self {
        LedgerError::NoSuchAllocation {
            account,
            asset: asset.clone(),
        }
    }

    /// Create an InsufficientAllocation error
    pub fn insufficient_allocation(
        account: AccountId,
        asset: &AllocationKey,
        allocated: Decimal,
        requested: Decimal,
    ) -> Self {
        LedgerError::InsufficientAllocation {
            account,
            asset: asset.clone(),
            allocated,
            requested,
        }
    }

    /// Create an InvalidFilter error
    pub fn invalid_filter(message: impl Into<String>) -> Self {
        LedgerError::InvalidFilter {
            message: message.into(),
        }
    }

    /// Create an AccountNotFound error
    pub fn account_not_found(account: AccountId) -> Self {
        LedgerError::AccountNotFound { account }
    }

    /// Create an AccountAlreadyExists error
    pub fn account_already_exists(user: &UserId, account: AccountId) -> Self {
        LedgerError::AccountAlreadyExists {
            user: user.clone(),
            account,
        }
    }

    /// Create an InvalidCurrency error
    pub fn invalid_currency(code: impl Into<String>) -> Self {
        LedgerError::InvalidCurrency { code: code.into() }
    }

    /// Create an InvalidAsset error
    pub fn invalid_asset(asset: impl Into<String>) -> Self {
        LedgerError::InvalidAsset {
            asset: asset.into(),
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, account: AccountId) -> Self {
        LedgerError::ArithmeticOverflow {
            operation: operation.to_string(),
            account,
        }
    }
}
