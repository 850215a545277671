//! Transaction-related types for the fund ledger
//!
//! This module defines the immutable transaction records that make up an
//! account's audit trail, and the journal records fed to the replay pipeline.

use super::account::{AccountId, AllocationKey, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Transaction identifier
///
/// Sequential per account, starting at 1.
pub type TransactionId = u64;

/// Balance-affecting operations recorded in the log
///
/// Deposits and withdrawals change the total balance; allocations and
/// deallocations only move funds between available and allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Credit funds to total and available
    Deposit,

    /// Debit funds from total and available
    ///
    /// Only uncommitted funds may leave the account.
    Withdrawal,

    /// Commit available funds to an asset
    Allocation,

    /// Release committed funds back to available
    Deallocation,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdrawal => "withdrawal",
            TransactionKind::Allocation => "allocation",
            TransactionKind::Deallocation => "deallocation",
        }
    }

    /// Whether records of this kind carry an asset key
    pub fn targets_asset(&self) -> bool {
        matches!(
            self,
            TransactionKind::Allocation | TransactionKind::Deallocation
        )
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "deposit" => Ok(TransactionKind::Deposit),
            "withdrawal" | "withdraw" => Ok(TransactionKind::Withdrawal),
            "allocation" | "allocate" => Ok(TransactionKind::Allocation),
            "deallocation" | "deallocate" => Ok(TransactionKind::Deallocation),
            _ => Err(format!("Unknown transaction kind '{}'", s)),
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settlement status of a recorded transaction
///
/// Rejected operations are never recorded, so every entry in a log is
/// completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[default]
    Completed,
}

/// One immutable entry of an account's audit trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,

    /// Owning account (back-reference only)
    pub account_id: AccountId,

    pub kind: TransactionKind,

    /// Always positive; direction is implied by `kind`
    pub amount: Decimal,

    /// Present exactly when `kind.targets_asset()`
    pub asset: Option<AllocationKey>,

    pub timestamp: DateTime<Utc>,

    pub status: TransactionStatus,

    pub note: Option<String>,
}

/// One row of an operation journal
///
/// Journals are the replay input: each record names the user it applies to
/// and the operation to run against that user's account.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalRecord {
    pub kind: TransactionKind,
    pub user: UserId,
    pub amount: Decimal,

    /// Required for allocation and deallocation
    pub asset: Option<AllocationKey>,

    pub note: Option<String>,
}
