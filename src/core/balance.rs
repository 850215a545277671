//! Single-account balance state machine
//!
//! This module provides the `AccountLedger` struct, the only code path that
//! mutates an account's balances, its allocation map and its transaction log.
//!
//! The balance triple `(total, available, allocated)` moves only through the
//! four [`Operation`]s. Each operation is applied in two phases:
//! 1. compute the next state on copies, with checked arithmetic, failing on
//!    any violated precondition
//! 2. commit the new state and append the transaction (infallible)
//!
//! Nothing is written before phase 1 succeeds, so a rejected operation leaves
//! the account and its log exactly as they were.

use crate::core::history::TransactionHistory;
use crate::types::{
    ensure_positive, AccountId, AccountSnapshot, AllocationKey, Currency, HistoryFilter,
    JournalRecord, LedgerError, Transaction, TransactionKind, TransactionStatus, UserId,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A balance-affecting request against one account
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Deposit { amount: Decimal },
    Withdraw { amount: Decimal },
    Allocate { amount: Decimal, asset: AllocationKey },
    Deallocate { amount: Decimal, asset: AllocationKey },
}

impl Operation {
    pub fn amount(&self) -> Decimal {
        match self {
            Operation::Deposit { amount }
            | Operation::Withdraw { amount }
            | Operation::Allocate { amount, .. }
            | Operation::Deallocate { amount, .. } => *amount,
        }
    }

    pub fn kind(&self) -> TransactionKind {
        match self {
            Operation::Deposit { .. } => TransactionKind::Deposit,
            Operation::Withdraw { .. } => TransactionKind::Withdrawal,
            Operation::Allocate { .. } => TransactionKind::Allocation,
            Operation::Deallocate { .. } => TransactionKind::Deallocation,
        }
    }

    pub fn asset(&self) -> Option<&AllocationKey> {
        match self {
            Operation::Allocate { asset, .. } | Operation::Deallocate { asset, .. } => Some(asset),
            Operation::Deposit { .. } | Operation::Withdraw { .. } => None,
        }
    }

    /// Note recorded when the caller supplies none
    pub fn default_note(&self) -> String {
        match self {
            Operation::Deposit { .. } => "User deposit".to_string(),
            Operation::Withdraw { .. } => "User withdrawal".to_string(),
            Operation::Allocate { asset, .. } => {
                format!("Allocated for trading {}", asset.asset_type)
            }
            Operation::Deallocate { asset, .. } => {
                format!("Deallocated from trading {}", asset.asset_type)
            }
        }
    }

    fn from_parts(
        kind: TransactionKind,
        amount: Decimal,
        asset: Option<&AllocationKey>,
    ) -> Result<Self, LedgerError> {
        let require_asset = || {
            asset
                .cloned()
                .ok_or_else(|| LedgerError::invalid_asset(format!("{} without asset", kind)))
        };
        Ok(match kind {
            TransactionKind::Deposit => Operation::Deposit { amount },
            TransactionKind::Withdrawal => Operation::Withdraw { amount },
            TransactionKind::Allocation => Operation::Allocate {
                amount,
                asset: require_asset()?,
            },
            TransactionKind::Deallocation => Operation::Deallocate {
                amount,
                asset: require_asset()?,
            },
        })
    }
}

impl TryFrom<&JournalRecord> for Operation {
    type Error = LedgerError;

    fn try_from(record: &JournalRecord) -> Result<Self, Self::Error> {
        Operation::from_parts(record.kind, record.amount, record.asset.as_ref())
    }
}

impl TryFrom<&Transaction> for Operation {
    type Error = LedgerError;

    fn try_from(tx: &Transaction) -> Result<Self, Self::Error> {
        Operation::from_parts(tx.kind, tx.amount, tx.asset.as_ref())
    }
}

/// Validated next state of an account, not yet committed
#[derive(Debug)]
struct Transition {
    total: Decimal,
    available: Decimal,
    allocated: Decimal,
    /// Allocation entry to overwrite (zero removes it)
    entry: Option<(AllocationKey, Decimal)>,
}

/// Balance state and audit trail of one account
///
/// All fields are private: balances change only through [`AccountLedger::apply`]
/// and the four operation methods built on it.
#[derive(Debug, Clone)]
pub struct AccountLedger {
    id: AccountId,
    user_id: UserId,
    currency: Currency,
    total: Decimal,
    available: Decimal,
    allocated: Decimal,
    allocations: BTreeMap<AllocationKey, Decimal>,
    /// Append-only log, shared copy-on-write with outstanding history readers
    transactions: Arc<Vec<Transaction>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AccountLedger {
    /// Open an empty account with zero balances
    pub fn open(id: AccountId, user_id: UserId, currency: Currency) -> Self {
        let now = Utc::now();
        AccountLedger {
            id,
            user_id,
            currency,
            total: Decimal::ZERO,
            available: Decimal::ZERO,
            allocated: Decimal::ZERO,
            allocations: BTreeMap::new(),
            transactions: Arc::new(Vec::new()),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild an account by re-applying a transaction log from zero
    ///
    /// Every record goes through the same validation as a live operation, so a
    /// log that could not have been produced by the ledger fails to replay.
    /// Original ids, timestamps and notes are preserved.
    pub fn replay<'a>(
        id: AccountId,
        user_id: UserId,
        currency: Currency,
        transactions: impl IntoIterator<Item = &'a Transaction>,
    ) -> Result<Self, LedgerError> {
        let mut ledger = AccountLedger::open(id, user_id, currency);
        let mut first = true;

        for tx in transactions {
            if first {
                ledger.created_at = tx.timestamp;
                first = false;
            }
            let op = Operation::try_from(tx)?;
            ledger.apply_at(op, tx.note.clone(), tx.timestamp)?;
        }

        Ok(ledger)
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Credit `amount` to total and available
    pub fn deposit(
        &mut self,
        amount: Decimal,
        note: Option<String>,
    ) -> Result<AccountSnapshot, LedgerError> {
        self.apply(Operation::Deposit { amount }, note)?;
        Ok(self.snapshot())
    }

    /// Debit `amount` from total and available
    pub fn withdraw(
        &mut self,
        amount: Decimal,
        note: Option<String>,
    ) -> Result<AccountSnapshot, LedgerError> {
        self.apply(Operation::Withdraw { amount }, note)?;
        Ok(self.snapshot())
    }

    /// Commit `amount` of the available balance to `asset`
    pub fn allocate(
        &mut self,
        amount: Decimal,
        asset: AllocationKey,
        note: Option<String>,
    ) -> Result<AccountSnapshot, LedgerError> {
        self.apply(Operation::Allocate { amount, asset }, note)?;
        Ok(self.snapshot())
    }

    /// Release `amount` committed to `asset` back to the available balance
    pub fn deallocate(
        &mut self,
        amount: Decimal,
        asset: AllocationKey,
        note: Option<String>,
    ) -> Result<AccountSnapshot, LedgerError> {
        self.apply(Operation::Deallocate { amount, asset }, note)?;
        Ok(self.snapshot())
    }

    /// Validate and apply one operation, returning the appended transaction
    pub fn apply(
        &mut self,
        op: Operation,
        note: Option<String>,
    ) -> Result<Transaction, LedgerError> {
        // Timestamps never go backwards within one log
        let now = Utc::now().max(self.last_timestamp().unwrap_or(self.created_at));
        self.apply_at(op, note, now)
    }

    fn apply_at(
        &mut self,
        op: Operation,
        note: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Result<Transaction, LedgerError> {
        ensure_positive(op.amount())?;
        let transition = self.transition(&op)?;

        let transaction = Transaction {
            id: self.transactions.len() as u64 + 1,
            account_id: self.id,
            kind: op.kind(),
            amount: op.amount(),
            asset: op.asset().cloned(),
            timestamp,
            status: TransactionStatus::Completed,
            note: Some(note.unwrap_or_else(|| op.default_note())),
        };

        self.commit(transition, transaction.clone());
        Ok(transaction)
    }

    /// Compute the post-operation state without touching `self`
    fn transition(&self, op: &Operation) -> Result<Transition, LedgerError> {
        let account = self.id;
        let transition = match op {
            Operation::Deposit { amount } => {
                let overflow = || LedgerError::arithmetic_overflow("deposit", account);
                Transition {
                    total: exact_add(self.total, *amount).ok_or_else(overflow)?,
                    available: exact_add(self.available, *amount).ok_or_else(overflow)?,
                    allocated: self.allocated,
                    entry: None,
                }
            }
            Operation::Withdraw { amount } => {
                self.check_available("withdrawal", *amount)?;
                let overflow = || LedgerError::arithmetic_overflow("withdrawal", account);
                Transition {
                    total: exact_add(self.total, -*amount).ok_or_else(overflow)?,
                    available: exact_add(self.available, -*amount).ok_or_else(overflow)?,
                    allocated: self.allocated,
                    entry: None,
                }
            }
            Operation::Allocate { amount, asset } => {
                self.check_available("allocation", *amount)?;
                let overflow = || LedgerError::arithmetic_overflow("allocation", account);
                let current = self.allocations.get(asset).copied().unwrap_or(Decimal::ZERO);
                Transition {
                    total: self.total,
                    available: exact_add(self.available, -*amount).ok_or_else(overflow)?,
                    allocated: exact_add(self.allocated, *amount).ok_or_else(overflow)?,
                    entry: Some((
                        asset.clone(),
                        exact_add(current, *amount).ok_or_else(overflow)?,
                    )),
                }
            }
            Operation::Deallocate { amount, asset } => {
                let current = self
                    .allocations
                    .get(asset)
                    .copied()
                    .ok_or_else(|| LedgerError::no_such_allocation(account, asset))?;
                if current < *amount {
                    return Err(LedgerError::insufficient_allocation(
                        account, asset, current, *amount,
                    ));
                }
                let overflow = || LedgerError::arithmetic_overflow("deallocation", account);
                Transition {
                    total: self.total,
                    available: exact_add(self.available, *amount).ok_or_else(overflow)?,
                    allocated: exact_add(self.allocated, -*amount).ok_or_else(overflow)?,
                    entry: Some((
                        asset.clone(),
                        exact_add(current, -*amount).ok_or_else(overflow)?,
                    )),
                }
            }
        };

        // total = available + allocated must hold exactly on the candidate state
        if transition.total.checked_sub(transition.available) != Some(transition.allocated) {
            return Err(LedgerError::arithmetic_overflow(op.kind().as_str(), account));
        }
        Ok(transition)
    }

    fn check_available(&self, operation: &str, amount: Decimal) -> Result<(), LedgerError> {
        if self.available < amount {
            return Err(LedgerError::insufficient_funds(
                self.id,
                operation,
                self.available,
                amount,
            ));
        }
        Ok(())
    }

    fn commit(&mut self, transition: Transition, transaction: Transaction) {
        self.total = transition.total;
        self.available = transition.available;
        self.allocated = transition.allocated;

        if let Some((asset, value)) = transition.entry {
            if value.is_zero() {
                self.allocations.remove(&asset);
            } else {
                self.allocations.insert(asset, value);
            }
        }

        self.updated_at = transaction.timestamp;
        Arc::make_mut(&mut self.transactions).push(transaction);
    }

    fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.transactions.last().map(|tx| tx.timestamp)
    }

    /// Current state as a detached value
    pub fn snapshot(&self) -> AccountSnapshot {
        AccountSnapshot {
            id: self.id,
            user_id: self.user_id.clone(),
            currency: self.currency,
            total_balance: self.total,
            available_balance: self.available,
            allocated_balance: self.allocated,
            allocations: self.allocations.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Filtered view of the log as it stands now
    ///
    /// The returned history shares the current log prefix and keeps seeing it
    /// unchanged while the account moves on.
    pub fn history(&self, filter: HistoryFilter) -> Result<TransactionHistory, LedgerError> {
        filter.validate()?;
        Ok(TransactionHistory::new(Arc::clone(&self.transactions), filter))
    }

    /// Number of transactions recorded so far
    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }
}

/// `a + b`, or `None` when the sum overflows or had to be rounded
///
/// `Decimal` rounds a sum that needs more than 96 bits of mantissa instead of
/// failing, so the result is checked by subtracting the larger operand back.
fn exact_add(a: Decimal, b: Decimal) -> Option<Decimal> {
    let sum = a.checked_add(b)?;
    let (large, small) = if a.abs() >= b.abs() { (a, b) } else { (b, a) };
    (sum.checked_sub(large)? == small).then_some(sum)
}
