//! Thread-safe multi-account ledger
//!
//! This module provides the `Ledger` struct, the registry through which every
//! caller reaches an account. It owns one [`AccountLedger`] per account and
//! serializes mutations per account while leaving unrelated accounts fully
//! independent.
//!
//! # Design
//!
//! ```text
//! Ledger
//!     ├── DashMap<AccountId, Arc<RwLock<AccountLedger>>>  (per-account state)
//!     ├── DashMap<UserId, AccountId>                      (one account per user)
//!     └── EventBus                                        (change notifications)
//! ```
//!
//! # Thread Safety
//!
//! The `DashMap` shard lock is held only long enough to clone an account's
//! `Arc` out of the map. The account's own `RwLock` then guards the
//! validate-mutate-append critical section:
//! - at most one mutation is in flight per account
//! - snapshot and history reads run concurrently and never observe a torn state
//! - operations on different accounts never wait on each other
//!
//! Events are published while the write lock is still held, so subscribers
//! see each account's events in log order.

use crate::core::balance::{AccountLedger, Operation};
use crate::core::events::{EventBus, LedgerEvent};
use crate::core::history::TransactionHistory;
use crate::types::{
    AccountId, AccountSnapshot, AllocationKey, Currency, HistoryFilter, JournalRecord,
    LedgerError, UserId,
};
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;
use tracing::debug;

/// Note attached to the deposit recorded when an account opens with funds
pub const INITIAL_DEPOSIT_NOTE: &str = "Initial deposit";

/// Ledger-wide settings
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Currency of accounts opened implicitly (journal replay)
    pub default_currency: Currency,

    /// Undelivered events retained per subscriber
    pub event_capacity: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            default_currency: Currency::USD,
            event_capacity: 1024,
        }
    }
}

type AccountHandle = Arc<RwLock<AccountLedger>>;

/// Registry of accounts with per-account mutual exclusion
#[derive(Debug)]
pub struct Ledger {
    accounts: DashMap<AccountId, AccountHandle>,
    users: DashMap<UserId, AccountId>,
    events: EventBus,
    config: LedgerConfig,
}

impl Ledger {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            accounts: DashMap::new(),
            users: DashMap::new(),
            events: EventBus::new(config.event_capacity),
            config,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Receive a [`LedgerEvent`] for every successful mutation from now on
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    /// Open the account of `user_id`
    ///
    /// A positive `initial_deposit` is recorded as the account's first
    /// transaction. Each user owns at most one account.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if `initial_deposit` is negative
    /// - `AccountAlreadyExists` if the user already owns an account
    pub fn open_account(
        &self,
        user_id: UserId,
        currency: Currency,
        initial_deposit: Decimal,
    ) -> Result<AccountSnapshot, LedgerError> {
        if initial_deposit < Decimal::ZERO {
            return Err(LedgerError::invalid_amount(
                initial_deposit,
                "initial deposit cannot be negative",
            ));
        }

        let id = AccountId::new();
        let mut account = AccountLedger::open(id, user_id.clone(), currency);
        let opening = if initial_deposit.is_zero() {
            None
        } else {
            Some(account.apply(
                Operation::Deposit {
                    amount: initial_deposit,
                },
                Some(INITIAL_DEPOSIT_NOTE.to_string()),
            )?)
        };

        // Claim the user slot; the account becomes visible before the claim is released
        let owner = self.users.entry(user_id.clone()).or_insert(id);
        if *owner != id {
            return Err(LedgerError::account_already_exists(&user_id, *owner));
        }
        let snapshot = account.snapshot();
        let handle = Arc::new(RwLock::new(account));
        // Hold the new account's write lock until its opening deposit is published
        let guard = write(&handle);
        self.accounts.insert(id, Arc::clone(&handle));
        drop(owner);

        if let Some(transaction) = opening {
            self.events.publish(LedgerEvent {
                snapshot: snapshot.clone(),
                transaction,
            });
        }
        drop(guard);

        debug!(account = %id, user = %user_id, currency = %currency, "account opened");
        Ok(snapshot)
    }

    /// Account owned by `user_id`, if any
    pub fn account_for_user(&self, user_id: &UserId) -> Option<AccountId> {
        self.users.get(user_id).map(|entry| *entry.value())
    }

    /// Account owned by `user_id`, opened empty in the default currency if needed
    pub fn ensure_account(&self, user_id: &UserId) -> Result<AccountId, LedgerError> {
        if let Some(id) = self.account_for_user(user_id) {
            return Ok(id);
        }
        match self.open_account(
            user_id.clone(),
            self.config.default_currency,
            Decimal::ZERO,
        ) {
            Ok(snapshot) => Ok(snapshot.id),
            // Another caller opened it first
            Err(LedgerError::AccountAlreadyExists { account, .. }) => Ok(account),
            Err(e) => Err(e),
        }
    }

    pub fn deposit(
        &self,
        account: AccountId,
        amount: Decimal,
    ) -> Result<AccountSnapshot, LedgerError> {
        self.execute(account, Operation::Deposit { amount }, None)
    }

    pub fn withdraw(
        &self,
        account: AccountId,
        amount: Decimal,
    ) -> Result<AccountSnapshot, LedgerError> {
        self.execute(account, Operation::Withdraw { amount }, None)
    }

    pub fn allocate(
        &self,
        account: AccountId,
        amount: Decimal,
        asset: AllocationKey,
    ) -> Result<AccountSnapshot, LedgerError> {
        self.execute(account, Operation::Allocate { amount, asset }, None)
    }

    pub fn deallocate(
        &self,
        account: AccountId,
        amount: Decimal,
        asset: AllocationKey,
    ) -> Result<AccountSnapshot, LedgerError> {
        self.execute(account, Operation::Deallocate { amount, asset }, None)
    }

    /// Apply one operation to one account under that account's write lock
    pub fn execute(
        &self,
        account: AccountId,
        op: Operation,
        note: Option<String>,
    ) -> Result<AccountSnapshot, LedgerError> {
        let handle = self.handle(account)?;
        let mut guard = write(&handle);

        let kind = op.kind();
        let transaction = guard.apply(op, note).inspect_err(|e| {
            debug!(account = %account, kind = %kind, error = %e, "operation rejected");
        })?;
        let snapshot = guard.snapshot();

        debug!(
            account = %account,
            tx = transaction.id,
            kind = %kind,
            amount = %transaction.amount,
            "operation applied"
        );

        self.events.publish(LedgerEvent {
            snapshot: snapshot.clone(),
            transaction,
        });

        Ok(snapshot)
    }

    /// Apply a journal record to its user's account, opening the account if needed
    pub fn apply_record(&self, record: &JournalRecord) -> Result<AccountSnapshot, LedgerError> {
        let op = Operation::try_from(record)?;
        let account = self.ensure_account(&record.user)?;
        self.execute(account, op, record.note.clone())
    }

    pub fn snapshot(&self, account: AccountId) -> Result<AccountSnapshot, LedgerError> {
        let handle = self.handle(account)?;
        let snapshot = read(&handle).snapshot();
        Ok(snapshot)
    }

    /// Filtered history of an account
    ///
    /// The read lock is released before returning; the history keeps iterating
    /// the log prefix that existed at call time.
    pub fn history(
        &self,
        account: AccountId,
        filter: HistoryFilter,
    ) -> Result<TransactionHistory, LedgerError> {
        let handle = self.handle(account)?;
        let history = read(&handle).history(filter);
        history
    }

    /// Snapshots of every account, sorted by user
    pub fn accounts(&self) -> Vec<AccountSnapshot> {
        let handles: Vec<AccountHandle> = self
            .accounts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut snapshots: Vec<AccountSnapshot> =
            handles.iter().map(|handle| read(handle).snapshot()).collect();
        snapshots.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        snapshots
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    fn handle(&self, account: AccountId) -> Result<AccountHandle, LedgerError> {
        self.accounts
            .get(&account)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| LedgerError::account_not_found(account))
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

// State is committed only after validation, so a poisoned lock still guards a
// consistent account.
fn read(handle: &AccountHandle) -> RwLockReadGuard<'_, AccountLedger> {
    handle.read().unwrap_or_else(PoisonError::into_inner)
}

fn write(handle: &AccountHandle) -> RwLockWriteGuard<'_, AccountLedger> {
    handle.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AssetType, TransactionKind};
    use std::thread;
    use tokio::sync::broadcast::error::TryRecvError;

    fn dec(value: i64) -> Decimal {
        Decimal::new(value, 0)
    }

    fn btc() -> AllocationKey {
        AllocationKey::new(AssetType::Crypto, "BTC").unwrap()
    }

    fn eth() -> AllocationKey {
        AllocationKey::new(AssetType::Crypto, "ETH").unwrap()
    }

    fn open(ledger: &Ledger, user: &str) -> AccountId {
        ledger
            .open_account(UserId::new(user), Currency::USD, Decimal::ZERO)
            .unwrap()
            .id
    }

    fn balances(snapshot: &AccountSnapshot) -> (Decimal, Decimal, Decimal) {
        (
            snapshot.total_balance,
            snapshot.available_balance,
            snapshot.allocated_balance,
        )
    }

    #[test]
    fn test_walkthrough_scenarios() {
        let ledger = Ledger::default();
        let account = open(&ledger, "alice");

        // 1. deposit
        let snapshot = ledger.deposit(account, dec(1000)).unwrap();
        assert_eq!(balances(&snapshot), (dec(1000), dec(1000), dec(0)));
        let history = ledger.history(account, HistoryFilter::new()).unwrap().to_vec();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].kind, TransactionKind::Deposit);
        assert_eq!(history[0].amount, dec(1000));

        // 2. allocate
        let snapshot = ledger.allocate(account, dec(250), btc()).unwrap();
        assert_eq!(balances(&snapshot), (dec(1000), dec(750), dec(250)));
        assert_eq!(snapshot.allocations.len(), 1);
        assert_eq!(snapshot.allocation(&btc()), dec(250));

        // 3. withdraw more than available
        let before = ledger.snapshot(account).unwrap();
        let err = ledger.withdraw(account, dec(800)).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        assert_eq!(ledger.snapshot(account).unwrap(), before);

        // 5. deallocate an asset never allocated
        let err = ledger.deallocate(account, dec(100), eth()).unwrap_err();
        assert!(matches!(err, LedgerError::NoSuchAllocation { .. }));
        assert_eq!(ledger.snapshot(account).unwrap(), before);

        // 6. negative deposit
        let err = ledger.deposit(account, dec(-5)).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount { .. }));
        assert_eq!(ledger.snapshot(account).unwrap(), before);

        // 4. deallocate everything
        let snapshot = ledger.deallocate(account, dec(250), btc()).unwrap();
        assert_eq!(balances(&snapshot), (dec(1000), dec(1000), dec(0)));
        assert!(snapshot.allocations.is_empty());

        let history = ledger.history(account, HistoryFilter::new()).unwrap();
        assert_eq!(history.iter().count(), 3);
    }

    #[test]
    fn test_open_account_with_initial_deposit() {
        let ledger = Ledger::default();

        let snapshot = ledger
            .open_account(UserId::new("bob"), "eur".parse().unwrap(), dec(500))
            .unwrap();

        assert_eq!(snapshot.currency.as_str(), "EUR");
        assert_eq!(balances(&snapshot), (dec(500), dec(500), dec(0)));
        let history = ledger.history(snapshot.id, HistoryFilter::new()).unwrap().to_vec();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].note.as_deref(), Some(INITIAL_DEPOSIT_NOTE));
    }

    #[test]
    fn test_open_account_rejects_second_account_for_user() {
        let ledger = Ledger::default();
        let first = open(&ledger, "carol");

        let err = ledger
            .open_account(UserId::new("carol"), Currency::USD, dec(10))
            .unwrap_err();

        assert_eq!(
            err,
            LedgerError::account_already_exists(&UserId::new("carol"), first)
        );
        assert_eq!(ledger.account_count(), 1);
        assert_eq!(ledger.snapshot(first).unwrap().total_balance, Decimal::ZERO);
    }

    #[test]
    fn test_open_account_rejects_negative_initial_deposit() {
        let ledger = Ledger::default();
        let err = ledger
            .open_account(UserId::new("dave"), Currency::USD, dec(-1))
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount { .. }));
        assert!(ledger.account_for_user(&UserId::new("dave")).is_none());
    }

    #[test]
    fn test_unknown_account_is_reported() {
        let ledger = Ledger::default();
        let missing = AccountId::new();

        assert_eq!(
            ledger.deposit(missing, dec(1)).unwrap_err(),
            LedgerError::account_not_found(missing)
        );
        assert!(ledger.snapshot(missing).is_err());
        assert!(ledger.history(missing, HistoryFilter::new()).is_err());
    }

    #[test]
    fn test_history_rejects_invalid_filter() {
        let ledger = Ledger::default();
        let account = open(&ledger, "erin");
        let filter = HistoryFilter {
            kind: Some(TransactionKind::Deposit),
            asset_type: Some(AssetType::Stock),
            ..HistoryFilter::default()
        };

        let err = ledger.history(account, filter).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidFilter { .. }));
    }

    #[test]
    fn test_ensure_account_opens_once() {
        let ledger = Ledger::default();
        let user = UserId::new("frank");

        let first = ledger.ensure_account(&user).unwrap();
        let second = ledger.ensure_account(&user).unwrap();

        assert_eq!(first, second);
        assert_eq!(ledger.account_for_user(&user), Some(first));
        assert_eq!(ledger.snapshot(first).unwrap().currency, Currency::USD);
    }

    #[test]
    fn test_events_follow_successful_mutations_only() {
        let ledger = Ledger::default();
        let mut rx = ledger.subscribe();
        let account = open(&ledger, "gina");

        ledger.deposit(account, dec(100)).unwrap();
        ledger.withdraw(account, dec(500)).unwrap_err();
        ledger.allocate(account, dec(40), btc()).unwrap();

        let first = rx.try_recv().unwrap();
        assert_eq!(first.transaction.kind, TransactionKind::Deposit);
        assert_eq!(first.snapshot.total_balance, dec(100));

        let second = rx.try_recv().unwrap();
        assert_eq!(second.transaction.kind, TransactionKind::Allocation);
        assert_eq!(second.transaction.id, 2);
        assert_eq!(second.snapshot.allocated_balance, dec(40));

        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_apply_record_opens_account_and_requires_asset() {
        let ledger = Ledger::default();
        let user = UserId::new("hank");

        let deposit = JournalRecord {
            kind: TransactionKind::Deposit,
            user: user.clone(),
            amount: dec(20),
            asset: None,
            note: None,
        };
        let snapshot = ledger.apply_record(&deposit).unwrap();
        assert_eq!(snapshot.user_id, user);
        assert_eq!(snapshot.total_balance, dec(20));

        let allocation = JournalRecord {
            kind: TransactionKind::Allocation,
            asset: None,
            ..deposit
        };
        let err = ledger.apply_record(&allocation).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAsset { .. }));
    }

    #[test]
    fn test_concurrent_operations_on_one_account_conserve_funds() {
        let ledger = Arc::new(Ledger::default());
        let account = open(&ledger, "ivan");
        ledger.deposit(account, dec(1000)).unwrap();

        let workers: Vec<_> = (0..8)
            .map(|worker| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || {
                    let asset = if worker % 2 == 0 { btc() } else { eth() };
                    for _ in 0..200 {
                        let _ = ledger.deposit(account, dec(3));
                        let _ = ledger.allocate(account, dec(5), asset.clone());
                        let _ = ledger.withdraw(account, dec(4));
                        let _ = ledger.deallocate(account, dec(2), asset.clone());
                        let snapshot = ledger.snapshot(account).unwrap();
                        assert_eq!(
                            snapshot.total_balance,
                            snapshot.available_balance + snapshot.allocated_balance
                        );
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let snapshot = ledger.snapshot(account).unwrap();
        let history = ledger.history(account, HistoryFilter::new()).unwrap();
        let mut net = Decimal::ZERO;
        for tx in &history {
            match tx.kind {
                TransactionKind::Deposit => net += tx.amount,
                TransactionKind::Withdrawal => net -= tx.amount,
                _ => {}
            }
        }
        assert_eq!(snapshot.total_balance, net);
        assert_eq!(
            snapshot.allocations.values().copied().sum::<Decimal>(),
            snapshot.allocated_balance
        );

        let ids: Vec<u64> = history.iter().map(|tx| tx.id).collect();
        let expected: Vec<u64> = (1..=ids.len() as u64).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_opening_deposit_event_precedes_concurrent_deposit() {
        let ledger = Arc::new(Ledger::default());
        let mut rx = ledger.subscribe();

        for round in 0..50 {
            let user = UserId::new(format!("racer{round}"));
            let opener = {
                let ledger = Arc::clone(&ledger);
                let user = user.clone();
                thread::spawn(move || {
                    let _ = ledger.open_account(user, Currency::USD, dec(10));
                })
            };
            let depositor = {
                let ledger = Arc::clone(&ledger);
                let user = user.clone();
                thread::spawn(move || {
                    let account = ledger.ensure_account(&user).unwrap();
                    ledger.deposit(account, dec(1)).unwrap();
                })
            };
            opener.join().unwrap();
            depositor.join().unwrap();

            let mut ids = Vec::new();
            while let Ok(event) = rx.try_recv() {
                ids.push(event.transaction.id);
            }
            let expected: Vec<u64> = (1..=ids.len() as u64).collect();
            assert_eq!(ids, expected, "events out of log order for {user}");
        }
    }

    #[test]
    fn test_accounts_are_independent_and_sorted() {
        let ledger = Arc::new(Ledger::default());
        let users = ["zoe", "adam", "mia", "liam"];

        let workers: Vec<_> = users
            .iter()
            .map(|user| {
                let ledger = Arc::clone(&ledger);
                let user = UserId::new(*user);
                thread::spawn(move || {
                    let account = ledger.ensure_account(&user).unwrap();
                    for _ in 0..100 {
                        ledger.deposit(account, Decimal::new(1, 2)).unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let accounts = ledger.accounts();
        let order: Vec<&str> = accounts.iter().map(|a| a.user_id.as_str()).collect();
        assert_eq!(order, vec!["adam", "liam", "mia", "zoe"]);
        for account in accounts {
            assert_eq!(account.total_balance, Decimal::ONE);
        }
    }
}
