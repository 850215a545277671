//! Transport-agnostic request/response contract
//!
//! Each function here is one endpoint of the account service, expressed
//! over plain serde types so any HTTP or RPC layer can wrap it:
//!
//! ```text
//! POST /account                      → open_account(OpenAccountRequest)
//! GET  /account                      → get_account
//! POST /account/deposit              → deposit(DepositRequest)
//! POST /account/withdraw             → withdraw(WithdrawRequest)
//! POST /account/allocate             → allocate(AllocationRequest)
//! POST /account/deallocate           → deallocate(AllocationRequest)
//! GET  /account/transactions?...     → transactions(HistoryQuery)
//! ```
//!
//! Requests are scoped to the calling user, who owns at most one account.
//! Amounts travel as decimal strings in both directions.

use crate::core::Ledger;
use crate::types::{
    parse_amount, AccountId, AccountSnapshot, AllocationKey, AssetType, Currency, ErrorKind,
    HistoryFilter, LedgerError, Transaction, TransactionId, TransactionKind, TransactionStatus,
    UserId,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OpenAccountRequest {
    /// Defaults to the ledger's configured currency
    #[serde(default)]
    pub currency: Option<String>,

    /// Defaults to zero
    #[serde(default)]
    pub initial_deposit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DepositRequest {
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WithdrawRequest {
    pub amount: String,
}

/// Body of both allocate and deallocate
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AllocationRequest {
    pub amount: String,
    pub asset_type: String,
    pub asset_id: String,
}

/// Query string of the transaction listing; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HistoryQuery {
    pub kind: Option<String>,
    pub asset_type: Option<String>,
    pub asset_id: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationView {
    pub asset_type: AssetType,
    pub asset_id: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountView {
    pub id: AccountId,
    pub user_id: UserId,
    pub currency: Currency,
    pub total_balance: Decimal,
    pub available_balance: Decimal,
    pub allocated_balance: Decimal,
    pub allocations: Vec<AllocationView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AccountSnapshot> for AccountView {
    fn from(snapshot: AccountSnapshot) -> Self {
        let allocations = snapshot
            .allocations
            .into_iter()
            .map(|(key, amount)| AllocationView {
                asset_type: key.asset_type,
                asset_id: key.asset_id,
                amount,
            })
            .collect();

        AccountView {
            id: snapshot.id,
            user_id: snapshot.user_id,
            currency: snapshot.currency,
            total_balance: snapshot.total_balance,
            available_balance: snapshot.available_balance,
            allocated_balance: snapshot.allocated_balance,
            allocations,
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionView {
    pub id: TransactionId,
    pub account_id: AccountId,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub asset_type: Option<AssetType>,
    pub asset_id: Option<String>,
    pub status: TransactionStatus,
    pub note: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<Transaction> for TransactionView {
    fn from(tx: Transaction) -> Self {
        let (asset_type, asset_id) = match tx.asset {
            Some(key) => (Some(key.asset_type), Some(key.asset_id)),
            None => (None, None),
        };

        TransactionView {
            id: tx.id,
            account_id: tx.account_id,
            kind: tx.kind,
            amount: tx.amount,
            asset_type,
            asset_id,
            status: tx.status,
            note: tx.note,
            timestamp: tx.timestamp,
        }
    }
}

/// Error response body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,

    /// Suggested transport status code
    pub status: u16,

    pub message: String,
}

impl From<LedgerError> for ErrorBody {
    fn from(error: LedgerError) -> Self {
        let kind = error.kind();
        ErrorBody {
            kind,
            status: kind.status_code(),
            message: error.to_string(),
        }
    }
}

pub type ApiResult<T> = Result<T, ErrorBody>;

pub fn open_account(
    ledger: &Ledger,
    user: &UserId,
    request: OpenAccountRequest,
) -> ApiResult<AccountView> {
    let currency = match request.currency.as_deref() {
        Some(code) => code.parse::<Currency>()?,
        None => ledger.config().default_currency,
    };
    // Zero is a valid opening balance; the ledger rejects negative ones
    let initial_deposit = match request.initial_deposit.as_deref().map(str::trim) {
        Some(amount) if !amount.is_empty() => amount
            .parse::<Decimal>()
            .map_err(|_| LedgerError::invalid_amount(amount, "not a finite decimal number"))?,
        _ => Decimal::ZERO,
    };

    let snapshot = ledger.open_account(user.clone(), currency, initial_deposit)?;
    Ok(snapshot.into())
}

pub fn get_account(ledger: &Ledger, user: &UserId) -> ApiResult<AccountView> {
    let account = account_of(ledger, user)?;
    Ok(ledger.snapshot(account)?.into())
}

pub fn deposit(ledger: &Ledger, user: &UserId, request: DepositRequest) -> ApiResult<AccountView> {
    let account = account_of(ledger, user)?;
    let amount = parse_amount(&request.amount)?;
    Ok(ledger.deposit(account, amount)?.into())
}

pub fn withdraw(
    ledger: &Ledger,
    user: &UserId,
    request: WithdrawRequest,
) -> ApiResult<AccountView> {
    let account = account_of(ledger, user)?;
    let amount = parse_amount(&request.amount)?;
    Ok(ledger.withdraw(account, amount)?.into())
}

pub fn allocate(
    ledger: &Ledger,
    user: &UserId,
    request: AllocationRequest,
) -> ApiResult<AccountView> {
    let account = account_of(ledger, user)?;
    let amount = parse_amount(&request.amount)?;
    let asset = AllocationKey::parse(&request.asset_type, &request.asset_id)?;
    Ok(ledger.allocate(account, amount, asset)?.into())
}

pub fn deallocate(
    ledger: &Ledger,
    user: &UserId,
    request: AllocationRequest,
) -> ApiResult<AccountView> {
    let account = account_of(ledger, user)?;
    let amount = parse_amount(&request.amount)?;
    let asset = AllocationKey::parse(&request.asset_type, &request.asset_id)?;
    Ok(ledger.deallocate(account, amount, asset)?.into())
}

/// Transactions of the caller's account matching `query`, oldest first
pub fn transactions(
    ledger: &Ledger,
    user: &UserId,
    query: HistoryQuery,
) -> ApiResult<Vec<TransactionView>> {
    let account = account_of(ledger, user)?;
    let filter = HistoryFilter::from_query(
        query.kind.as_deref(),
        query.asset_type.as_deref(),
        query.asset_id.as_deref(),
        query.from.as_deref(),
        query.to.as_deref(),
    )?;
    let history = ledger.history(account, filter)?;
    Ok(history.into_iter().map(TransactionView::from).collect())
}

fn account_of(ledger: &Ledger, user: &UserId) -> ApiResult<AccountId> {
    ledger.account_for_user(user).ok_or_else(|| {
        let kind = ErrorKind::AccountNotFound;
        ErrorBody {
            kind,
            status: kind.status_code(),
            message: format!("No account for user {}", user),
        }
    })
}
