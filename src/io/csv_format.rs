//! CSV format handling for journal records and ledger reports
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvRecord structure for deserializing journal rows
//! - Conversion from CSV records to domain types
//! - Account, allocation and transaction report serialization
//!
//! All functions are pure (no I/O beyond the supplied writer) for easy testing.

use crate::types::{
    parse_amount, AccountSnapshot, AllocationKey, JournalRecord, Transaction, TransactionKind,
    UserId,
};
use csv::Writer;
use serde::Deserialize;
use std::io::Write;

/// CSV record structure for deserialization
///
/// Matches the journal format with columns: type, user, amount, asset_type,
/// asset_id, note. The asset columns are only meaningful for allocation and
/// deallocation rows, and the note is always optional.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct CsvRecord {
    #[serde(rename = "type")]
    pub tx_type: String,
    pub user: String,
    pub amount: Option<String>,
    pub asset_type: Option<String>,
    pub asset_id: Option<String>,
    pub note: Option<String>,
}

/// Convert a CsvRecord to a JournalRecord
///
/// This function:
/// - Parses the type column into a TransactionKind (case-insensitive)
/// - Parses the amount and requires it to be strictly positive
/// - Requires an asset for allocation and deallocation rows
/// - Ignores asset columns on deposit and withdrawal rows
///
/// # Arguments
///
/// * `csv_record` - The deserialized CSV record
///
/// # Returns
///
/// Result containing either:
/// - Ok(JournalRecord) - Successfully converted record
/// - Err(String) - Error message describing the conversion failure
pub fn convert_csv_record(csv_record: CsvRecord) -> Result<JournalRecord, String> {
    let user = csv_record.user.trim();
    if user.is_empty() {
        return Err(format!("{} record has no user", csv_record.tx_type));
    }
    let user = UserId::new(user);

    let kind = csv_record
        .tx_type
        .parse::<TransactionKind>()
        .map_err(|e| format!("{} for user {}", e, user))?;

    let amount = match csv_record.amount.as_deref().map(str::trim) {
        Some(amount) if !amount.is_empty() => {
            parse_amount(amount).map_err(|e| format!("{} for user {}", e, user))?
        }
        _ => return Err(format!("{} for user {} requires an amount", kind, user)),
    };

    let asset = if kind.targets_asset() {
        let asset_type = csv_record.asset_type.as_deref().unwrap_or_default();
        let asset_id = csv_record.asset_id.as_deref().unwrap_or_default();
        if asset_type.trim().is_empty() || asset_id.trim().is_empty() {
            return Err(format!(
                "{} for user {} requires asset_type and asset_id",
                kind, user
            ));
        }
        let key = AllocationKey::parse(asset_type, asset_id)
            .map_err(|e| format!("{} for user {}", e, user))?;
        Some(key)
    } else {
        None
    };

    let note = csv_record
        .note
        .map(|note| note.trim().to_string())
        .filter(|note| !note.is_empty());

    Ok(JournalRecord {
        kind,
        user,
        amount,
        asset,
        note,
    })
}

/// Write account balances to CSV format
///
/// Writes accounts with columns: user, currency, total, available, allocated.
/// Accounts are sorted by user for deterministic output.
///
/// # Arguments
///
/// * `accounts` - Slice of account snapshots to write
/// * `output` - Mutable reference to a writer for outputting CSV
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(String)` if a write error occurred
pub fn write_accounts_csv(
    accounts: &[AccountSnapshot],
    output: &mut dyn Write,
) -> Result<(), String> {
    let mut writer = Writer::from_writer(output);

    writer
        .write_record(["user", "currency", "total", "available", "allocated"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted: Vec<&AccountSnapshot> = accounts.iter().collect();
    sorted.sort_by(|a, b| a.user_id.cmp(&b.user_id));

    for account in sorted {
        writer
            .write_record(&[
                account.user_id.to_string(),
                account.currency.to_string(),
                format!("{:.4}", account.total_balance),
                format!("{:.4}", account.available_balance),
                format!("{:.4}", account.allocated_balance),
            ])
            .map_err(|e| format!("Failed to write account record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))
}

/// Write the per-asset allocation breakdown of every account
///
/// One row per non-zero allocation, sorted by user and then by asset key.
/// Accounts without allocations contribute no rows.
pub fn write_allocations_csv(
    accounts: &[AccountSnapshot],
    output: &mut dyn Write,
) -> Result<(), String> {
    let mut writer = Writer::from_writer(output);

    writer
        .write_record(["user", "asset_type", "asset_id", "amount"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted: Vec<&AccountSnapshot> = accounts.iter().collect();
    sorted.sort_by(|a, b| a.user_id.cmp(&b.user_id));

    for account in sorted {
        for (key, amount) in &account.allocations {
            writer
                .write_record(&[
                    account.user_id.to_string(),
                    key.asset_type.to_string(),
                    key.asset_id.clone(),
                    format!("{:.4}", amount),
                ])
                .map_err(|e| format!("Failed to write allocation record: {}", e))?;
        }
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))
}

/// Write transaction logs to CSV format
///
/// Columns: user, tx, kind, amount, asset_type, asset_id, timestamp, note.
/// Rows are sorted by user and then by transaction id; timestamps are
/// RFC 3339 in UTC.
pub fn write_transactions_csv(
    entries: &[(UserId, Transaction)],
    output: &mut dyn Write,
) -> Result<(), String> {
    let mut writer = Writer::from_writer(output);

    writer
        .write_record([
            "user",
            "tx",
            "kind",
            "amount",
            "asset_type",
            "asset_id",
            "timestamp",
            "note",
        ])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted: Vec<&(UserId, Transaction)> = entries.iter().collect();
    sorted.sort_by(|(a_user, a_tx), (b_user, b_tx)| {
        a_user.cmp(b_user).then(a_tx.id.cmp(&b_tx.id))
    });

    for (user, tx) in sorted {
        let (asset_type, asset_id) = match &tx.asset {
            Some(key) => (key.asset_type.to_string(), key.asset_id.clone()),
            None => (String::new(), String::new()),
        };
        writer
            .write_record(&[
                user.to_string(),
                tx.id.to_string(),
                tx.kind.to_string(),
                format!("{:.4}", tx.amount),
                asset_type,
                asset_id,
                tx.timestamp.to_rfc3339(),
                tx.note.clone().unwrap_or_default(),
            ])
            .map_err(|e| format!("Failed to write transaction record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))
}
