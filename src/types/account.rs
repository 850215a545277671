//! Account-related types for the fund ledger
//!
//! This module defines the identifiers, currency and asset keys of an account,
//! and the `AccountSnapshot` handed out to every caller of the ledger.

use super::error::LedgerError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque account identifier, assigned once when the account is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(Uuid);

impl AccountId {
    /// Generate a fresh random identifier
    pub fn new() -> Self {
        AccountId(Uuid::new_v4())
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for AccountId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(AccountId)
    }
}

/// Identifier of the user owning an account
///
/// The ledger never authenticates: whatever identifier the caller supplies
/// is the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        UserId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        UserId::new(id)
    }
}

/// Three-letter, upper-case currency code (ISO-4217 style)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency([u8; 3]);

impl Currency {
    pub const USD: Currency = Currency(*b"USD");

    pub fn as_str(&self) -> &str {
        // Constructed only from validated ASCII letters
        std::str::from_utf8(&self.0).unwrap_or("???")
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::USD
    }
}

impl FromStr for Currency {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let bytes = trimmed.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(u8::is_ascii_alphabetic) {
            return Err(LedgerError::invalid_currency(s));
        }
        let mut code = [0u8; 3];
        for (slot, byte) in code.iter_mut().zip(bytes) {
            *slot = byte.to_ascii_uppercase();
        }
        Ok(Currency(code))
    }
}

impl TryFrom<String> for Currency {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.as_str().to_string()
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Asset classes funds can be allocated to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Crypto,
    Stock,
    Forex,
    Commodity,
}

impl AssetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Crypto => "crypto",
            AssetType::Stock => "stock",
            AssetType::Forex => "forex",
            AssetType::Commodity => "commodity",
        }
    }
}

impl FromStr for AssetType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "crypto" => Ok(AssetType::Crypto),
            "stock" => Ok(AssetType::Stock),
            "forex" => Ok(AssetType::Forex),
            "commodity" => Ok(AssetType::Commodity),
            _ => Err(LedgerError::invalid_asset(s)),
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key of one allocation entry: asset class plus instrument
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AllocationKey {
    pub asset_type: AssetType,
    pub asset_id: String,
}

impl AllocationKey {
    /// Build a key, trimming the instrument id and rejecting an empty one
    pub fn new(asset_type: AssetType, asset_id: impl AsRef<str>) -> Result<Self, LedgerError> {
        let asset_id = asset_id.as_ref().trim();
        if asset_id.is_empty() {
            return Err(LedgerError::invalid_asset(format!("{asset_type}/")));
        }
        Ok(AllocationKey {
            asset_type,
            asset_id: asset_id.to_string(),
        })
    }

    /// Parse both halves of the key from caller-supplied text
    pub fn parse(asset_type: &str, asset_id: &str) -> Result<Self, LedgerError> {
        Self::new(asset_type.parse()?, asset_id)
    }
}

impl fmt::Display for AllocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.asset_type, self.asset_id)
    }
}

/// Point-in-time view of an account
///
/// Snapshots are plain values: holding one never blocks the ledger, and
/// mutating one has no effect on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub id: AccountId,
    pub user_id: UserId,
    pub currency: Currency,

    /// Sum of available and allocated funds
    pub total_balance: Decimal,

    /// Funds not committed to any allocation
    pub available_balance: Decimal,

    /// Sum of every entry in `allocations`
    pub allocated_balance: Decimal,

    /// Per-asset breakdown of `allocated_balance`; never holds zero entries
    pub allocations: BTreeMap<AllocationKey, Decimal>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AccountSnapshot {
    /// Amount allocated to `key`, zero when there is no entry
    pub fn allocation(&self, key: &AllocationKey) -> Decimal {
        self.allocations.get(key).copied().unwrap_or(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("USD", "USD")]
    #[case("eur", "EUR")]
    #[case("  gbp ", "GBP")]
    fn test_currency_parses_and_normalizes(#[case] input: &str, #[case] expected: &str) {
        let currency: Currency = input.parse().unwrap();
        assert_eq!(currency.as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("US")]
    #[case("USDT")]
    #[case("U$D")]
    #[case("12A")]
    fn test_currency_rejects_malformed_codes(#[case] input: &str) {
        let err = input.parse::<Currency>().unwrap_err();
        assert!(matches!(err, LedgerError::InvalidCurrency { .. }));
    }

    #[rstest]
    #[case("crypto", AssetType::Crypto)]
    #[case("STOCK", AssetType::Stock)]
    #[case(" Forex ", AssetType::Forex)]
    #[case("commodity", AssetType::Commodity)]
    fn test_asset_type_parsing(#[case] input: &str, #[case] expected: AssetType) {
        assert_eq!(input.parse::<AssetType>().unwrap(), expected);
    }

    #[test]
    fn test_asset_type_rejects_unknown() {
        let err = "bonds".parse::<AssetType>().unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAsset { .. }));
    }

    #[test]
    fn test_allocation_key_trims_and_rejects_empty_id() {
        let key = AllocationKey::parse("crypto", " BTC ").unwrap();
        assert_eq!(key.asset_id, "BTC");
        assert_eq!(key.to_string(), "crypto/BTC");

        assert!(AllocationKey::parse("crypto", "   ").is_err());
    }

    #[test]
    fn test_account_id_round_trips_through_text() {
        let id = AccountId::new();
        let parsed: AccountId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_currency_serializes_as_string() {
        let json = serde_json::to_string(&Currency::USD).unwrap();
        assert_eq!(json, "\"USD\"");
        let back: Currency = serde_json::from_str("\"jpy\"").unwrap();
        assert_eq!(back.as_str(), "JPY");
    }
}
