//! History filters
//!
//! A [`HistoryFilter`] narrows an account's transaction log by kind, asset
//! and time window. Filters built from raw query parameters go through
//! [`HistoryFilter::from_query`], which is where malformed input turns into
//! `InvalidFilter`.

use super::account::{AllocationKey, AssetType};
use super::error::LedgerError;
use super::transaction::{Transaction, TransactionKind};
use chrono::{DateTime, NaiveDate, Utc};

/// Criteria a transaction must meet to appear in a history listing
///
/// Every criterion is optional; the default filter matches everything.
/// The time window is inclusive on both ends.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryFilter {
    pub kind: Option<TransactionKind>,
    pub asset_type: Option<AssetType>,
    pub asset_id: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl HistoryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn asset(mut self, key: &AllocationKey) -> Self {
        self.asset_type = Some(key.asset_type);
        self.asset_id = Some(key.asset_id.clone());
        self
    }

    pub fn asset_type(mut self, asset_type: AssetType) -> Self {
        self.asset_type = Some(asset_type);
        self
    }

    pub fn since(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    pub fn until(mut self, to: DateTime<Utc>) -> Self {
        self.to = Some(to);
        self
    }

    /// Build a filter from raw query-string values
    ///
    /// Empty values count as absent. Dates accept RFC 3339 timestamps or plain
    /// `YYYY-MM-DD` days (a bare `to` day covers the whole day).
    pub fn from_query(
        kind: Option<&str>,
        asset_type: Option<&str>,
        asset_id: Option<&str>,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<Self, LedgerError> {
        let kind = non_empty(kind)
            .map(|k| k.parse::<TransactionKind>().map_err(LedgerError::invalid_filter))
            .transpose()?;

        let asset_type = non_empty(asset_type)
            .map(|a| {
                a.parse::<AssetType>()
                    .map_err(|_| LedgerError::invalid_filter(format!("unknown asset type '{}'", a)))
            })
            .transpose()?;

        let from = non_empty(from)
            .map(|value| parse_bound(value, false))
            .transpose()?;
        let to = non_empty(to).map(|value| parse_bound(value, true)).transpose()?;

        let filter = HistoryFilter {
            kind,
            asset_type,
            asset_id: non_empty(asset_id).map(str::to_string),
            from,
            to,
        };
        filter.validate()?;
        Ok(filter)
    }

    /// Reject filters that can never be satisfied because they are contradictory
    pub fn validate(&self) -> Result<(), LedgerError> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(LedgerError::invalid_filter(format!(
                    "'from' ({}) is after 'to' ({})",
                    from.to_rfc3339(),
                    to.to_rfc3339()
                )));
            }
        }

        let filters_asset = self.asset_type.is_some() || self.asset_id.is_some();
        if let Some(kind) = self.kind {
            if filters_asset && !kind.targets_asset() {
                return Err(LedgerError::invalid_filter(format!(
                    "{} transactions have no asset to filter on",
                    kind
                )));
            }
        }

        Ok(())
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        if self.kind.is_some_and(|kind| kind != tx.kind) {
            return false;
        }

        if self.asset_type.is_some() || self.asset_id.is_some() {
            let Some(asset) = &tx.asset else {
                return false;
            };
            if self.asset_type.is_some_and(|t| t != asset.asset_type) {
                return false;
            }
            if self
                .asset_id
                .as_deref()
                .is_some_and(|id| id != asset.asset_id)
            {
                return false;
            }
        }

        if self.from.is_some_and(|from| tx.timestamp < from) {
            return false;
        }
        if self.to.is_some_and(|to| tx.timestamp > to) {
            return false;
        }

        true
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_bound(value: &str, end_of_day: bool) -> Result<DateTime<Utc>, LedgerError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }

    let day = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| LedgerError::invalid_filter(format!("unparseable date '{}'", value)))?;
    let time = if end_of_day {
        day.and_hms_milli_opt(23, 59, 59, 999)
    } else {
        day.and_hms_opt(0, 0, 0)
    };
    time.map(|t| t.and_utc())
        .ok_or_else(|| LedgerError::invalid_filter(format!("unparseable date '{}'", value)))
}
