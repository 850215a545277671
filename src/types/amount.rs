//! Amount validation
//!
//! Amounts are `rust_decimal::Decimal` values throughout. A decimal has no
//! NaN or infinity, so textual input is the only place those can sneak in and
//! is rejected here before it reaches the ledger.
//!
//! Amounts are limited to [`MAX_SCALE`] decimal places, the precision every
//! report prints, so nothing the ledger stores is lost on export.

use super::error::LedgerError;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Decimal places an amount may carry (trailing zeros excluded)
pub const MAX_SCALE: u32 = 4;

/// Reject anything that is not strictly positive or is finer than [`MAX_SCALE`]
pub fn ensure_positive(amount: Decimal) -> Result<Decimal, LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::invalid_amount(amount, "must be greater than zero"));
    }
    if amount.normalize().scale() > MAX_SCALE {
        return Err(LedgerError::invalid_amount(
            amount,
            &format!("more than {} decimal places", MAX_SCALE),
        ));
    }
    Ok(amount)
}

/// Parse a caller-supplied amount and require it to be strictly positive
///
/// Accepts plain decimal notation (`"100"`, `"0.25"`) as well as scientific
/// notation (`"1e3"`) when the value fits the decimal range.
pub fn parse_amount(input: &str) -> Result<Decimal, LedgerError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::invalid_amount(input, "amount is empty"));
    }

    let amount = Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| LedgerError::invalid_amount(input, "not a finite decimal number"))?;

    ensure_positive(amount)
}
