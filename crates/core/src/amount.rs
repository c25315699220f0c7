//! Decimal amounts and their base-unit (10^18) representation.

use thiserror::Error;

/// Number of decimal places in one whole unit of loot.
pub const DECIMALS: u32 = 18;

/// 10^18, the base-unit scale.
pub const UNIT: u128 = 1_000_000_000_000_000_000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("amount must not be negative")]
    Negative,
    #[error("amount is not a decimal number: {0}")]
    Invalid(String),
    #[error("amount has more than 18 decimal places")]
    TooManyDecimals,
    #[error("amount is too large")]
    Overflow,
}

/// Parse a non-negative decimal string into base units.
///
/// `"10"` becomes `10 * 10^18`, `"0.5"` becomes `5 * 10^17`.
pub fn parse_amount(text: &str) -> Result<u128, AmountError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AmountError::Empty);
    }
    if text.starts_with('-') {
        return Err(AmountError::Negative);
    }

    let (whole, frac) = match text.split_once('.') {
        Some((w, f)) => (w, f),
        None => (text, ""),
    };
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && frac.is_empty()) || !all_digits(whole) || !all_digits(frac) {
        return Err(AmountError::Invalid(text.to_string()));
    }
    if frac.len() > DECIMALS as usize {
        return Err(AmountError::TooManyDecimals);
    }

    let whole_units: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| AmountError::Overflow)?
    };
    let frac_units: u128 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", frac, width = DECIMALS as usize);
        padded.parse().map_err(|_| AmountError::Invalid(text.to_string()))?
    };

    whole_units
        .checked_mul(UNIT)
        .and_then(|v| v.checked_add(frac_units))
        .ok_or(AmountError::Overflow)
}

/// Format base units as a trimmed decimal string (`10`, `10.5`).
pub fn format_amount(base_units: u128) -> String {
    let whole = base_units / UNIT;
    let frac = base_units % UNIT;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:018}", frac);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

/// Base units scaled by 10^-18 for display.
pub fn to_display_units(base_units: u128) -> f64 {
    base_units as f64 / UNIT as f64
}
