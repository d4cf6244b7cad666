//! Fixed-point amount conversion.
//!
//! Amounts cross the tool boundary as human decimal strings ("1.5") and are
//! converted to smallest-denomination integers only when a call is built.
//! Everything here is integer arithmetic on `U256`; no floats are involved.

use ethers_core::types::U256;
use thiserror::Error;

/// Decimals of every network's native asset.
pub const NATIVE_DECIMALS: u32 = 18;

/// Largest exponent for which `10^decimals` fits in a `U256`.
pub const MAX_DECIMALS: u32 = 77;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("invalid decimal amount '{0}'")]
    InvalidDecimal(String),
    #[error("amount '{value}' has more than {decimals} fractional digits")]
    TooPrecise { value: String, decimals: u32 },
    #[error("amount '{0}' does not fit in 256 bits")]
    Overflow(String),
    #[error("unsupported decimals: {0}")]
    UnsupportedDecimals(u32),
    #[error("invalid integer '{0}'")]
    InvalidInteger(String),
}

fn check_decimals(decimals: u32) -> Result<(), AmountError> {
    if decimals > MAX_DECIMALS {
        return Err(AmountError::UnsupportedDecimals(decimals));
    }
    Ok(())
}

/// Convert a human decimal string into smallest units.
///
/// Trailing fractional zeros beyond `decimals` are accepted ("1.500" with 2
/// decimals), any other excess precision is rejected rather than rounded.
pub fn parse_units(value: &str, decimals: u32) -> Result<U256, AmountError> {
    check_decimals(decimals)?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }

    let (int_part, frac_part) = match trimmed.split_once('.') {
        Some((i, f)) => (i, f),
        None => (trimmed, ""),
    };
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (int_part.is_empty() && frac_part.is_empty())
        || !all_digits(int_part)
        || !all_digits(frac_part)
    {
        return Err(AmountError::InvalidDecimal(value.to_string()));
    }

    let frac_part = frac_part.trim_end_matches('0');
    if frac_part.len() > decimals as usize {
        return Err(AmountError::TooPrecise {
            value: value.to_string(),
            decimals,
        });
    }

    let mut digits = String::with_capacity(int_part.len() + decimals as usize);
    digits.push_str(int_part);
    digits.push_str(frac_part);
    digits.extend(std::iter::repeat('0').take(decimals as usize - frac_part.len()));
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::zero());
    }

    U256::from_dec_str(digits).map_err(|_| AmountError::Overflow(value.to_string()))
}

// Split `value` into its integer digits and exactly `decimals` fractional digits.
fn split_digits(value: U256, decimals: usize) -> (String, String) {
    let raw = value.to_string();
    let padded = if raw.len() <= decimals {
        format!("{}{}", "0".repeat(decimals + 1 - raw.len()), raw)
    } else {
        raw
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - decimals);
    (int_part.to_string(), frac_part.to_string())
}

/// Render smallest units as a canonical decimal string (no trailing zeros).
pub fn format_units(value: U256, decimals: u32) -> Result<String, AmountError> {
    check_decimals(decimals)?;
    let (int_part, frac_part) = split_digits(value, decimals as usize);
    let frac_part = frac_part.trim_end_matches('0');
    if frac_part.is_empty() {
        Ok(int_part)
    } else {
        Ok(format!("{}.{}", int_part, frac_part))
    }
}

/// Render smallest units with exactly `places` fractional digits, rounding
/// half-up when the token has more precision than requested.
pub fn format_fixed(value: U256, decimals: u32, places: u32) -> Result<String, AmountError> {
    check_decimals(decimals)?;
    check_decimals(places)?;

    let (int_part, frac_part) = if decimals <= places {
        let (i, mut f) = split_digits(value, decimals as usize);
        f.push_str(&"0".repeat((places - decimals) as usize));
        (i, f)
    } else {
        let divisor = U256::exp10((decimals - places) as usize);
        let mut quotient = value / divisor;
        let remainder = value % divisor;
        if remainder >= divisor - remainder {
            quotient += U256::one();
        }
        split_digits(quotient, places as usize)
    };

    if frac_part.is_empty() {
        Ok(int_part)
    } else {
        Ok(format!("{}.{}", int_part, frac_part))
    }
}

/// Parse a non-negative integer given either in decimal or as `0x` hex.
pub fn parse_integer(value: &str) -> Result<U256, AmountError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }
    let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(hex_digits) if !hex_digits.is_empty() => U256::from_str_radix(hex_digits, 16).ok(),
        Some(_) => None,
        None => U256::from_dec_str(trimmed).ok(),
    };
    parsed.ok_or_else(|| AmountError::InvalidInteger(value.to_string()))
}
