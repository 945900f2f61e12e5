//! Internal helpers for parsing and validation.
//!
//! These utilities are **not** part of the public API. They centralize the
//! conversions between storage columns and domain values so every module
//! enforces the same invariants.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{EngineError, Quantity, ResultEngine};

/// Parses a signed decimal string into an integer scaled by `10^decimals`.
///
/// Accepts `.` or `,` as separator and an optional leading sign. Returns a
/// static reason on failure so callers can wrap it in their own error kind.
pub(crate) fn parse_fixed_point(input: &str, decimals: u32) -> Result<i64, &'static str> {
    let trimmed = input.trim();
    let (negative, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    if rest.is_empty() {
        return Err("empty value");
    }

    let normalized = rest.replace(',', ".");
    let (whole, frac) = match normalized.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (normalized.as_str(), ""),
    };
    let digits_only = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if whole.is_empty() || !digits_only(whole) || !digits_only(frac) {
        return Err("invalid value");
    }
    if frac.len() > decimals as usize {
        return Err("too many decimals");
    }

    let scale = 10_i64.pow(decimals);
    let whole: i64 = whole.parse().map_err(|_| "value too large")?;
    let frac_scaled: i64 = if frac.is_empty() {
        0
    } else {
        let padding = 10_i64.pow(decimals - frac.len() as u32);
        frac.parse::<i64>().map_err(|_| "invalid value")? * padding
    };

    let value = whole
        .checked_mul(scale)
        .and_then(|v| v.checked_add(frac_scaled))
        .ok_or("value too large")?;
    Ok(if negative { -value } else { value })
}

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::KeyNotFound(format!("invalid {label} id")))
}

pub(crate) fn parse_optional_uuid(value: Option<&str>, label: &str) -> ResultEngine<Option<Uuid>> {
    value.map(|v| parse_uuid(v, label)).transpose()
}

/// Rejects zero and negative quantities where a positive amount is required.
pub(crate) fn ensure_positive_quantity(quantity: Quantity, label: &str) -> ResultEngine<()> {
    if !quantity.is_positive() {
        return Err(EngineError::InvalidQuantity(format!(
            "{label} must be > 0, got {quantity}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_date_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (from, to)
        && from > to
    {
        return Err(EngineError::Validation(
            "invalid range: from must be <= to".to_string(),
        ));
    }
    Ok(())
}

/// `numerator / denominator` rounded half away from zero.
pub(crate) fn div_round_half_up(numerator: i128, denominator: i128) -> i128 {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    if remainder.abs() * 2 >= denominator.abs() {
        quotient + numerator.signum() * denominator.signum()
    } else {
        quotient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_point_pads_fraction() {
        assert_eq!(parse_fixed_point("1.5", 3), Ok(1_500));
        assert_eq!(parse_fixed_point("1,05", 2), Ok(105));
        assert_eq!(parse_fixed_point("-3", 2), Ok(-300));
        assert_eq!(parse_fixed_point("7.", 2), Ok(700));
    }

    #[test]
    fn fixed_point_rejects_garbage() {
        assert_eq!(parse_fixed_point("", 2), Err("empty value"));
        assert_eq!(parse_fixed_point("1.2.3", 2), Err("invalid value"));
        assert_eq!(parse_fixed_point(".5", 2), Err("invalid value"));
        assert_eq!(parse_fixed_point("1e3", 2), Err("invalid value"));
    }

    #[test]
    fn rounds_half_up() {
        assert_eq!(div_round_half_up(2_500, 1_000), 3);
        assert_eq!(div_round_half_up(2_499, 1_000), 2);
        assert_eq!(div_round_half_up(-2_500, 1_000), -3);
        assert_eq!(div_round_half_up(0, 1_000), 0);
    }
}
