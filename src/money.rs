//! Exact currency as integer cents.
//!
//! SQLite has no decimal column type, so prices are stored as `i64` cents
//! and only rendered as decimal strings at the edges (CLI, CSV, JSON).

use crate::{AppError, AppResult};

/// Parse a decimal currency string (`"1234"`, `"1234.5"`, `"1234.56"`) into
/// cents. Rejects negatives, empty input and more than two fraction digits.
pub fn parse_price(input: &str) -> AppResult<i64> {
    let trimmed = input.trim();
    let invalid = |msg: &str| {
        AppError::new("MONEY/INVALID", msg.to_string()).with_context("value", trimmed.to_string())
    };

    if trimmed.is_empty() {
        return Err(invalid("Amount is empty"));
    }
    if trimmed.starts_with('-') {
        return Err(invalid("Amount must not be negative"));
    }

    let (whole, frac) = match trimmed.split_once('.') {
        Some((_, f)) if f.is_empty() => {
            return Err(invalid("Amount has a trailing decimal point"))
        }
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };
    if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("Amount is not a number"));
    }
    if frac.len() > 2 || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("Amount must have at most two decimal places"));
    }

    let whole: i64 = whole
        .parse()
        .map_err(|_| invalid("Amount is out of range"))?;
    let frac_cents = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().unwrap_or(0) * 10,
        _ => frac.parse::<i64>().unwrap_or(0),
    };

    whole
        .checked_mul(100)
        .and_then(|c| c.checked_add(frac_cents))
        .ok_or_else(|| invalid("Amount is out of range"))
}

/// Render cents as a two-decimal string, e.g. `12345` -> `"123.45"`.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}
