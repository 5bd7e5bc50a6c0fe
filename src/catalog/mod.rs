//! CRUD over the reference tables: categories, regions, clients, products.
//!
//! Validation happens here, before any statement is issued; deletes check
//! for referencing rows explicitly and lean on `ON DELETE RESTRICT` foreign
//! keys as a backstop.

pub mod categories;
pub mod clients;
pub mod products;
pub mod regions;

use crate::{AppError, AppResult};

pub(crate) fn require_text(value: &str, code: &str, field: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(
            AppError::new(code, "Field must not be empty").with_context("field", field.to_string())
        );
    }
    Ok(trimmed.to_string())
}

/// Optional text fields: trimmed, with empty input collapsing to NULL.
pub(crate) fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// At least six digits out of `+ - space digit` characters.
pub(crate) fn phone_is_valid(phone: &str) -> bool {
    let mut digits = 0usize;
    for c in phone.chars() {
        match c {
            '0'..='9' => digits += 1,
            '+' | '-' | ' ' | '(' | ')' => {}
            _ => return false,
        }
    }
    digits >= 6
}

/// A single `@` with non-empty local and domain parts; the domain needs a dot.
pub(crate) fn email_is_valid(email: &str) -> bool {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && !domain.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        _ => false,
    }
}
