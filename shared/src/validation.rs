//! Validation utilities for the Warehouse Management Platform

use rust_decimal::Decimal;

// ============================================================================
// Catalog Validations
// ============================================================================

/// Normalize a SKU: trimmed and upper-cased
pub fn normalize_sku(sku: &str) -> String {
    sku.trim().to_ascii_uppercase()
}

/// Validate SKU format (1-32 chars, alphanumeric plus `-`, `_`, `.`)
pub fn validate_sku(sku: &str) -> Result<(), &'static str> {
    if sku.is_empty() {
        return Err("SKU must not be empty");
    }
    if sku.len() > 32 {
        return Err("SKU must be at most 32 characters");
    }
    if !sku
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err("SKU must be alphanumeric with - _ . separators only");
    }
    Ok(())
}

/// Validate warehouse short code format (2-10 uppercase alphanumeric)
pub fn validate_short_code(code: &str) -> Result<(), &'static str> {
    if code.len() < 2 {
        return Err("Short code must be at least 2 characters");
    }
    if code.len() > 10 {
        return Err("Short code must be at most 10 characters");
    }
    if !code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
        return Err("Short code must be uppercase alphanumeric only");
    }
    Ok(())
}

/// Validate a monetary amount (cost/price) is non-negative
pub fn validate_money(amount: Decimal) -> Result<(), &'static str> {
    if amount < Decimal::ZERO {
        return Err("Amount must not be negative");
    }
    Ok(())
}

// ============================================================================
// Quantity Validations
// ============================================================================

/// Validate a movement line quantity (strictly positive)
pub fn validate_line_quantity(quantity: i64) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be positive");
    }
    Ok(())
}

/// Validate a counted quantity for an adjustment (zero allowed)
pub fn validate_counted_quantity(quantity: i64) -> Result<(), &'static str> {
    if quantity < 0 {
        return Err("Counted quantity must not be negative");
    }
    Ok(())
}

// ============================================================================
// Operation References
// ============================================================================

/// Format an operation reference from its type prefix and sequence number
/// (e.g., `WH/IN` + 7 -> "WH/IN/0007")
pub fn format_reference(prefix: &str, sequence: i64) -> String {
    format!("{}/{:04}", prefix, sequence)
}

/// Parse the numeric suffix out of a reference with the given prefix
pub fn parse_reference_sequence(reference: &str, prefix: &str) -> Option<i64> {
    let rest = reference.strip_prefix(prefix)?.strip_prefix('/')?;
    if rest.is_empty() || !rest.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    rest.parse().ok()
}
