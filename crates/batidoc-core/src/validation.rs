//! # Validation Module
//!
//! Input validation for values entering the document tree and the
//! retention lifecycle.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Forms (outside this crate)                                   │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: normalize / tree edits / retention (Rust)                    │
//! │  └── THIS MODULE: reject negative, out-of-range, malformed values      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Aggregator                                                   │
//! │  └── Assumes non-negative input, never clamps                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use batidoc_core::validation::{validate_quantity, validate_unit_price};
//! use rust_decimal::Decimal;
//!
//! assert!(validate_quantity(Decimal::new(25, 1)).is_ok());
//! assert!(validate_unit_price(Decimal::new(-1, 0)).is_err());
//! ```

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_NAME_LENGTH, MAX_QUANTITY, MAX_UNIT_PRICE};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates the name of a line item or material.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 200 characters
pub fn validate_line_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LENGTH,
        });
    }

    Ok(())
}

/// Validates a section name. Empty is allowed (direct mode).
pub fn validate_section_name(name: &str) -> ValidationResult<()> {
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "section name".to_string(),
            max: MAX_NAME_LENGTH,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

fn validate_non_negative(field: &str, value: Decimal, max: Decimal) -> ValidationResult<()> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::Negative {
            field: field.to_string(),
            value: value.to_string(),
        });
    }

    if value > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: "0".to_string(),
            max: max.to_string(),
            value: value.to_string(),
        });
    }

    Ok(())
}

/// Validates a quantity (line item or material).
///
/// ## Rules
/// - Must be non-negative (zero is allowed: placeholder lines)
/// - Must not exceed [`MAX_QUANTITY`]
pub fn validate_quantity(qty: Decimal) -> ValidationResult<()> {
    validate_non_negative("quantity", qty, Decimal::from(MAX_QUANTITY))
}

/// Validates a unit price in euros.
///
/// ## Rules
/// - Must be non-negative (zero is allowed: offered items)
/// - Must not exceed [`MAX_UNIT_PRICE`]
pub fn validate_unit_price(price: Decimal) -> ValidationResult<()> {
    validate_non_negative("unit price", price, Decimal::from(MAX_UNIT_PRICE))
}

/// Validates a percentage given as a decimal (tax or retention rate).
///
/// ## Rules
/// - Must be within [0, 100]
pub fn validate_rate_percent(field: &str, percent: Decimal) -> ValidationResult<()> {
    validate_non_negative(field, percent, Decimal::ONE_HUNDRED)
}

/// Validates a rate already expressed in basis points.
pub fn validate_rate_bps(field: &str, bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: "0".to_string(),
            max: "100".to_string(),
            value: Decimal::new(bps as i64, 2).normalize().to_string(),
        });
    }

    Ok(())
}

/// Validates a retention release amount.
///
/// ## Rules
/// - Must be strictly positive
pub fn validate_release_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "release amount".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ```rust
/// use batidoc_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
