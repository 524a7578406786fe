//! # Validation Module
//!
//! Boundary validation for everything that enters a cash session.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (back-office UI, CLI, Sales/Expenses)                 │
//! │  └── Parsing, denomination names, decimal amounts                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: till-engine                                                   │
//! │  └── THIS MODULE: identifiers, amounts, counts, notes, paging          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK constraints on amounts and status                           │
//! │  └── Partial UNIQUE index: one OPEN session per branch                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here touches session state; a rejected input leaves the store
//! exactly as it was.

use crate::denomination::Denomination;
use crate::error::ValidationError;
use crate::money::Money;
use crate::types::Pagination;
use crate::{MAX_CASH_AMOUNT_CENTS, MAX_DENOMINATION_COUNT, MAX_IDENTIFIER_LENGTH, MAX_NOTES_LENGTH};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a branch or user identifier and returns it trimmed.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most [`MAX_IDENTIFIER_LENGTH`] characters
/// - No control characters
///
/// ## Example
/// ```rust
/// use till_core::validation::validate_identifier;
///
/// assert_eq!(validate_identifier("branch_id", " north ").unwrap(), "north");
/// assert!(validate_identifier("branch_id", "   ").is_err());
/// ```
pub fn validate_identifier(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > MAX_IDENTIFIER_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_IDENTIFIER_LENGTH,
        });
    }

    if value.chars().any(char::is_control) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must not contain control characters".to_string(),
        });
    }

    Ok(value.to_string())
}

/// Normalizes free-text notes.
///
/// Blank notes become `None`; anything longer than [`MAX_NOTES_LENGTH`]
/// characters is rejected rather than truncated.
pub fn validate_notes(field: &str, notes: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(notes) = notes.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };

    if notes.chars().count() > MAX_NOTES_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NOTES_LENGTH,
        });
    }

    Ok(Some(notes.to_string()))
}

/// Validates an optional free-form reference (receipt number, voucher id).
pub fn validate_reference(reference: Option<&str>) -> ValidationResult<Option<String>> {
    match reference.map(str::trim).filter(|r| !r.is_empty()) {
        None => Ok(None),
        Some(r) => validate_identifier("reference", r).map(Some),
    }
}

// =============================================================================
// Amount Validators
// =============================================================================

/// Validates the amount counted into the drawer at open.
///
/// ## Rules
/// - Zero is allowed (drawer starts empty)
/// - Negative is rejected
/// - At most [`MAX_CASH_AMOUNT_CENTS`]
///
/// ## Example
/// ```rust
/// use till_core::validation::validate_opening_amount;
///
/// assert!(validate_opening_amount(0).is_ok());
/// assert!(validate_opening_amount(50_000).is_ok());
/// assert!(validate_opening_amount(-1).is_err());
/// ```
pub fn validate_opening_amount(cents: i64) -> ValidationResult<Money> {
    if cents < 0 {
        return Err(ValidationError::Negative {
            field: "opening_amount".to_string(),
        });
    }

    if cents > MAX_CASH_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "opening_amount".to_string(),
            min: 0,
            max: MAX_CASH_AMOUNT_CENTS,
        });
    }

    Ok(Money::from_cents(cents))
}

/// Validates the amount of a sale or expense event.
///
/// ## Rules
/// - Must be positive (> 0)
/// - At most [`MAX_CASH_AMOUNT_CENTS`]
pub fn validate_event_amount(cents: i64) -> ValidationResult<Money> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }

    if cents > MAX_CASH_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "amount".to_string(),
            min: 1,
            max: MAX_CASH_AMOUNT_CENTS,
        });
    }

    Ok(Money::from_cents(cents))
}

/// Validates a counted quantity for one denomination.
///
/// ```text
/// count < 0                        → Negative
/// count > MAX_DENOMINATION_COUNT   → OutOfRange
/// otherwise                        → Ok(count as u32)
/// ```
pub fn validate_denomination_count(denomination: Denomination, count: i64) -> ValidationResult<u32> {
    if count < 0 {
        return Err(ValidationError::Negative {
            field: format!("count of {}", denomination),
        });
    }

    if count > MAX_DENOMINATION_COUNT {
        return Err(ValidationError::OutOfRange {
            field: format!("count of {}", denomination),
            min: 0,
            max: MAX_DENOMINATION_COUNT,
        });
    }

    // MAX_DENOMINATION_COUNT fits in u32
    Ok(count as u32)
}

// =============================================================================
// Query Validators
// =============================================================================

/// Validates paging parameters against the configured maximum page size.
pub fn validate_pagination(pagination: Pagination, max_limit: u32) -> ValidationResult<Pagination> {
    if pagination.limit == 0 || pagination.limit > max_limit {
        return Err(ValidationError::OutOfRange {
            field: "limit".to_string(),
            min: 1,
            max: i64::from(max_limit),
        });
    }

    Ok(pagination)
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a session id (UUID).
///
/// ## Example
/// ```rust
/// use till_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "session_id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id.trim()).map_err(|_| ValidationError::InvalidFormat {
        field: "session_id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier() {
        assert_eq!(validate_identifier("branch_id", "north").unwrap(), "north");
        assert_eq!(validate_identifier("branch_id", "  BR-01 ").unwrap(), "BR-01");

        assert!(validate_identifier("branch_id", "").is_err());
        assert!(validate_identifier("branch_id", "   ").is_err());
        assert!(validate_identifier("branch_id", "a\tb").is_err());
        assert!(validate_identifier("branch_id", &"x".repeat(65)).is_err());
        assert!(validate_identifier("branch_id", &"x".repeat(64)).is_ok());
    }

    #[test]
    fn test_validate_notes() {
        assert_eq!(validate_notes("notes", None).unwrap(), None);
        assert_eq!(validate_notes("notes", Some("   ")).unwrap(), None);
        assert_eq!(
            validate_notes("notes", Some(" float from safe ")).unwrap(),
            Some("float from safe".to_string())
        );

        let err = validate_notes("closing_notes", Some(&"n".repeat(501))).unwrap_err();
        assert!(matches!(err, ValidationError::TooLong { max: 500, .. }));
    }

    #[test]
    fn test_validate_reference() {
        assert_eq!(validate_reference(None).unwrap(), None);
        assert_eq!(validate_reference(Some("")).unwrap(), None);
        assert_eq!(
            validate_reference(Some("R-1001")).unwrap(),
            Some("R-1001".to_string())
        );
    }

    #[test]
    fn test_validate_opening_amount() {
        assert_eq!(validate_opening_amount(0).unwrap(), Money::zero());
        assert_eq!(validate_opening_amount(50_000).unwrap().cents(), 50_000);
        assert!(validate_opening_amount(MAX_CASH_AMOUNT_CENTS).is_ok());

        assert!(matches!(
            validate_opening_amount(-1),
            Err(ValidationError::Negative { .. })
        ));
        assert!(validate_opening_amount(MAX_CASH_AMOUNT_CENTS + 1).is_err());
    }

    #[test]
    fn test_validate_event_amount() {
        assert!(validate_event_amount(1).is_ok());
        assert!(validate_event_amount(0).is_err());
        assert!(validate_event_amount(-500).is_err());
        assert!(validate_event_amount(MAX_CASH_AMOUNT_CENTS + 1).is_err());
    }

    #[test]
    fn test_validate_denomination_count() {
        assert_eq!(validate_denomination_count(Denomination::Bill20, 0).unwrap(), 0);
        assert_eq!(validate_denomination_count(Denomination::Bill20, 7).unwrap(), 7);
        assert!(validate_denomination_count(Denomination::Bill20, -1).is_err());
        assert!(
            validate_denomination_count(Denomination::Coin1, MAX_DENOMINATION_COUNT + 1).is_err()
        );
    }

    #[test]
    fn test_validate_pagination() {
        assert!(validate_pagination(Pagination::new(0, 50), 200).is_ok());
        assert!(validate_pagination(Pagination::new(10, 200), 200).is_ok());
        assert!(validate_pagination(Pagination::new(0, 0), 200).is_err());
        assert!(validate_pagination(Pagination::new(0, 201), 200).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("123").is_err());
    }
}
