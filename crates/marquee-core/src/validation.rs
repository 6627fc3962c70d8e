//! # Validation Module
//!
//! Input validation for reservation requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (kiosk UI, API handler)                               │
//! │  └── Basic format checks, immediate feedback                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (before a transaction is opened)                 │
//! │  └── Shape of the request: seats, quantities, email                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Reservation transaction (live state)                         │
//! │  └── Seat still free? Stock still there?                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: Database (SQLite)                                            │
//! │  ├── UNIQUE active (showtime, seat) binding                            │
//! │  ├── CHECK stock_quantity >= 0                                         │
//! │  └── UNIQUE ticket_number                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use marquee_core::validation::{normalize_email, validate_snack_quantity};
//!
//! assert_eq!(normalize_email(Some("  Ana@Example.com ")).unwrap(), Some("ana@example.com".to_string()));
//! assert_eq!(normalize_email(Some("   ")).unwrap(), None);
//! assert!(validate_snack_quantity(0).is_err());
//! ```

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Seat Selection
// =============================================================================

/// Validates the number of requested seats against a limit.
///
/// ## Rules
/// - At least one seat
/// - At most `max_seats` (defaults to [`crate::MAX_SEATS_PER_RESERVATION`])
pub fn validate_seat_count(count: usize, max_seats: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::Required {
            field: "seat_ids".to_string(),
        });
    }

    if count > max_seats {
        return Err(ValidationError::OutOfRange {
            field: "seat count".to_string(),
            min: 1,
            max: max_seats as i64,
        });
    }

    Ok(())
}

/// Collapses duplicate seat ids, keeping the first occurrence's position.
///
/// ## Example
/// ```rust
/// use marquee_core::validation::dedupe_seat_ids;
///
/// let ids = vec!["b".to_string(), "a".to_string(), "b".to_string()];
/// assert_eq!(dedupe_seat_ids(&ids), vec!["b".to_string(), "a".to_string()]);
/// ```
pub fn dedupe_seat_ids(seat_ids: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::with_capacity(seat_ids.len());
    seat_ids
        .iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a snack quantity. It must be positive; the snack's stock is
/// the only upper bound and is checked against the database.
pub fn validate_snack_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a price in cents. Zero is allowed (complimentary items).
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// Customer
// =============================================================================

/// Normalizes an optional customer email.
///
/// ## Rules
/// - `None`, empty or whitespace-only → `Ok(None)` (anonymous reservation)
/// - Otherwise trimmed and lowercased, must contain exactly one `@` with a
///   non-empty local part and a dotted domain, max 254 characters
pub fn normalize_email(email: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(raw) = email else {
        return Ok(None);
    };
    let email = raw.trim();
    if email.is_empty() {
        return Ok(None);
    }

    if email.len() > 254 {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: 254,
        });
    }

    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "expected name@domain.tld".to_string(),
    };

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || email.chars().any(char::is_whitespace)
    {
        return Err(invalid());
    }

    Ok(Some(email.to_lowercase()))
}

// =============================================================================
// Unit Tests
// =============================================================================
