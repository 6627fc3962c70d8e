//! # Ticket Numbers
//!
//! Format and generation of the customer-facing ticket number.
//!
//! ## Format
//! ```text
//!   TKT-20261019-3F9A1C7B2E4D
//!   ─┬─ ───┬──── ─────┬──────
//!    │     │          └── 48 random bits (12 upper-hex digits)
//!    │     └── issue date (UTC)
//!    └── configurable prefix
//! ```
//!
//! Uniqueness is enforced by the database (`UNIQUE(ticket_number)`); this
//! module only makes collisions improbable. The issuer retries with a fresh
//! number when one happens.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

/// Default ticket number prefix.
pub const DEFAULT_TICKET_PREFIX: &str = "TKT";

/// Number of hex digits in the random suffix.
pub const SUFFIX_LEN: usize = 12;

/// A validated ticket number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TicketNumber(String);

impl TicketNumber {
    /// Generates a fresh ticket number for `issued_on`.
    ///
    /// The suffix is drawn from a UUID v4, so two calls on the same day
    /// differ with overwhelming probability.
    ///
    /// ## Example
    /// ```rust
    /// use chrono::NaiveDate;
    /// use marquee_core::ticket::TicketNumber;
    ///
    /// let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
    /// let number = TicketNumber::generate("TKT", date);
    /// assert!(number.as_str().starts_with("TKT-20261019-"));
    /// assert!(TicketNumber::parse(number.as_str()).is_ok());
    /// ```
    pub fn generate(prefix: &str, issued_on: NaiveDate) -> Self {
        let entropy = Uuid::new_v4().simple().to_string().to_uppercase();
        Self::from_parts(prefix, issued_on, &entropy[..SUFFIX_LEN])
    }

    /// Builds a ticket number from explicit parts. The suffix is used as given.
    pub fn from_parts(prefix: &str, issued_on: NaiveDate, suffix: &str) -> Self {
        TicketNumber(format!("{}-{}-{}", prefix, issued_on.format("%Y%m%d"), suffix))
    }

    /// Parses and validates a ticket number typed in at a kiosk or scanned
    /// from a barcode.
    pub fn parse(input: &str) -> CoreResult<Self> {
        let input = input.trim();
        let invalid = || CoreError::InvalidTicketNumber(input.to_string());

        let mut parts = input.rsplitn(3, '-');
        let suffix = parts.next().ok_or_else(invalid)?;
        let date = parts.next().ok_or_else(invalid)?;
        let prefix = parts.next().ok_or_else(invalid)?;

        if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid());
        }
        if date.len() != 8 || NaiveDate::parse_from_str(date, "%Y%m%d").is_err() {
            return Err(invalid());
        }
        if suffix.len() != SUFFIX_LEN
            || !suffix
                .chars()
                .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
        {
            return Err(invalid());
        }

        Ok(TicketNumber(input.to_string()))
    }

    /// Returns the number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the ticket number, returning the inner string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for TicketNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
