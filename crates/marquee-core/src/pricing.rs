//! # Pricing Calculator
//!
//! Derives the charge for a reservation. Pure: no I/O, no clock, no
//! database. The reservation transaction feeds it live prices and stores
//! what it returns.
//!
//! ## Formula
//! ```text
//! total = base_price × seat_count + Σ (snack unit_price × quantity)
//! ```
//!
//! Seat pricing is flat per showtime. Every multiplication and addition is
//! checked, so an absurd order fails with `AmountOverflow` instead of
//! wrapping.
//!
//! ## Example
//! ```rust
//! use marquee_core::money::Money;
//! use marquee_core::pricing::{price_order, SnackLineInput};
//!
//! let soda = SnackLineInput {
//!     snack_id: "soda".to_string(),
//!     name: "Medium Soda".to_string(),
//!     unit_price: Money::from_cents(400),
//!     quantity: 2,
//! };
//!
//! let breakdown = price_order(Money::from_cents(1200), 2, &[soda]).unwrap();
//! assert_eq!(breakdown.seats_subtotal.cents(), 2400);
//! assert_eq!(breakdown.snacks_subtotal.cents(), 800);
//! assert_eq!(breakdown.total.cents(), 3200);
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;

/// One requested snack line, priced at the current unit price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnackLineInput {
    pub snack_id: String,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
}

/// A priced snack line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SnackLinePrice {
    pub snack_id: String,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub subtotal: Money,
}

/// Full price breakdown for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PriceBreakdown {
    pub per_seat_price: Money,
    pub seat_count: i64,
    pub seats_subtotal: Money,
    pub snack_lines: Vec<SnackLinePrice>,
    pub snacks_subtotal: Money,
    pub total: Money,
}

/// Prices an order.
///
/// ## Errors
/// - `Validation` if the base price or a unit price is negative, the seat
///   count is negative, or a snack quantity is not positive
/// - `AmountOverflow` if any intermediate value leaves the i64 range
pub fn price_order(
    base_price: Money,
    seat_count: i64,
    snack_lines: &[SnackLineInput],
) -> CoreResult<PriceBreakdown> {
    if base_price.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "base_price".to_string(),
            min: 0,
            max: i64::MAX,
        }
        .into());
    }
    if seat_count < 0 {
        return Err(ValidationError::OutOfRange {
            field: "seat_count".to_string(),
            min: 0,
            max: i64::MAX,
        }
        .into());
    }

    let seats_subtotal = base_price
        .checked_mul_quantity(seat_count)
        .ok_or_else(|| CoreError::overflow("seats subtotal"))?;

    let mut lines = Vec::with_capacity(snack_lines.len());
    let mut snacks_subtotal = Money::zero();

    for line in snack_lines {
        if line.quantity <= 0 {
            return Err(ValidationError::MustBePositive {
                field: format!("quantity for {}", line.name),
            }
            .into());
        }
        if line.unit_price.is_negative() {
            return Err(ValidationError::OutOfRange {
                field: format!("price for {}", line.name),
                min: 0,
                max: i64::MAX,
            }
            .into());
        }

        let subtotal = line
            .unit_price
            .checked_mul_quantity(line.quantity)
            .ok_or_else(|| CoreError::overflow(format!("subtotal for {}", line.name)))?;
        snacks_subtotal = snacks_subtotal
            .checked_add(subtotal)
            .ok_or_else(|| CoreError::overflow("snacks subtotal"))?;

        lines.push(SnackLinePrice {
            snack_id: line.snack_id.clone(),
            name: line.name.clone(),
            unit_price: line.unit_price,
            quantity: line.quantity,
            subtotal,
        });
    }

    let total = seats_subtotal
        .checked_add(snacks_subtotal)
        .ok_or_else(|| CoreError::overflow("order total"))?;

    Ok(PriceBreakdown {
        per_seat_price: base_price,
        seat_count,
        seats_subtotal,
        snack_lines: lines,
        snacks_subtotal,
        total,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(name: &str, price: &str, quantity: i64) -> SnackLineInput {
        SnackLineInput {
            snack_id: name.to_lowercase().replace(' ', "-"),
            name: name.to_string(),
            unit_price: Money::parse_decimal(price).unwrap(),
            quantity,
        }
    }

    #[test]
    fn test_seats_only() {
        let breakdown = price_order(Money::from_cents(1200), 1, &[]).unwrap();
        assert_eq!(breakdown.total, Money::from_cents(1200));
        assert!(breakdown.snack_lines.is_empty());
        assert!(breakdown.snacks_subtotal.is_zero());
    }

    #[test]
    fn test_two_seats_two_sodas_is_32_dollars() {
        let breakdown =
            price_order(Money::from_cents(1200), 2, &[line("Medium Soda", "4.00", 2)]).unwrap();
        assert_eq!(breakdown.total.to_string(), "$32.00");
    }

    #[test]
    fn test_popcorn_quantity_three_is_exact() {
        let breakdown =
            price_order(Money::zero(), 0, &[line("Large Popcorn", "8.50", 3)]).unwrap();
        assert_eq!(breakdown.snack_lines[0].subtotal.cents(), 2550);
        assert_eq!(breakdown.total.cents(), 2550);
    }

    #[test]
    fn test_mixed_lines_sum_exactly() {
        let breakdown = price_order(
            Money::parse_decimal("12.00").unwrap(),
            3,
            &[
                line("Large Popcorn", "8.50", 3),
                line("Medium Soda", "4.00", 2),
                line("Chocolate Candy", "4.50", 1),
            ],
        )
        .unwrap();

        assert_eq!(breakdown.seats_subtotal.cents(), 3600);
        assert_eq!(breakdown.snacks_subtotal.cents(), 2550 + 800 + 450);
        assert_eq!(breakdown.total.cents(), 3600 + 3800);
    }

    #[test]
    fn test_rejects_non_positive_quantity() {
        let err = price_order(Money::from_cents(1200), 1, &[line("Medium Soda", "4.00", 0)])
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_rejects_negative_base_price() {
        assert!(price_order(Money::from_cents(-1), 1, &[]).is_err());
    }

    #[test]
    fn test_overflow_is_reported() {
        let err = price_order(Money::from_cents(i64::MAX / 2), 3, &[]).unwrap_err();
        assert!(matches!(err, CoreError::AmountOverflow { .. }));

        let err = price_order(
            Money::zero(),
            0,
            &[
                SnackLineInput {
                    snack_id: "a".to_string(),
                    name: "a".to_string(),
                    unit_price: Money::from_cents(i64::MAX),
                    quantity: 1,
                },
                SnackLineInput {
                    snack_id: "b".to_string(),
                    name: "b".to_string(),
                    unit_price: Money::from_cents(1),
                    quantity: 1,
                },
            ],
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::AmountOverflow { .. }));
    }
}
