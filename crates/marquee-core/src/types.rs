//! # Domain Types
//!
//! Core domain types used throughout Marquee Kiosk.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Reference data (long-lived, shared)                                   │
//! │  ┌───────────┐  ┌───────────┐  ┌───────────────┐  ┌───────────┐        │
//! │  │  Movie    │  │  Screen   │──│     Seat      │  │   Snack   │        │
//! │  └─────┬─────┘  └─────┬─────┘  │ row + number  │  │  stock    │        │
//! │        └──────┬───────┘        └───────────────┘  └───────────┘        │
//! │         ┌─────▼──────┐                                                 │
//! │         │  Showtime  │  base_price_cents, available_seats (cached)     │
//! │         └─────┬──────┘                                                 │
//! │               │                                                         │
//! │  Unit of sale (owned by the Reservation)                               │
//! │         ┌─────▼───────┐                                                │
//! │         │ Reservation │── ReservationSeat ── Ticket                    │
//! │         │             │── SnackOrder                                   │
//! │         └─────────────┘                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where one exists: ticket number, seat label (`A1`),
//!   customer email

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Catalog
// =============================================================================

/// A film in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Movie {
    pub id: String,
    pub title: String,
    pub genre: Option<String>,
    /// Running time in minutes.
    pub duration_minutes: Option<i64>,
    pub is_active: bool,
}

/// An auditorium. Seats belong to exactly one screen.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Screen {
    pub id: String,
    /// Public screen number ("Screen 1"), unique in the venue.
    pub number: i64,
    pub capacity: Option<i64>,
    /// IMAX, Standard, VIP...
    pub screen_type: Option<String>,
}

/// A movie + screen + date + time slot.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Showtime {
    pub id: String,
    pub movie_id: String,
    pub screen_id: String,
    #[ts(as = "String")]
    pub show_date: NaiveDate,
    #[ts(as = "String")]
    pub show_time: NaiveTime,
    /// Flat per-seat price in cents.
    pub base_price_cents: i64,
    /// Cached count of unreserved seats. Maintained by the reservation
    /// transaction and reconciled against reservation bindings.
    pub available_seats: i64,
}

impl Showtime {
    /// Returns the per-seat price as Money.
    #[inline]
    pub fn base_price(&self) -> Money {
        Money::from_cents(self.base_price_cents)
    }
}

// =============================================================================
// Seats
// =============================================================================

/// Kind of seat. Informational; pricing is flat per showtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SeatType {
    #[default]
    Standard,
    Vip,
    Accessible,
}

/// A physical seat, identified within its screen by (row, number).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Seat {
    pub id: String,
    pub screen_id: String,
    pub row_letter: String,
    pub seat_number: i64,
    pub seat_type: SeatType,
    /// Optional surcharge/discount in cents, kept as reference data.
    pub price_modifier_cents: Option<i64>,
}

impl Seat {
    /// Human-facing label, e.g. `A1`.
    pub fn label(&self) -> SeatLabel {
        SeatLabel {
            seat_id: self.id.clone(),
            row_letter: self.row_letter.clone(),
            seat_number: self.seat_number,
        }
    }
}

/// A seat identity as shown to the customer, used in conflict reports and
/// receipts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SeatLabel {
    pub seat_id: String,
    pub row_letter: String,
    pub seat_number: i64,
}

impl fmt::Display for SeatLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row_letter, self.seat_number)
    }
}

/// A seat paired with its availability for one showtime.
///
/// Returned by the availability resolver instead of flagging the `Seat`
/// record itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SeatAvailability {
    pub seat: Seat,
    pub is_available: bool,
}

/// One row of a rendered seat map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SeatRow {
    pub row_letter: String,
    pub seats: Vec<SeatAvailability>,
}

/// Orders seats by row letter (lexical), then seat number (numeric).
///
/// `A2` sorts before `A10`, and `B1` after both.
pub fn seat_order(a: &Seat, b: &Seat) -> std::cmp::Ordering {
    a.row_letter
        .cmp(&b.row_letter)
        .then(a.seat_number.cmp(&b.seat_number))
}

/// Groups an already-ordered availability sequence into rows.
pub fn group_into_rows(seats: Vec<SeatAvailability>) -> Vec<SeatRow> {
    let mut rows: Vec<SeatRow> = Vec::new();
    for entry in seats {
        match rows.last_mut() {
            Some(row) if row.row_letter == entry.seat.row_letter => row.seats.push(entry),
            _ => rows.push(SeatRow {
                row_letter: entry.seat.row_letter.clone(),
                seats: vec![entry],
            }),
        }
    }
    rows
}

// =============================================================================
// Snacks
// =============================================================================

/// A stock-tracked add-on item.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Snack {
    pub id: String,
    pub name: String,
    /// popcorn, drinks, candy...
    pub category: Option<String>,
    pub price_cents: i64,
    /// Never negative (CHECK constraint in the schema).
    pub stock_quantity: i64,
    /// Restock threshold for the low-stock report.
    pub min_stock_level: i64,
    pub is_available: bool,
}

impl Snack {
    /// Returns the unit price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks whether `quantity` units can be sold right now.
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.is_available && quantity <= self.stock_quantity
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer label, looked up or created by email during reservation.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub email: String,
    pub phone: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Reservation
// =============================================================================

/// The status of a reservation.
///
/// ```text
///   confirmed ──► completed
///       │
///       └──────► cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    /// Paid for and holding its seats.
    #[default]
    Confirmed,
    /// Released; its seats are free again.
    Cancelled,
    /// The show has been attended. Seats stay taken.
    Completed,
}

impl ReservationStatus {
    /// Whether a transition from `self` to `next` is allowed.
    pub fn can_transition_to(self, next: ReservationStatus) -> bool {
        matches!(
            (self, next),
            (ReservationStatus::Confirmed, ReservationStatus::Cancelled)
                | (ReservationStatus::Confirmed, ReservationStatus::Completed)
        )
    }

    /// Lowercase name as stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unit of sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Reservation {
    pub id: String,
    pub showtime_id: String,
    /// `None` for anonymous reservations.
    pub customer_id: Option<String>,
    pub total_amount_cents: i64,
    pub status: ReservationStatus,
    pub payment_method: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// Returns the total as Money.
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }
}

/// Binds a reservation to a seat for one showtime.
///
/// An unreleased binding is what makes a seat "taken".
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ReservationSeat {
    pub id: String,
    pub reservation_id: String,
    pub showtime_id: String,
    pub seat_id: String,
    pub final_price_cents: i64,
    /// Set when the owning reservation is cancelled.
    #[ts(as = "Option<String>")]
    pub released_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Ticket
// =============================================================================

/// Ticket lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    Active,
    Used,
    Cancelled,
}

/// Proof of purchase for one seat.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Ticket {
    pub id: String,
    pub reservation_id: String,
    pub seat_id: String,
    /// Globally unique, never reused.
    pub ticket_number: String,
    pub status: TicketStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Snack Order
// =============================================================================

/// A snack line item within a reservation.
/// Uses snapshot pattern to freeze the price at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SnackOrder {
    pub id: String,
    pub reservation_id: String,
    pub snack_id: String,
    pub quantity: i64,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    /// unit_price × quantity.
    pub subtotal_cents: i64,
}

impl SnackOrder {
    /// Returns the line subtotal as Money.
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn seat(row: &str, number: i64) -> Seat {
        Seat {
            id: format!("{row}{number}"),
            screen_id: "screen-1".to_string(),
            row_letter: row.to_string(),
            seat_number: number,
            seat_type: SeatType::Standard,
            price_modifier_cents: None,
        }
    }

    #[test]
    fn test_seat_order_is_lexical_row_numeric_seat() {
        let mut seats = vec![seat("B", 1), seat("A", 10), seat("A", 2), seat("A", 1)];
        seats.sort_by(seat_order);
        let labels: Vec<String> = seats.iter().map(|s| s.label().to_string()).collect();
        assert_eq!(labels, vec!["A1", "A2", "A10", "B1"]);
    }

    #[test]
    fn test_group_into_rows() {
        let seats = vec![seat("A", 1), seat("A", 2), seat("B", 1)]
            .into_iter()
            .map(|seat| SeatAvailability {
                seat,
                is_available: true,
            })
            .collect();

        let rows = group_into_rows(seats);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row_letter, "A");
        assert_eq!(rows[0].seats.len(), 2);
        assert_eq!(rows[1].seats.len(), 1);
    }

    #[test]
    fn test_reservation_status_transitions() {
        use ReservationStatus::*;

        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Completed));
        assert!(!Cancelled.can_transition_to(Confirmed));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Cancelled));
    }

    #[test]
    fn test_snack_can_sell() {
        let mut snack = Snack {
            id: "s".to_string(),
            name: "Medium Soda".to_string(),
            category: Some("drinks".to_string()),
            price_cents: 400,
            stock_quantity: 3,
            min_stock_level: 10,
            is_available: true,
        };
        assert!(snack.can_sell(3));
        assert!(!snack.can_sell(5));

        snack.is_available = false;
        assert!(!snack.can_sell(1));
    }

    #[test]
    fn test_defaults() {
        assert_eq!(ReservationStatus::default(), ReservationStatus::Confirmed);
        assert_eq!(TicketStatus::default(), TicketStatus::Active);
        assert_eq!(SeatType::default(), SeatType::Standard);
    }
}
