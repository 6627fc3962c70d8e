//! # Receipt
//!
//! The breakdown handed to the presentation layer after a reservation
//! commits: one line per seat, one per snack, subtotals and the grand total.
//!
//! Assembled from a `PriceBreakdown` plus the labels the database resolved,
//! so the receipt always shows exactly what was charged.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::pricing::PriceBreakdown;
use crate::types::SeatLabel;

/// A printed ticket line: seat, price and ticket number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReceiptSeatLine {
    pub seat: SeatLabel,
    pub price: Money,
    pub ticket_number: String,
}

/// A printed snack line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReceiptSnackLine {
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub subtotal: Money,
}

/// Everything needed to render a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Receipt {
    pub reservation_id: String,
    pub showtime_id: String,
    pub customer_email: Option<String>,
    pub seat_lines: Vec<ReceiptSeatLine>,
    pub snack_lines: Vec<ReceiptSnackLine>,
    pub seats_subtotal: Money,
    pub snacks_subtotal: Money,
    pub total: Money,
}

impl Receipt {
    /// Builds a receipt. `seats` pairs each seat label with its ticket
    /// number, in the order the tickets should be printed.
    pub fn new(
        reservation_id: impl Into<String>,
        showtime_id: impl Into<String>,
        customer_email: Option<String>,
        breakdown: &PriceBreakdown,
        seats: Vec<(SeatLabel, String)>,
    ) -> Self {
        let seat_lines = seats
            .into_iter()
            .map(|(seat, ticket_number)| ReceiptSeatLine {
                seat,
                price: breakdown.per_seat_price,
                ticket_number,
            })
            .collect();

        let snack_lines = breakdown
            .snack_lines
            .iter()
            .map(|line| ReceiptSnackLine {
                name: line.name.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                subtotal: line.subtotal,
            })
            .collect();

        Receipt {
            reservation_id: reservation_id.into(),
            showtime_id: showtime_id.into(),
            customer_email,
            seat_lines,
            snack_lines,
            seats_subtotal: breakdown.seats_subtotal,
            snacks_subtotal: breakdown.snacks_subtotal,
            total: breakdown.total,
        }
    }

    /// Plain-text rendering for thermal printers and logs.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for line in &self.seat_lines {
            out.push_str(&format!(
                "Seat {:<6} {:>10}  {}\n",
                line.seat.to_string(),
                line.price.to_string(),
                line.ticket_number
            ));
        }
        for line in &self.snack_lines {
            out.push_str(&format!(
                "{} x{} @ {} {:>10}\n",
                line.name, line.quantity, line.unit_price, line.subtotal
            ));
        }
        out.push_str(&format!("Tickets  {:>10}\n", self.seats_subtotal.to_string()));
        out.push_str(&format!("Snacks   {:>10}\n", self.snacks_subtotal.to_string()));
        out.push_str(&format!("TOTAL    {:>10}\n", self.total.to_string()));
        out
    }
}
