//! # marquee-core: Pure Business Logic for Marquee Kiosk
//!
//! This crate contains the reservation engine's business rules as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Marquee Kiosk Architecture                        │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Callers (kiosk terminals, API handlers)            │   │
//! │  │      Browse ──► Seat map ──► Reserve ──► Receipt                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 marquee-db (Database Layer)                     │   │
//! │  │   availability resolver, reservation transactions, tickets      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ marquee-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐  ┌─────────┐  ┌─────────┐  ┌──────────┐         │   │
//! │  │   │  types  │  │  money  │  │ pricing │  │  ticket  │         │   │
//! │  │   │  Seat   │  │  Money  │  │  total  │  │  number  │         │   │
//! │  │   └─────────┘  └─────────┘  └─────────┘  └──────────┘         │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Showtime, Seat, Reservation, Ticket, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`pricing`] - Pricing Calculator
//! - [`receipt`] - Receipt breakdown for the presentation layer
//! - [`ticket`] - Ticket number format and generation
//! - [`error`] - Domain error types
//! - [`validation`] - Request validation
//!
//! ## Example Usage
//!
//! ```rust
//! use marquee_core::money::Money;
//! use marquee_core::pricing::price_order;
//!
//! // Two seats at $12.00, no snacks
//! let breakdown = price_order(Money::from_cents(1200), 2, &[]).unwrap();
//! assert_eq!(breakdown.total.to_string(), "$24.00");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod pricing;
pub mod receipt;
pub mod ticket;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use pricing::{price_order, PriceBreakdown, SnackLineInput, SnackLinePrice};
pub use receipt::Receipt;
pub use ticket::TicketNumber;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum seats in a single reservation unless configured otherwise.
///
/// ## Business Reason
/// Keeps one kiosk session from sweeping up a whole auditorium.
pub const MAX_SEATS_PER_RESERVATION: usize = 10;
