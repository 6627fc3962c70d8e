//! # marquee-db: Database Layer & Reservation Engine for Marquee Kiosk
//!
//! This crate owns everything that touches the kiosk's SQLite database:
//! the inventory store, seat availability, the reservation transaction and
//! ticket issuance.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Marquee Kiosk Data Flow                           │
//! │                                                                         │
//! │  Kiosk terminal (menu, seat map, checkout)                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   marquee-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────────┐  ┌────────────────┐  ┌──────────────────┐  │   │
//! │  │   │ Availability │  │  Reservation   │  │   Repositories   │  │   │
//! │  │   │   Resolver   │  │    Manager     │  │ catalog, snack,  │  │   │
//! │  │   │  (reads)     │  │ (BEGIN IMMED.) │  │ customer, resv.  │  │   │
//! │  │   └──────┬───────┘  └───────┬────────┘  └────────┬─────────┘  │   │
//! │  │          │          TicketIssuer                 │            │   │
//! │  │          └──────────────────┼────────────────────┘            │   │
//! │  │                             ▼                                  │   │
//! │  │   ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐    │   │
//! │  │   │   Database   │  │  Migrations  │  │   KioskConfig    │    │   │
//! │  │   │  (pool.rs)   │  │  (embedded)  │  │  (kiosk.toml)    │    │   │
//! │  │   └──────────────┘  └──────────────┘  └──────────────────┘    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  │   ~/.local/share/kiosk/kiosk.db                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and write transactions
//! - [`migrations`] - Embedded database migrations
//! - [`config`] - Layered kiosk configuration
//! - [`error`] - Storage and reservation error types
//! - [`repository`] - Inventory store repositories
//! - [`availability`] - Per-showtime seat availability
//! - [`ticket`] - Ticket issuance with collision retry
//! - [`booking`] - The reservation transaction manager
//! - [`sample`] - Sample venue for a fresh install
//!
//! ## Usage
//!
//! ```rust,ignore
//! use marquee_db::{BookingConfig, Database, DbConfig, ReservationRequest};
//!
//! let db = Database::new(DbConfig::new("kiosk.db")).await?;
//!
//! let seat_map = db.availability().seat_map(&showtime_id).await?;
//!
//! let request = ReservationRequest::new(&showtime_id)
//!     .seat(&seat_id)
//!     .snack(&popcorn_id, 1);
//! let confirmed = db.booking(BookingConfig::default()).reserve(request).await?;
//! println!("{}", confirmed.receipt.render_text());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod availability;
pub mod booking;
pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod sample;
pub mod ticket;

#[cfg(test)]
mod test_support;

// =============================================================================
// Re-exports
// =============================================================================

pub use availability::AvailabilityResolver;
pub use booking::{
    BookingConfig, ConfirmedReservation, CounterReconciliation, ReservationManager,
    ReservationRequest,
};
pub use config::{ConfigError, KioskConfig};
pub use error::{
    ConflictReason, DbError, DbResult, ReservationError, ReservationResult, SeatConflict,
    StockShortfall,
};
pub use pool::{Database, DbConfig};
pub use sample::{seed_sample_data, SampleVenue, SeedOutcome};
pub use ticket::{RandomTicketNumbers, TicketIssuer, TicketNumberSource};

// Repository re-exports for convenience
pub use repository::{
    CatalogRepository, CustomerRepository, ReservationRepository, SnackRepository, TicketSummary,
};
