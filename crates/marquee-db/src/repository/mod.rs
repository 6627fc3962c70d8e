//! # Repository Module
//!
//! The Inventory Store: durable records of seats, showtimes, snack stock,
//! customers, reservations and tickets.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Caller                                                                 │
//! │       │  db.catalog().seats_for_screen(&screen_id)                     │
//! │       ▼                                                                 │
//! │  CatalogRepository / SnackRepository / CustomerRepository /            │
//! │  ReservationRepository          (each holds a cloned SqlitePool)       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Public methods run on the pool. The reservation transaction reuses    │
//! │  the same SQL through the `pub(crate)` helpers in each module, which   │
//! │  accept any executor, so reads and writes inside one reservation all   │
//! │  go through its transaction.                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Point lookups return `Ok(None)` when the record doesn't exist.
//!
//! ## Available Repositories
//!
//! - [`CatalogRepository`] - Movies, screens, seats, showtimes
//! - [`SnackRepository`] - Snack catalog and stock
//! - [`CustomerRepository`] - Customer labels
//! - [`ReservationRepository`] - Reservations, bindings, tickets, snack orders

pub mod catalog;
pub mod customer;
pub mod reservation;
pub mod snack;

pub use catalog::CatalogRepository;
pub use customer::CustomerRepository;
pub use reservation::{ReservationRepository, TicketSummary};
pub use snack::SnackRepository;
