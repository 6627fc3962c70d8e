//! # Database Error Types
//!
//! Error types for database operations and for the reservation workflow.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError ← Adds context and categorization                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ReservationError ← What a booking caller sees                         │
//! │       │     (SeatConflict, InsufficientStock, ...)                     │
//! │       ▼                                                                 │
//! │  Kiosk displays a message / offers a retry                             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use marquee_core::{CoreError, SeatLabel, ValidationError};

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - `fetch_one` returns no rows
    /// - An UPDATE guarded by id matched nothing
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate ticket number
    /// - A second active binding for the same (showtime, seat)
    /// - Duplicate customer email or seat position
    ///
    /// `field` holds the `table.column` list SQLite reports.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (e.g. stock would go negative).
    #[error("Check constraint violated: {message}")]
    CheckViolation { message: String },

    /// The write lock could not be taken within the busy timeout.
    #[error("Database is busy: {0}")]
    Busy(String),

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// True when this is a unique violation on the given column
    /// (e.g. `"tickets.ticket_number"`).
    pub fn is_unique_violation_on(&self, column: &str) -> bool {
        matches!(self, DbError::UniqueViolation { field, .. } if field.contains(column))
    }

    /// Transient faults where running the same operation again may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DbError::Busy(_) | DbError::PoolExhausted | DbError::ConnectionFailed(_)
        )
    }
}

/// SQLite primary result codes for a held lock.
const SQLITE_BUSY: &str = "5";
const SQLITE_LOCKED: &str = "6";

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message/code for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite reports constraints as:
                //   "UNIQUE constraint failed: <table>.<column>[, ...]"
                //   "FOREIGN KEY constraint failed"
                //   "CHECK constraint failed: <expr>"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") {
                    DbError::CheckViolation {
                        message: msg.to_string(),
                    }
                } else if is_lock_error(db_err.code().as_deref(), msg) {
                    DbError::Busy(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            sqlx::Error::Io(io_err) => DbError::ConnectionFailed(io_err.to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

/// Extended codes keep the primary code in their low byte
/// (SQLITE_BUSY_SNAPSHOT = 517 = 5 | 2 << 8).
fn is_lock_error(code: Option<&str>, msg: &str) -> bool {
    let primary = code
        .and_then(|c| c.parse::<i32>().ok())
        .map(|c| (c & 0xff).to_string());

    matches!(primary.as_deref(), Some(SQLITE_BUSY) | Some(SQLITE_LOCKED))
        || msg.contains("database is locked")
        || msg.contains("database table is locked")
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Reservation Errors
// =============================================================================

/// Why a requested seat can't be bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    /// Actively bound for this showtime.
    AlreadyReserved,
    /// The seat exists but is in a different screen than the showtime.
    WrongScreen,
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictReason::AlreadyReserved => f.write_str("already reserved"),
            ConflictReason::WrongScreen => f.write_str("not in this screen"),
        }
    }
}

/// One offending seat in a [`ReservationError::SeatConflict`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeatConflict {
    pub seat: SeatLabel,
    pub reason: ConflictReason,
}

/// One offending snack line in a [`ReservationError::InsufficientStock`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockShortfall {
    pub snack_id: String,
    pub name: String,
    pub available: i64,
    pub requested: i64,
}

/// Errors returned by the reservation workflow.
///
/// Every failure rolls the whole transaction back; no partial
/// reservation, binding, ticket or stock change is ever observable.
#[derive(Debug, Error)]
pub enum ReservationError {
    /// Showtime, seat, snack or reservation doesn't exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// One or more requested seats can't be bound.
    #[error("Seats unavailable: {}", format_conflicts(.0))]
    SeatConflict(Vec<SeatConflict>),

    /// One or more snack lines exceed current stock.
    #[error("Insufficient stock: {}", format_shortfalls(.0))]
    InsufficientStock(Vec<StockShortfall>),

    /// A unique ticket number could not be produced.
    #[error("Could not issue a unique ticket number after {attempts} attempts")]
    TicketCollision { attempts: u32 },

    /// Malformed request.
    #[error("Invalid request: {0}")]
    Invalid(#[from] ValidationError),

    /// Status change not allowed from the current status.
    #[error("Reservation {id} is {from}, cannot become {to}")]
    InvalidTransition {
        id: String,
        from: marquee_core::ReservationStatus,
        to: marquee_core::ReservationStatus,
    },

    /// Underlying storage failure.
    #[error("Storage failure: {0}")]
    Storage(#[from] DbError),
}

impl ReservationError {
    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        ReservationError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Whether retrying the whole request from scratch may succeed.
    ///
    /// Conflicts and shortfalls are not retryable; the caller has to change
    /// the request.
    pub fn is_retryable(&self) -> bool {
        match self {
            ReservationError::TicketCollision { .. } => true,
            ReservationError::Storage(err) => err.is_transient(),
            _ => false,
        }
    }
}

impl From<sqlx::Error> for ReservationError {
    fn from(err: sqlx::Error) -> Self {
        ReservationError::Storage(err.into())
    }
}

impl From<CoreError> for ReservationError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(v) => ReservationError::Invalid(v),
            CoreError::AmountOverflow { context } => {
                ReservationError::Invalid(ValidationError::OutOfRange {
                    field: context,
                    min: 0,
                    max: i64::MAX,
                })
            }
            other => ReservationError::Invalid(ValidationError::InvalidFormat {
                field: "request".to_string(),
                reason: other.to_string(),
            }),
        }
    }
}

fn format_conflicts(conflicts: &[SeatConflict]) -> String {
    conflicts
        .iter()
        .map(|c| format!("{} ({})", c.seat, c.reason))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_shortfalls(shortfalls: &[StockShortfall]) -> String {
    shortfalls
        .iter()
        .map(|s| format!("{} (requested {}, available {})", s.name, s.requested, s.available))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for the reservation workflow.
pub type ReservationResult<T> = Result<T, ReservationError>;

// =============================================================================
// Unit Tests
// =============================================================================
