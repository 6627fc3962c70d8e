//! # Ticket Issuer
//!
//! Creates the ticket row for each bound seat inside the reservation
//! transaction.
//!
//! ## Collision Handling
//! ```text
//!   attempt 1: INSERT tickets (..., 'TKT-20261019-3F9A1C7B2E4D')
//!              └── UNIQUE(ticket_number) violated
//!   attempt 2: INSERT tickets (..., 'TKT-20261019-91C04D7E2A15')  ✓
//!
//!   max_attempts exhausted → ReservationError::TicketCollision
//! ```
//!
//! SQLite aborts only the failing statement on a constraint violation, so
//! the retry happens inside the same transaction.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DbResult, ReservationError, ReservationResult};
use marquee_core::ticket::DEFAULT_TICKET_PREFIX;
use marquee_core::{Ticket, TicketNumber, TicketStatus};

/// Produces candidate ticket numbers.
pub trait TicketNumberSource: Send + Sync + fmt::Debug {
    /// Returns a candidate number for a ticket issued on `issued_on`.
    fn next_number(&self, issued_on: NaiveDate) -> TicketNumber;
}

/// Random numbers in the standard `PREFIX-YYYYMMDD-XXXXXXXXXXXX` format.
#[derive(Debug, Clone)]
pub struct RandomTicketNumbers {
    prefix: String,
}

impl RandomTicketNumbers {
    pub fn new(prefix: impl Into<String>) -> Self {
        RandomTicketNumbers {
            prefix: prefix.into(),
        }
    }
}

impl Default for RandomTicketNumbers {
    fn default() -> Self {
        RandomTicketNumbers::new(DEFAULT_TICKET_PREFIX)
    }
}

impl TicketNumberSource for RandomTicketNumbers {
    fn next_number(&self, issued_on: NaiveDate) -> TicketNumber {
        TicketNumber::generate(&self.prefix, issued_on)
    }
}

/// Inserts tickets, retrying with a fresh number on collision.
#[derive(Debug, Clone)]
pub struct TicketIssuer {
    source: Arc<dyn TicketNumberSource>,
    max_attempts: u32,
}

impl TicketIssuer {
    /// Issuer drawing random numbers with the given prefix.
    pub fn new(prefix: impl Into<String>, max_attempts: u32) -> Self {
        TicketIssuer::with_source(Arc::new(RandomTicketNumbers::new(prefix)), max_attempts)
    }

    /// Issuer drawing numbers from `source`.
    pub fn with_source(source: Arc<dyn TicketNumberSource>, max_attempts: u32) -> Self {
        TicketIssuer {
            source,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Issues an active ticket for `seat_id` under `reservation_id`.
    ///
    /// ## Errors
    /// - `TicketCollision` when every attempt hit an existing number
    /// - `Storage` for any other database failure
    pub async fn issue(
        &self,
        conn: &mut SqliteConnection,
        reservation_id: &str,
        seat_id: &str,
        now: DateTime<Utc>,
    ) -> ReservationResult<Ticket> {
        for attempt in 1..=self.max_attempts {
            let ticket = Ticket {
                id: Uuid::new_v4().to_string(),
                reservation_id: reservation_id.to_string(),
                seat_id: seat_id.to_string(),
                ticket_number: self.source.next_number(now.date_naive()).into_string(),
                status: TicketStatus::Active,
                created_at: now,
            };

            match insert_ticket(&mut *conn, &ticket).await {
                Ok(()) => {
                    debug!(
                        ticket_number = %ticket.ticket_number,
                        seat_id = %seat_id,
                        attempt,
                        "Ticket issued"
                    );
                    return Ok(ticket);
                }
                Err(err) if err.is_unique_violation_on("tickets.ticket_number") => {
                    warn!(
                        ticket_number = %ticket.ticket_number,
                        attempt,
                        max_attempts = self.max_attempts,
                        "Ticket number collision, retrying"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(ReservationError::TicketCollision {
            attempts: self.max_attempts,
        })
    }
}

async fn insert_ticket(conn: &mut SqliteConnection, ticket: &Ticket) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO tickets (id, reservation_id, seat_id, ticket_number, status, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&ticket.id)
    .bind(&ticket.reservation_id)
    .bind(&ticket.seat_id)
    .bind(&ticket.ticket_number)
    .bind(ticket.status)
    .bind(ticket.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Fixture, ScriptedTicketNumbers};

    fn number(suffix: &str) -> TicketNumber {
        TicketNumber::from_parts("TKT", NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(), suffix)
    }

    #[tokio::test]
    async fn test_random_numbers_issue_first_try() {
        let fx = Fixture::new().await;
        let confirmed = fx.reserve(&["A1"]).await;

        let ticket = &confirmed.tickets[0];
        assert!(TicketNumber::parse(&ticket.ticket_number).is_ok());
        assert_eq!(ticket.status, TicketStatus::Active);
    }

    #[tokio::test]
    async fn test_collision_is_retried_with_fresh_number() {
        let fx = Fixture::new().await;
        let existing = fx.reserve(&["A1"]).await.tickets[0].ticket_number.clone();
        let reservation_id = fx.reserve(&["A2"]).await.reservation.id;

        let taken = TicketNumber::parse(&existing).unwrap();
        let source = ScriptedTicketNumbers::new(vec![
            taken.clone(),
            taken,
            number("00000000000A"),
        ]);
        let issuer = TicketIssuer::with_source(Arc::new(source), 5);

        let mut conn = fx.db.pool().acquire().await.unwrap();
        let ticket = issuer
            .issue(&mut conn, &reservation_id, &fx.seat("A3").id, Utc::now())
            .await
            .unwrap();

        assert_eq!(ticket.ticket_number, "TKT-20261019-00000000000A");
    }

    #[tokio::test]
    async fn test_exhausted_attempts_report_collision() {
        let fx = Fixture::new().await;
        let confirmed = fx.reserve(&["A1"]).await;
        let taken = TicketNumber::parse(&confirmed.tickets[0].ticket_number).unwrap();

        let source = ScriptedTicketNumbers::repeating(taken);
        let issuer = TicketIssuer::with_source(Arc::new(source), 3);

        let mut conn = fx.db.pool().acquire().await.unwrap();
        let err = issuer
            .issue(&mut conn, &confirmed.reservation.id, &fx.seat("A2").id, Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(err, ReservationError::TicketCollision { attempts: 3 }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_zero_attempts_is_clamped() {
        assert_eq!(TicketIssuer::new("TKT", 0).max_attempts(), 1);
    }
}
