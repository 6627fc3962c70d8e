//! # Reservation Repository
//!
//! Read access to reservations and everything they own, plus the row-level
//! writes the reservation transaction is built from.
//!
//! ## Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  reservations                                                           │
//! │   ├── reservation_seats  (one per seat; active while released_at NULL) │
//! │   ├── tickets            (one per reservation_seat)                    │
//! │   └── snack_orders       (one per snack line, price frozen)            │
//! │                                                                         │
//! │  All rows are written in the same transaction as their reservation.    │
//! │  Public methods here only read.                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use ts_rs::TS;

use crate::error::DbResult;
use marquee_core::{
    Reservation, ReservationSeat, ReservationStatus, SnackOrder, Ticket, TicketStatus,
};

/// A ticket with the context a customer needs to find their seat.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, TS)]
#[ts(export)]
pub struct TicketSummary {
    pub ticket_number: String,
    pub status: TicketStatus,
    pub reservation_id: String,
    pub showtime_id: String,
    pub movie_title: String,
    #[ts(as = "String")]
    pub show_date: NaiveDate,
    #[ts(as = "String")]
    pub show_time: NaiveTime,
    pub screen_number: i64,
    pub row_letter: String,
    pub seat_number: i64,
}

/// Repository for reservation reads.
#[derive(Debug, Clone)]
pub struct ReservationRepository {
    pool: SqlitePool,
}

impl ReservationRepository {
    /// Creates a new ReservationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReservationRepository { pool }
    }

    /// Gets a reservation by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Reservation>> {
        fetch_reservation(&self.pool, id).await
    }

    /// Reservations for a showtime, oldest first.
    pub async fn list_for_showtime(&self, showtime_id: &str) -> DbResult<Vec<Reservation>> {
        let reservations = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT id, showtime_id, customer_id, total_amount_cents, status,
                   payment_method, created_at, updated_at
            FROM reservations
            WHERE showtime_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(showtime_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(reservations)
    }

    /// Seat bindings of a reservation, released ones included.
    pub async fn seats_for_reservation(&self, reservation_id: &str) -> DbResult<Vec<ReservationSeat>> {
        let seats = sqlx::query_as::<_, ReservationSeat>(
            r#"
            SELECT rs.id, rs.reservation_id, rs.showtime_id, rs.seat_id,
                   rs.final_price_cents, rs.released_at
            FROM reservation_seats rs
            JOIN seats s ON s.id = rs.seat_id
            WHERE rs.reservation_id = ?1
            ORDER BY s.row_letter, s.seat_number
            "#,
        )
        .bind(reservation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(seats)
    }

    /// Tickets of a reservation, in seat order.
    pub async fn tickets_for_reservation(&self, reservation_id: &str) -> DbResult<Vec<Ticket>> {
        let tickets = sqlx::query_as::<_, Ticket>(
            r#"
            SELECT t.id, t.reservation_id, t.seat_id, t.ticket_number, t.status, t.created_at
            FROM tickets t
            JOIN seats s ON s.id = t.seat_id
            WHERE t.reservation_id = ?1
            ORDER BY s.row_letter, s.seat_number
            "#,
        )
        .bind(reservation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tickets)
    }

    /// Snack lines of a reservation.
    pub async fn snack_orders_for_reservation(
        &self,
        reservation_id: &str,
    ) -> DbResult<Vec<SnackOrder>> {
        fetch_snack_orders(&self.pool, reservation_id).await
    }

    /// Looks up a ticket by its printed number.
    pub async fn get_ticket_by_number(&self, ticket_number: &str) -> DbResult<Option<Ticket>> {
        let ticket = sqlx::query_as::<_, Ticket>(
            r#"
            SELECT id, reservation_id, seat_id, ticket_number, status, created_at
            FROM tickets
            WHERE ticket_number = ?1
            "#,
        )
        .bind(ticket_number.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(ticket)
    }

    /// Every ticket bought under an email, most recent showtime first.
    pub async fn tickets_for_customer(&self, email: &str) -> DbResult<Vec<TicketSummary>> {
        let tickets = sqlx::query_as::<_, TicketSummary>(
            r#"
            SELECT
                t.ticket_number,
                t.status,
                r.id            AS reservation_id,
                st.id           AS showtime_id,
                m.title         AS movie_title,
                st.show_date,
                st.show_time,
                sc.number       AS screen_number,
                s.row_letter,
                s.seat_number
            FROM tickets t
            JOIN reservations r ON r.id = t.reservation_id
            JOIN customers c    ON c.id = r.customer_id
            JOIN showtimes st   ON st.id = r.showtime_id
            JOIN movies m       ON m.id = st.movie_id
            JOIN screens sc     ON sc.id = st.screen_id
            JOIN seats s        ON s.id = t.seat_id
            WHERE c.email = ?1
            ORDER BY st.show_date DESC, st.show_time DESC, s.row_letter, s.seat_number
            "#,
        )
        .bind(email.trim().to_lowercase())
        .fetch_all(&self.pool)
        .await?;

        Ok(tickets)
    }

    /// Number of active seat bindings for a showtime.
    pub async fn active_binding_count(&self, showtime_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM reservation_seats
            WHERE showtime_id = ?1 AND released_at IS NULL
            "#,
        )
        .bind(showtime_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

// =============================================================================
// Shared Queries
// =============================================================================

pub(crate) async fn fetch_reservation<'c>(
    executor: impl SqliteExecutor<'c>,
    id: &str,
) -> DbResult<Option<Reservation>> {
    let reservation = sqlx::query_as::<_, Reservation>(
        r#"
        SELECT id, showtime_id, customer_id, total_amount_cents, status,
               payment_method, created_at, updated_at
        FROM reservations
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(reservation)
}

pub(crate) async fn fetch_snack_orders<'c>(
    executor: impl SqliteExecutor<'c>,
    reservation_id: &str,
) -> DbResult<Vec<SnackOrder>> {
    let orders = sqlx::query_as::<_, SnackOrder>(
        r#"
        SELECT id, reservation_id, snack_id, quantity, unit_price_cents, subtotal_cents
        FROM snack_orders
        WHERE reservation_id = ?1
        ORDER BY snack_id
        "#,
    )
    .bind(reservation_id)
    .fetch_all(executor)
    .await?;

    Ok(orders)
}

/// Seat ids actively bound for a showtime.
pub(crate) async fn bound_seat_ids<'c>(
    executor: impl SqliteExecutor<'c>,
    showtime_id: &str,
) -> DbResult<Vec<String>> {
    let ids: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT seat_id FROM reservation_seats
        WHERE showtime_id = ?1 AND released_at IS NULL
        "#,
    )
    .bind(showtime_id)
    .fetch_all(executor)
    .await?;

    Ok(ids)
}

pub(crate) async fn insert_reservation(
    conn: &mut SqliteConnection,
    reservation: &Reservation,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO reservations (
            id, showtime_id, customer_id, total_amount_cents, status,
            payment_method, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&reservation.id)
    .bind(&reservation.showtime_id)
    .bind(&reservation.customer_id)
    .bind(reservation.total_amount_cents)
    .bind(reservation.status)
    .bind(&reservation.payment_method)
    .bind(reservation.created_at)
    .bind(reservation.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Inserts a seat binding. A second active binding for the same
/// (showtime, seat) fails with a unique violation on `reservation_seats`.
pub(crate) async fn insert_binding(
    conn: &mut SqliteConnection,
    binding: &ReservationSeat,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO reservation_seats (
            id, reservation_id, showtime_id, seat_id, final_price_cents, released_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&binding.id)
    .bind(&binding.reservation_id)
    .bind(&binding.showtime_id)
    .bind(&binding.seat_id)
    .bind(binding.final_price_cents)
    .bind(binding.released_at)
    .execute(conn)
    .await?;

    Ok(())
}

pub(crate) async fn insert_snack_order(
    conn: &mut SqliteConnection,
    order: &SnackOrder,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO snack_orders (
            id, reservation_id, snack_id, quantity, unit_price_cents, subtotal_cents
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&order.id)
    .bind(&order.reservation_id)
    .bind(&order.snack_id)
    .bind(order.quantity)
    .bind(order.unit_price_cents)
    .bind(order.subtotal_cents)
    .execute(conn)
    .await?;

    Ok(())
}

/// Moves a reservation from `from` to `to`. Returns `false` if it wasn't
/// in `from`.
pub(crate) async fn transition_status(
    conn: &mut SqliteConnection,
    id: &str,
    from: ReservationStatus,
    to: ReservationStatus,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    let result = sqlx::query(
        "UPDATE reservations SET status = ?3, updated_at = ?4 WHERE id = ?1 AND status = ?2",
    )
    .bind(id)
    .bind(from)
    .bind(to)
    .bind(now)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Releases a reservation's active bindings. Returns how many were released.
pub(crate) async fn release_bindings(
    conn: &mut SqliteConnection,
    reservation_id: &str,
    now: DateTime<Utc>,
) -> DbResult<u64> {
    let result = sqlx::query(
        r#"
        UPDATE reservation_seats SET released_at = ?2
        WHERE reservation_id = ?1 AND released_at IS NULL
        "#,
    )
    .bind(reservation_id)
    .bind(now)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

/// Sets every ticket of a reservation that is currently `from` to `to`.
pub(crate) async fn update_ticket_status(
    conn: &mut SqliteConnection,
    reservation_id: &str,
    from: TicketStatus,
    to: TicketStatus,
) -> DbResult<u64> {
    let result = sqlx::query(
        "UPDATE tickets SET status = ?3 WHERE reservation_id = ?1 AND status = ?2",
    )
    .bind(reservation_id)
    .bind(from)
    .bind(to)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

// =============================================================================
// Unit Tests
// =============================================================================
