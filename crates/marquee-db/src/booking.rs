//! # Reservation Transaction Manager
//!
//! The unit of sale: seats, tickets, snack lines and stock changes are
//! committed together or not at all.
//!
//! ## Reservation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  reserve(request)                                                       │
//! │                                                                         │
//! │  1. VALIDATE SHAPE (no database)                                       │
//! │     └── seats non-empty & deduped, quantities > 0, email format        │
//! │                                                                         │
//! │  2. BEGIN IMMEDIATE  ← write lock taken before any read                │
//! │     ├── showtime exists?                                    NotFound    │
//! │     ├── seats exist? (ascending id)                         NotFound    │
//! │     ├── seats on this screen & unbound?                 SeatConflict    │
//! │     ├── snacks exist, on sale, enough stock?       InsufficientStock    │
//! │     ├── price_order()                                                  │
//! │     ├── customer find-or-create                                        │
//! │     ├── INSERT reservation (confirmed)                                 │
//! │     ├── per seat:  INSERT reservation_seat + ticket                    │
//! │     ├── per snack: INSERT snack_order, guarded stock decrement         │
//! │     └── counter −= seats, reconcile against bindings                   │
//! │                                                                         │
//! │  3. COMMIT          (any error above → ROLLBACK, nothing persisted)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every write path takes the SQLite write lock first, so two kiosks racing
//! for the same seat are serialized: the second one reads the first one's
//! binding and gets `SeatConflict`. The partial unique index on active
//! bindings and the stock CHECK constraint hold even if these checks were
//! bypassed.
//!
//! ## Status Lifecycle
//! ```text
//!   confirmed ──cancel()──► cancelled   (bindings released, stock returned)
//!       │
//!       └─────complete()──► completed   (tickets used, seats stay taken)
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::{debug, info, warn};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{
    ConflictReason, ReservationError, ReservationResult, SeatConflict, StockShortfall,
};
use crate::pool::begin_write;
use crate::repository::{catalog, customer, reservation, snack};
use crate::ticket::{TicketIssuer, TicketNumberSource};
use marquee_core::pricing::{price_order, SnackLineInput};
use marquee_core::ticket::DEFAULT_TICKET_PREFIX;
use marquee_core::validation::{
    dedupe_seat_ids, normalize_email, validate_seat_count, validate_snack_quantity,
};
use marquee_core::{
    Receipt, Reservation, ReservationSeat, ReservationStatus, Seat, SnackOrder, Ticket,
    TicketStatus, MAX_SEATS_PER_RESERVATION,
};

// =============================================================================
// Configuration
// =============================================================================

/// Reservation workflow settings.
#[derive(Debug, Clone)]
pub struct BookingConfig {
    /// Upper bound on distinct seats in one reservation.
    pub max_seats_per_reservation: usize,
    /// Ticket number prefix.
    pub ticket_prefix: String,
    /// Attempts at a unique ticket number before giving up.
    pub ticket_max_attempts: u32,
    /// Recorded on every reservation made through this manager.
    pub payment_method: Option<String>,
}

impl Default for BookingConfig {
    fn default() -> Self {
        BookingConfig {
            max_seats_per_reservation: MAX_SEATS_PER_RESERVATION,
            ticket_prefix: DEFAULT_TICKET_PREFIX.to_string(),
            ticket_max_attempts: 5,
            payment_method: None,
        }
    }
}

// =============================================================================
// Request / Response
// =============================================================================

/// What a kiosk asks for.
///
/// ## Example
/// ```rust,ignore
/// let request = ReservationRequest::new(&showtime.id)
///     .seat(&a1.id)
///     .seat(&a2.id)
///     .snack(&soda.id, 2)
///     .email("guest@cinema.example");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReservationRequest {
    pub showtime_id: String,
    /// Duplicates collapse; the first occurrence keeps its position.
    pub seat_ids: Vec<String>,
    /// Blank or absent means an anonymous reservation.
    #[serde(default)]
    pub customer_email: Option<String>,
    /// snack id → quantity.
    #[serde(default)]
    pub snacks: BTreeMap<String, i64>,
}

impl ReservationRequest {
    pub fn new(showtime_id: impl Into<String>) -> Self {
        ReservationRequest {
            showtime_id: showtime_id.into(),
            ..Default::default()
        }
    }

    pub fn seat(mut self, seat_id: impl Into<String>) -> Self {
        self.seat_ids.push(seat_id.into());
        self
    }

    pub fn seats<I, S>(mut self, seat_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.seat_ids.extend(seat_ids.into_iter().map(Into::into));
        self
    }

    /// Adds `quantity` of a snack; repeated calls for one snack add up.
    pub fn snack(mut self, snack_id: impl Into<String>, quantity: i64) -> Self {
        *self.snacks.entry(snack_id.into()).or_insert(0) += quantity;
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.customer_email = Some(email.into());
        self
    }
}

/// A committed reservation.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct ConfirmedReservation {
    pub reservation: Reservation,
    /// One per seat, in the order the seats were requested.
    pub tickets: Vec<Ticket>,
    pub receipt: Receipt,
}

/// Result of checking a showtime's cached counter against its bindings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterReconciliation {
    pub showtime_id: String,
    /// Cached value found.
    pub before: i64,
    /// Authoritative value, now stored.
    pub after: i64,
}

impl CounterReconciliation {
    pub fn drifted(&self) -> bool {
        self.before != self.after
    }
}

/// A request that passed shape validation.
struct ValidatedRequest {
    showtime_id: String,
    seat_ids: Vec<String>,
    customer_email: Option<String>,
    snacks: BTreeMap<String, i64>,
}

// =============================================================================
// Reservation Manager
// =============================================================================

/// Runs reservation, cancellation and completion transactions.
///
/// Cheap to clone. Holds no session state; every call takes its own pooled
/// connection and transaction.
#[derive(Debug, Clone)]
pub struct ReservationManager {
    pool: SqlitePool,
    config: BookingConfig,
    issuer: TicketIssuer,
}

impl ReservationManager {
    /// Creates a manager over `pool`.
    pub fn new(pool: SqlitePool, config: BookingConfig) -> Self {
        let issuer = TicketIssuer::new(config.ticket_prefix.clone(), config.ticket_max_attempts);
        ReservationManager {
            pool,
            config,
            issuer,
        }
    }

    /// Replaces the ticket number source.
    pub fn with_ticket_source(mut self, source: Arc<dyn TicketNumberSource>) -> Self {
        self.issuer = TicketIssuer::with_source(source, self.config.ticket_max_attempts);
        self
    }

    pub fn config(&self) -> &BookingConfig {
        &self.config
    }

    // =========================================================================
    // Reserve
    // =========================================================================

    /// Reserves seats (and optional snacks) for a showtime.
    ///
    /// ## Errors
    /// - `Invalid` - empty seat list, too many seats, bad quantity or email
    /// - `NotFound` - showtime, seat or snack doesn't exist (or snack is off sale)
    /// - `SeatConflict` - seats taken or on another screen, all listed
    /// - `InsufficientStock` - every snack line short on stock, all listed
    /// - `TicketCollision` - no unique ticket number could be produced
    /// - `Storage` - database failure
    ///
    /// On any error nothing is persisted.
    pub async fn reserve(
        &self,
        request: ReservationRequest,
    ) -> ReservationResult<ConfirmedReservation> {
        let request = self.validate(request)?;

        debug!(
            showtime_id = %request.showtime_id,
            seats = request.seat_ids.len(),
            snack_lines = request.snacks.len(),
            "Starting reservation"
        );

        let mut tx = begin_write(&self.pool).await?;
        let result = self.reserve_in(&mut *tx, &request).await;
        let confirmed = finish(tx, result, "reserve").await?;

        info!(
            reservation_id = %confirmed.reservation.id,
            showtime_id = %confirmed.reservation.showtime_id,
            seats = confirmed.tickets.len(),
            total_cents = confirmed.reservation.total_amount_cents,
            "Reservation confirmed"
        );

        Ok(confirmed)
    }

    fn validate(&self, request: ReservationRequest) -> ReservationResult<ValidatedRequest> {
        let seat_ids = dedupe_seat_ids(&request.seat_ids);
        validate_seat_count(seat_ids.len(), self.config.max_seats_per_reservation)?;

        for quantity in request.snacks.values() {
            validate_snack_quantity(*quantity)?;
        }

        let customer_email = normalize_email(request.customer_email.as_deref())?;

        Ok(ValidatedRequest {
            showtime_id: request.showtime_id,
            seat_ids,
            customer_email,
            snacks: request.snacks,
        })
    }

    async fn reserve_in(
        &self,
        conn: &mut SqliteConnection,
        request: &ValidatedRequest,
    ) -> ReservationResult<ConfirmedReservation> {
        let now = Utc::now();

        // ---------------------------------------------------------------------
        // Preconditions against live state
        // ---------------------------------------------------------------------

        let showtime = catalog::fetch_showtime(&mut *conn, &request.showtime_id)
            .await?
            .ok_or_else(|| ReservationError::not_found("Showtime", &request.showtime_id))?;

        let mut seats: BTreeMap<String, Seat> = BTreeMap::new();
        let mut ascending: Vec<&String> = request.seat_ids.iter().collect();
        ascending.sort();
        for seat_id in ascending {
            let seat = catalog::fetch_seat(&mut *conn, seat_id)
                .await?
                .ok_or_else(|| ReservationError::not_found("Seat", seat_id))?;
            seats.insert(seat_id.clone(), seat);
        }

        let bound: HashSet<String> = reservation::bound_seat_ids(&mut *conn, &showtime.id)
            .await?
            .into_iter()
            .collect();

        let conflicts: Vec<SeatConflict> = request
            .seat_ids
            .iter()
            .filter_map(|id| seats.get(id))
            .filter_map(|seat| {
                let reason = if seat.screen_id != showtime.screen_id {
                    ConflictReason::WrongScreen
                } else if bound.contains(&seat.id) {
                    ConflictReason::AlreadyReserved
                } else {
                    return None;
                };
                Some(SeatConflict {
                    seat: seat.label(),
                    reason,
                })
            })
            .collect();

        if !conflicts.is_empty() {
            return Err(ReservationError::SeatConflict(conflicts));
        }

        let mut snack_lines = Vec::with_capacity(request.snacks.len());
        let mut shortfalls = Vec::new();
        for (snack_id, &quantity) in &request.snacks {
            let snack = snack::fetch_snack(&mut *conn, snack_id)
                .await?
                .filter(|s| s.is_available)
                .ok_or_else(|| ReservationError::not_found("Snack", snack_id))?;

            if !snack.can_sell(quantity) {
                shortfalls.push(StockShortfall {
                    snack_id: snack.id.clone(),
                    name: snack.name.clone(),
                    available: snack.stock_quantity,
                    requested: quantity,
                });
                continue;
            }

            snack_lines.push(SnackLineInput {
                snack_id: snack.id.clone(),
                name: snack.name.clone(),
                unit_price: snack.price(),
                quantity,
            });
        }

        if !shortfalls.is_empty() {
            return Err(ReservationError::InsufficientStock(shortfalls));
        }

        let breakdown = price_order(showtime.base_price(), seats.len() as i64, &snack_lines)?;

        // ---------------------------------------------------------------------
        // Writes
        // ---------------------------------------------------------------------

        let customer = match &request.customer_email {
            Some(email) => Some(customer::find_or_create(&mut *conn, email, now).await?),
            None => None,
        };

        let new_reservation = Reservation {
            id: Uuid::new_v4().to_string(),
            showtime_id: showtime.id.clone(),
            customer_id: customer.as_ref().map(|c| c.id.clone()),
            total_amount_cents: breakdown.total.cents(),
            status: ReservationStatus::Confirmed,
            payment_method: self.config.payment_method.clone(),
            created_at: now,
            updated_at: now,
        };
        reservation::insert_reservation(&mut *conn, &new_reservation).await?;

        let mut tickets_by_seat: HashMap<String, Ticket> = HashMap::with_capacity(seats.len());
        for (seat_id, seat) in &seats {
            let binding = ReservationSeat {
                id: Uuid::new_v4().to_string(),
                reservation_id: new_reservation.id.clone(),
                showtime_id: showtime.id.clone(),
                seat_id: seat_id.clone(),
                final_price_cents: breakdown.per_seat_price.cents(),
                released_at: None,
            };

            if let Err(err) = reservation::insert_binding(&mut *conn, &binding).await {
                if err.is_unique_violation_on("reservation_seats.seat_id") {
                    return Err(ReservationError::SeatConflict(vec![SeatConflict {
                        seat: seat.label(),
                        reason: ConflictReason::AlreadyReserved,
                    }]));
                }
                return Err(err.into());
            }

            let ticket = self
                .issuer
                .issue(&mut *conn, &new_reservation.id, seat_id, now)
                .await?;
            tickets_by_seat.insert(seat_id.clone(), ticket);
        }

        for line in &breakdown.snack_lines {
            let order = SnackOrder {
                id: Uuid::new_v4().to_string(),
                reservation_id: new_reservation.id.clone(),
                snack_id: line.snack_id.clone(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price.cents(),
                subtotal_cents: line.subtotal.cents(),
            };
            reservation::insert_snack_order(&mut *conn, &order).await?;

            if !snack::take_stock(&mut *conn, &line.snack_id, line.quantity).await? {
                let available = snack::fetch_snack(&mut *conn, &line.snack_id)
                    .await?
                    .map(|s| s.stock_quantity)
                    .unwrap_or(0);
                return Err(ReservationError::InsufficientStock(vec![StockShortfall {
                    snack_id: line.snack_id.clone(),
                    name: line.name.clone(),
                    available,
                    requested: line.quantity,
                }]));
            }
        }

        catalog::adjust_available(&mut *conn, &showtime.id, -(seats.len() as i64)).await?;
        reconcile_in(&mut *conn, &showtime.id).await?;

        // ---------------------------------------------------------------------
        // Output, in request order
        // ---------------------------------------------------------------------

        let mut tickets = Vec::with_capacity(seats.len());
        let mut receipt_seats = Vec::with_capacity(seats.len());
        for seat_id in &request.seat_ids {
            if let (Some(seat), Some(ticket)) = (seats.get(seat_id), tickets_by_seat.remove(seat_id))
            {
                receipt_seats.push((seat.label(), ticket.ticket_number.clone()));
                tickets.push(ticket);
            }
        }

        let receipt = Receipt::new(
            &new_reservation.id,
            &showtime.id,
            customer.map(|c| c.email),
            &breakdown,
            receipt_seats,
        );

        Ok(ConfirmedReservation {
            reservation: new_reservation,
            tickets,
            receipt,
        })
    }

    // =========================================================================
    // Cancel / Complete
    // =========================================================================

    /// Cancels a confirmed reservation.
    ///
    /// Releases its seats, cancels its tickets, returns snack stock and
    /// brings the showtime counter back in line with the bindings.
    pub async fn cancel(&self, reservation_id: &str) -> ReservationResult<Reservation> {
        let mut tx = begin_write(&self.pool).await?;
        let result = self.cancel_in(&mut *tx, reservation_id).await;
        let cancelled = finish(tx, result, "cancel").await?;

        info!(reservation_id = %reservation_id, "Reservation cancelled");
        Ok(cancelled)
    }

    async fn cancel_in(
        &self,
        conn: &mut SqliteConnection,
        reservation_id: &str,
    ) -> ReservationResult<Reservation> {
        let now = Utc::now();
        let current = load_reservation(&mut *conn, reservation_id).await?;

        transition(&mut *conn, &current, ReservationStatus::Cancelled, now).await?;

        let released = reservation::release_bindings(&mut *conn, reservation_id, now).await?;
        reservation::update_ticket_status(
            &mut *conn,
            reservation_id,
            TicketStatus::Active,
            TicketStatus::Cancelled,
        )
        .await?;

        for order in reservation::fetch_snack_orders(&mut *conn, reservation_id).await? {
            snack::return_stock(&mut *conn, &order.snack_id, order.quantity).await?;
        }

        catalog::adjust_available(&mut *conn, &current.showtime_id, released as i64).await?;
        reconcile_in(&mut *conn, &current.showtime_id).await?;

        debug!(reservation_id = %reservation_id, released, "Seats released");

        load_reservation(&mut *conn, reservation_id).await
    }

    /// Marks a confirmed reservation as attended. Its tickets become used;
    /// its seats stay taken.
    pub async fn complete(&self, reservation_id: &str) -> ReservationResult<Reservation> {
        let mut tx = begin_write(&self.pool).await?;
        let result = self.complete_in(&mut *tx, reservation_id).await;
        let completed = finish(tx, result, "complete").await?;

        info!(reservation_id = %reservation_id, "Reservation completed");
        Ok(completed)
    }

    async fn complete_in(
        &self,
        conn: &mut SqliteConnection,
        reservation_id: &str,
    ) -> ReservationResult<Reservation> {
        let now = Utc::now();
        let current = load_reservation(&mut *conn, reservation_id).await?;

        transition(&mut *conn, &current, ReservationStatus::Completed, now).await?;
        reservation::update_ticket_status(
            &mut *conn,
            reservation_id,
            TicketStatus::Active,
            TicketStatus::Used,
        )
        .await?;

        load_reservation(&mut *conn, reservation_id).await
    }

    // =========================================================================
    // Counter Reconciliation
    // =========================================================================

    /// Checks one showtime's cached counter and overwrites it if it drifted.
    pub async fn reconcile_showtime(
        &self,
        showtime_id: &str,
    ) -> ReservationResult<CounterReconciliation> {
        let mut tx = begin_write(&self.pool).await?;
        let result = reconcile_in(&mut *tx, showtime_id).await;
        finish(tx, result, "reconcile").await
    }

    /// Reconciles every showtime in one transaction.
    pub async fn reconcile_all(&self) -> ReservationResult<Vec<CounterReconciliation>> {
        let mut tx = begin_write(&self.pool).await?;
        let result = reconcile_all_in(&mut *tx).await;
        let reports = finish(tx, result, "reconcile_all").await?;

        let drifted = reports.iter().filter(|r| r.drifted()).count();
        info!(showtimes = reports.len(), drifted, "Seat counters reconciled");

        Ok(reports)
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Commits on success, rolls back on failure.
async fn finish<T>(
    tx: Transaction<'static, Sqlite>,
    result: ReservationResult<T>,
    operation: &'static str,
) -> ReservationResult<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(operation, error = %rollback_err, "Rollback failed");
            }
            debug!(operation, error = %err, "Transaction rolled back");
            Err(err)
        }
    }
}

async fn load_reservation(
    conn: &mut SqliteConnection,
    reservation_id: &str,
) -> ReservationResult<Reservation> {
    reservation::fetch_reservation(conn, reservation_id)
        .await?
        .ok_or_else(|| ReservationError::not_found("Reservation", reservation_id))
}

async fn transition(
    conn: &mut SqliteConnection,
    current: &Reservation,
    to: ReservationStatus,
    now: DateTime<Utc>,
) -> ReservationResult<()> {
    let invalid = || ReservationError::InvalidTransition {
        id: current.id.clone(),
        from: current.status,
        to,
    };

    if !current.status.can_transition_to(to) {
        return Err(invalid());
    }

    if !reservation::transition_status(conn, &current.id, current.status, to, now).await? {
        return Err(invalid());
    }

    Ok(())
}

async fn reconcile_in(
    conn: &mut SqliteConnection,
    showtime_id: &str,
) -> ReservationResult<CounterReconciliation> {
    let before = catalog::fetch_showtime(&mut *conn, showtime_id)
        .await?
        .ok_or_else(|| ReservationError::not_found("Showtime", showtime_id))?
        .available_seats;

    let after = catalog::authoritative_available(&mut *conn, showtime_id)
        .await?
        .ok_or_else(|| ReservationError::not_found("Showtime", showtime_id))?;

    if before != after {
        warn!(
            showtime_id = %showtime_id,
            cached = before,
            actual = after,
            "Seat counter drift corrected"
        );
        catalog::set_available(&mut *conn, showtime_id, after).await?;
    }

    Ok(CounterReconciliation {
        showtime_id: showtime_id.to_string(),
        before,
        after,
    })
}

async fn reconcile_all_in(conn: &mut SqliteConnection) -> ReservationResult<Vec<CounterReconciliation>> {
    let ids = catalog::all_showtime_ids(&mut *conn).await?;
    let mut reports = Vec::with_capacity(ids.len());
    for id in ids {
        reports.push(reconcile_in(&mut *conn, &id).await?);
    }
    Ok(reports)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::test_support::{Fixture, ScriptedTicketNumbers, TempDatabase};
    use marquee_core::TicketNumber;

    // -------------------------------------------------------------------------
    // Scenarios
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_second_request_for_same_seat_conflicts() {
        let fx = Fixture::new().await;
        let booking = fx.booking();

        let first = booking.reserve(fx.request(&["A1"])).await.unwrap();
        assert_eq!(first.reservation.total_amount_cents, 1200);
        assert_eq!(first.tickets.len(), 1);
        assert_eq!(fx.counter(&fx.showtime.id).await, 49);

        let err = booking.reserve(fx.request(&["A1"])).await.unwrap_err();
        match err {
            ReservationError::SeatConflict(conflicts) => {
                assert_eq!(conflicts.len(), 1);
                assert_eq!(conflicts[0].seat.to_string(), "A1");
                assert_eq!(conflicts[0].reason, ConflictReason::AlreadyReserved);
            }
            other => panic!("expected SeatConflict, got {other:?}"),
        }

        assert_eq!(fx.counter(&fx.showtime.id).await, 49);
        assert_eq!(fx.count("reservations").await, 1);
        assert_eq!(fx.count("tickets").await, 1);
    }

    #[tokio::test]
    async fn test_two_seats_and_two_sodas_total_32() {
        let fx = Fixture::new().await;
        let request = fx.request(&["A1", "A2"]).snack(&fx.soda.id, 2);

        let confirmed = fx.booking().reserve(request).await.unwrap();

        assert_eq!(confirmed.reservation.total_amount_cents, 3200);
        assert_eq!(confirmed.reservation.status, ReservationStatus::Confirmed);
        assert_eq!(confirmed.tickets.len(), 2);
        assert_ne!(confirmed.tickets[0].ticket_number, confirmed.tickets[1].ticket_number);

        let receipt = &confirmed.receipt;
        assert_eq!(receipt.seats_subtotal.cents(), 2400);
        assert_eq!(receipt.snacks_subtotal.cents(), 800);
        assert_eq!(receipt.total.cents(), 3200);
        assert_eq!(receipt.seat_lines[0].ticket_number, confirmed.tickets[0].ticket_number);
        assert!(receipt.render_text().contains("$32.00"));

        let json = serde_json::to_value(&confirmed).unwrap();
        assert_eq!(json["reservation"]["status"], "confirmed");
        assert_eq!(json["receipt"]["total"], 3200);
        assert_eq!(json["tickets"].as_array().unwrap().len(), 2);

        let soda = fx.db.snacks().get_by_id(&fx.soda.id).await.unwrap().unwrap();
        assert_eq!(soda.stock_quantity, 98);
        assert_eq!(fx.counter(&fx.showtime.id).await, 48);

        let orders = fx
            .db
            .reservations()
            .snack_orders_for_reservation(&confirmed.reservation.id)
            .await
            .unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].unit_price_cents, 400);
        assert_eq!(orders[0].subtotal_cents, 800);
    }

    #[tokio::test]
    async fn test_insufficient_stock_binds_nothing() {
        let fx = Fixture::new().await;
        let nachos = fx.add_snack("Nachos", 650, 3).await;

        let err = fx
            .booking()
            .reserve(fx.request(&["A1"]).snack(&nachos.id, 5))
            .await
            .unwrap_err();

        match err {
            ReservationError::InsufficientStock(shortfalls) => {
                assert_eq!(
                    shortfalls,
                    vec![StockShortfall {
                        snack_id: nachos.id.clone(),
                        name: "Nachos".to_string(),
                        available: 3,
                        requested: 5,
                    }]
                );
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        assert_eq!(fx.count("reservations").await, 0);
        assert_eq!(fx.count("reservation_seats").await, 0);
        assert_eq!(fx.count("tickets").await, 0);
        assert_eq!(fx.count("snack_orders").await, 0);
        assert_eq!(fx.counter(&fx.showtime.id).await, 50);

        let nachos = fx.db.snacks().get_by_id(&nachos.id).await.unwrap().unwrap();
        assert_eq!(nachos.stock_quantity, 3);
        assert!(fx.is_available("A1").await);
    }

    #[tokio::test]
    async fn test_large_snack_quantity_is_bounded_by_stock() {
        let fx = Fixture::new().await;
        let nachos = fx.add_snack("Nachos", 650, 3).await;

        let err = fx
            .booking()
            .reserve(fx.request(&["A1"]).snack(&nachos.id, 60))
            .await
            .unwrap_err();
        match err {
            ReservationError::InsufficientStock(shortfalls) => {
                assert_eq!(shortfalls.len(), 1);
                assert_eq!(shortfalls[0].available, 3);
                assert_eq!(shortfalls[0].requested, 60);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        let confirmed = fx
            .booking()
            .reserve(fx.request(&["A1"]).snack(&fx.soda.id, 51))
            .await
            .unwrap();
        assert_eq!(confirmed.receipt.snacks_subtotal.cents(), 51 * 400);

        let soda = fx.db.snacks().get_by_id(&fx.soda.id).await.unwrap().unwrap();
        assert_eq!(soda.stock_quantity, 49);
    }

    #[tokio::test]
    async fn test_same_seat_is_independent_per_showtime() {
        let fx = Fixture::new().await;
        let booking = fx.booking();
        fx.reserve(&["A1"]).await;

        let other = ReservationRequest::new(&fx.later.id).seat(&fx.seat("A1").id);
        booking.reserve(other).await.unwrap();

        assert_eq!(fx.counter(&fx.showtime.id).await, 49);
        assert_eq!(fx.counter(&fx.later.id).await, 49);
        assert_eq!(fx.counter(&fx.tomorrow.id).await, 50);
    }

    // -------------------------------------------------------------------------
    // Preconditions
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_conflict_lists_every_offending_seat() {
        let fx = Fixture::new().await;
        fx.reserve(&["A1", "B2"]).await;
        let elsewhere = fx.add_screen_with_seat(2).await;

        let request = fx.request(&["B2", "C3", "A1"]).seat(&elsewhere.id);
        let err = fx.booking().reserve(request).await.unwrap_err();

        let ReservationError::SeatConflict(conflicts) = err else {
            panic!("expected SeatConflict");
        };
        let reported: Vec<(String, ConflictReason)> = conflicts
            .iter()
            .map(|c| (c.seat.to_string(), c.reason))
            .collect();
        assert_eq!(
            reported,
            vec![
                ("B2".to_string(), ConflictReason::AlreadyReserved),
                ("A1".to_string(), ConflictReason::AlreadyReserved),
                ("A1".to_string(), ConflictReason::WrongScreen),
            ]
        );
        assert!(fx.is_available("C3").await);
    }

    #[tokio::test]
    async fn test_unknown_entities_are_not_found() {
        let fx = Fixture::new().await;
        let booking = fx.booking();

        let err = booking
            .reserve(ReservationRequest::new("no-such-showtime").seat(&fx.seat("A1").id))
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::NotFound { entity: "Showtime", .. }));

        let err = booking
            .reserve(fx.request(&["A1"]).seat("no-such-seat"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::NotFound { entity: "Seat", .. }));

        let err = booking
            .reserve(fx.request(&["A1"]).snack("no-such-snack", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::NotFound { entity: "Snack", .. }));

        fx.db.snacks().set_available(&fx.candy.id, false).await.unwrap();
        let err = booking
            .reserve(fx.request(&["A1"]).snack(&fx.candy.id, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::NotFound { entity: "Snack", .. }));

        assert_eq!(fx.count("reservations").await, 0);
    }

    #[tokio::test]
    async fn test_malformed_requests_are_invalid() {
        let fx = Fixture::new().await;
        let booking = fx.db.booking(BookingConfig {
            max_seats_per_reservation: 2,
            ..BookingConfig::default()
        });

        let empty = ReservationRequest::new(&fx.showtime.id);
        assert!(matches!(
            booking.reserve(empty).await.unwrap_err(),
            ReservationError::Invalid(_)
        ));

        let too_many = fx.request(&["A1", "A2", "A3"]);
        assert!(matches!(
            booking.reserve(too_many).await.unwrap_err(),
            ReservationError::Invalid(_)
        ));

        let zero_qty = fx.request(&["A1"]).snack(&fx.soda.id, 0);
        assert!(matches!(
            booking.reserve(zero_qty).await.unwrap_err(),
            ReservationError::Invalid(_)
        ));

        let bad_email = fx.request(&["A1"]).email("not an email");
        assert!(matches!(
            booking.reserve(bad_email).await.unwrap_err(),
            ReservationError::Invalid(_)
        ));

        assert_eq!(fx.count("reservations").await, 0);
    }

    #[tokio::test]
    async fn test_duplicate_seats_collapse_and_tickets_follow_request_order() {
        let fx = Fixture::new().await;

        let confirmed = fx
            .booking()
            .reserve(fx.request(&["C1", "A1", "C1", "B1"]))
            .await
            .unwrap();

        assert_eq!(confirmed.reservation.total_amount_cents, 3600);
        let ticket_seats: Vec<String> = confirmed.tickets.iter().map(|t| t.seat_id.clone()).collect();
        assert_eq!(ticket_seats, fx.seat_ids(&["C1", "A1", "B1"]));

        let labels: Vec<String> = confirmed
            .receipt
            .seat_lines
            .iter()
            .map(|l| l.seat.to_string())
            .collect();
        assert_eq!(labels, vec!["C1", "A1", "B1"]);
        assert_eq!(fx.counter(&fx.showtime.id).await, 47);
    }

    #[tokio::test]
    async fn test_customer_is_created_once_by_normalized_email() {
        let fx = Fixture::new().await;
        let booking = fx.booking();

        let first = booking
            .reserve(fx.request(&["A1"]).email("  Guest@Cinema.Example "))
            .await
            .unwrap();
        let second = booking
            .reserve(fx.request(&["A2"]).email("guest@cinema.example"))
            .await
            .unwrap();
        let anonymous = booking.reserve(fx.request(&["A3"]).email("   ")).await.unwrap();

        assert!(first.reservation.customer_id.is_some());
        assert_eq!(first.reservation.customer_id, second.reservation.customer_id);
        assert_eq!(first.receipt.customer_email.as_deref(), Some("guest@cinema.example"));
        assert!(anonymous.reservation.customer_id.is_none());
        assert_eq!(fx.count("customers").await, 1);
    }

    #[tokio::test]
    async fn test_payment_method_is_recorded() {
        let fx = Fixture::new().await;
        let booking = fx.db.booking(BookingConfig {
            payment_method: Some("card".to_string()),
            ..BookingConfig::default()
        });

        let confirmed = booking.reserve(fx.request(&["A1"])).await.unwrap();
        let stored = fx
            .db
            .reservations()
            .get_by_id(&confirmed.reservation.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.payment_method.as_deref(), Some("card"));
    }

    // -------------------------------------------------------------------------
    // Atomicity
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_ticket_collision_rolls_back_everything() {
        let fx = Fixture::new().await;
        let existing = fx.reserve(&["A1"]).await;
        let taken = TicketNumber::parse(&existing.tickets[0].ticket_number).unwrap();

        let booking = fx
            .db
            .booking(BookingConfig {
                ticket_max_attempts: 2,
                ..BookingConfig::default()
            })
            .with_ticket_source(Arc::new(ScriptedTicketNumbers::repeating(taken)));

        let err = booking
            .reserve(fx.request(&["B1", "B2"]).snack(&fx.popcorn.id, 2))
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::TicketCollision { attempts: 2 }));

        assert_eq!(fx.count("reservations").await, 1);
        assert_eq!(fx.count("reservation_seats").await, 1);
        assert_eq!(fx.count("tickets").await, 1);
        assert_eq!(fx.count("snack_orders").await, 0);
        assert!(fx.is_available("B1").await);
        assert_eq!(fx.counter(&fx.showtime.id).await, 49);

        let popcorn = fx.db.snacks().get_by_id(&fx.popcorn.id).await.unwrap().unwrap();
        assert_eq!(popcorn.stock_quantity, 50);
    }

    // -------------------------------------------------------------------------
    // Cancel / Complete
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_cancel_releases_seats_tickets_and_stock() {
        let fx = Fixture::new().await;
        let booking = fx.booking();
        let confirmed = booking
            .reserve(fx.request(&["A1", "A2"]).snack(&fx.popcorn.id, 3))
            .await
            .unwrap();
        assert_eq!(confirmed.reservation.total_amount_cents, 2400 + 2550);

        let cancelled = booking.cancel(&confirmed.reservation.id).await.unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);

        let tickets = fx
            .db
            .reservations()
            .tickets_for_reservation(&confirmed.reservation.id)
            .await
            .unwrap();
        assert!(tickets.iter().all(|t| t.status == TicketStatus::Cancelled));

        let bindings = fx
            .db
            .reservations()
            .seats_for_reservation(&confirmed.reservation.id)
            .await
            .unwrap();
        assert!(bindings.iter().all(|b| b.released_at.is_some()));

        let popcorn = fx.db.snacks().get_by_id(&fx.popcorn.id).await.unwrap().unwrap();
        assert_eq!(popcorn.stock_quantity, 50);
        assert_eq!(fx.counter(&fx.showtime.id).await, 50);
        assert!(fx.is_available("A1").await);

        // The seat can be sold again.
        booking.reserve(fx.request(&["A1"])).await.unwrap();
        assert_eq!(fx.counter(&fx.showtime.id).await, 49);

        let err = booking.cancel(&confirmed.reservation.id).await.unwrap_err();
        assert!(matches!(
            err,
            ReservationError::InvalidTransition {
                from: ReservationStatus::Cancelled,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_complete_keeps_seats_taken() {
        let fx = Fixture::new().await;
        let booking = fx.booking();
        let confirmed = fx.reserve(&["D4"]).await;

        let completed = booking.complete(&confirmed.reservation.id).await.unwrap();
        assert_eq!(completed.status, ReservationStatus::Completed);

        let ticket = fx
            .db
            .reservations()
            .get_ticket_by_number(&confirmed.tickets[0].ticket_number)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ticket.status, TicketStatus::Used);

        assert!(!fx.is_available("D4").await);
        assert_eq!(fx.counter(&fx.showtime.id).await, 49);

        assert!(matches!(
            booking.cancel(&confirmed.reservation.id).await.unwrap_err(),
            ReservationError::InvalidTransition { .. }
        ));
        assert!(matches!(
            booking.complete("no-such-reservation").await.unwrap_err(),
            ReservationError::NotFound { entity: "Reservation", .. }
        ));
    }

    // -------------------------------------------------------------------------
    // Counter
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_counter_matches_bindings_through_a_sequence() {
        let fx = Fixture::new().await;
        let booking = fx.booking();

        let a = fx.reserve(&["A1", "A2", "A3"]).await;
        let b = fx.reserve(&["B1"]).await;
        let _ = booking.reserve(fx.request(&["A2", "C1"])).await.unwrap_err();
        booking.cancel(&a.reservation.id).await.unwrap();
        let c = fx.reserve(&["A2", "J5"]).await;
        booking.complete(&b.reservation.id).await.unwrap();
        booking.cancel(&c.reservation.id).await.unwrap();
        fx.reserve(&["E3"]).await;

        let bindings = fx
            .db
            .reservations()
            .active_binding_count(&fx.showtime.id)
            .await
            .unwrap();
        assert_eq!(bindings, 2);
        assert_eq!(fx.counter(&fx.showtime.id).await, 48);
        assert_eq!(
            fx.db.availability().available_count(&fx.showtime.id).await.unwrap(),
            Some(48)
        );
        let free = fx
            .db
            .availability()
            .resolve(&fx.showtime.id)
            .await
            .unwrap()
            .iter()
            .filter(|s| s.is_available)
            .count();
        assert_eq!(free, 48);
    }

    #[tokio::test]
    async fn test_reconcile_repairs_drift() {
        let fx = Fixture::new().await;
        let booking = fx.booking();
        fx.reserve(&["A1"]).await;

        sqlx::query("UPDATE showtimes SET available_seats = 7 WHERE id = ?1")
            .bind(&fx.showtime.id)
            .execute(fx.db.pool())
            .await
            .unwrap();

        let report = booking.reconcile_showtime(&fx.showtime.id).await.unwrap();
        assert_eq!(report.before, 7);
        assert_eq!(report.after, 49);
        assert!(report.drifted());
        assert_eq!(fx.counter(&fx.showtime.id).await, 49);

        let again = booking.reconcile_showtime(&fx.showtime.id).await.unwrap();
        assert!(!again.drifted());

        let all = booking.reconcile_all().await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|r| !r.drifted()));

        assert!(matches!(
            booking.reconcile_showtime("missing").await.unwrap_err(),
            ReservationError::NotFound { entity: "Showtime", .. }
        ));
    }

    #[tokio::test]
    async fn test_drift_is_corrected_during_reservation() {
        let fx = Fixture::new().await;

        sqlx::query("UPDATE showtimes SET available_seats = 0 WHERE id = ?1")
            .bind(&fx.showtime.id)
            .execute(fx.db.pool())
            .await
            .unwrap();

        fx.reserve(&["A1"]).await;
        assert_eq!(fx.counter(&fx.showtime.id).await, 49);
    }

    // -------------------------------------------------------------------------
    // Ticket uniqueness
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_ticket_numbers_are_unique_across_reservations() {
        let fx = Fixture::new().await;
        let mut numbers = HashSet::new();

        for row in ["A", "B", "C", "D", "E"] {
            let labels: Vec<String> = (1..=5).map(|n| format!("{row}{n}")).collect();
            let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
            for ticket in fx.reserve(&labels).await.tickets {
                assert!(TicketNumber::parse(&ticket.ticket_number).is_ok());
                assert!(numbers.insert(ticket.ticket_number));
            }
        }

        assert_eq!(numbers.len(), 25);
        assert_eq!(fx.count("tickets").await, 25);
    }

    // -------------------------------------------------------------------------
    // Concurrency (file database, multi-connection pool)
    // -------------------------------------------------------------------------

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_for_one_seat_have_one_winner() {
        let temp = TempDatabase::new();
        let fx = Fixture::with_config(temp.config(8)).await;
        let booking = fx.booking();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let booking = booking.clone();
            let request = fx.request(&["E5"]);
            handles.push(tokio::spawn(async move { booking.reserve(request).await }));
        }

        let mut wins = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => wins += 1,
                Err(ReservationError::SeatConflict(_)) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(wins, 1);
        assert_eq!(conflicts, 7);
        assert_eq!(fx.count("reservation_seats").await, 1);
        assert_eq!(fx.count("tickets").await, 1);
        assert_eq!(fx.counter(&fx.showtime.id).await, 49);
        fx.db.close().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_disjoint_and_overlapping_requests() {
        let temp = TempDatabase::new();
        let fx = Fixture::with_config(temp.config(8)).await;
        let booking = fx.booking();
        let nachos = fx.add_snack("Nachos", 650, 5).await;

        // 10 different seats, each also buying one of 5 nachos.
        let mut handles = Vec::new();
        for n in 1..=5 {
            for row in ["F", "G"] {
                let booking = booking.clone();
                let label = format!("{row}{n}");
                let request = fx.request(&[label.as_str()]).snack(&nachos.id, 1);
                handles.push(tokio::spawn(async move { booking.reserve(request).await }));
            }
        }

        let mut wins = 0;
        let mut short = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => wins += 1,
                Err(ReservationError::InsufficientStock(_)) => short += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(wins, 5);
        assert_eq!(short, 5);

        let nachos = fx.db.snacks().get_by_id(&nachos.id).await.unwrap().unwrap();
        assert_eq!(nachos.stock_quantity, 0);
        assert_eq!(fx.counter(&fx.showtime.id).await, 45);
        assert_eq!(
            fx.db.availability().available_count(&fx.showtime.id).await.unwrap(),
            Some(45)
        );
        fx.db.close().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_overlapping_seats_in_opposite_order_do_not_deadlock() {
        let temp = TempDatabase::new();
        let fx = Fixture::with_config(temp.config(8)).await;
        let booking = fx.booking();

        let groups: [(&[&str], &[&str], &[&str]); 2] = [
            (&["A1", "A2"], &["A2", "A1"], &["A1", "A2"]),
            (&["B1", "B2", "B3"], &["B3", "B1"], &["B1", "B3"]),
        ];

        let mut handles = Vec::new();
        for (group, (left, right, _)) in groups.iter().enumerate() {
            for labels in [*left, *right] {
                let booking = booking.clone();
                let request = fx.request(labels);
                let handle = tokio::spawn(async move { booking.reserve(request).await });
                handles.push((group, handle));
            }
        }

        let outcomes = tokio::time::timeout(Duration::from_secs(30), async {
            let mut outcomes = Vec::new();
            for (group, handle) in handles {
                outcomes.push((group, handle.await.unwrap()));
            }
            outcomes
        })
        .await
        .expect("reservations did not finish");

        for (group, (_, _, shared)) in groups.iter().enumerate() {
            let results: Vec<_> = outcomes
                .iter()
                .filter(|(g, _)| *g == group)
                .map(|(_, r)| r)
                .collect();
            assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);

            let loser = results
                .iter()
                .find_map(|r| match r {
                    Err(err) => Some(err),
                    Ok(_) => None,
                })
                .unwrap();
            match loser {
                ReservationError::SeatConflict(conflicts) => {
                    let mut seats: Vec<String> =
                        conflicts.iter().map(|c| c.seat.to_string()).collect();
                    seats.sort();
                    assert_eq!(seats, shared.to_vec());
                    assert!(conflicts.iter().all(|c| c.reason == ConflictReason::AlreadyReserved));
                }
                other => panic!("expected SeatConflict, got {other:?}"),
            }
        }

        let taken = fx.count("reservation_seats").await;
        assert!(taken == 4 || taken == 5);
        assert_eq!(fx.counter(&fx.showtime.id).await, 50 - taken);
        fx.db.close().await;
    }
}
