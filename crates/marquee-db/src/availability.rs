//! # Availability Resolver
//!
//! Which seats of a showtime are free right now.
//!
//! ## Algorithm
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  showtime ──► screen ──► all seats (row ASC, number ASC)               │
//! │                               │                                         │
//! │  active reservation_seats ────┤  seat_id in bound set?                  │
//! │  for this showtime            │     yes → is_available = false          │
//! │                               ▼     no  → is_available = true           │
//! │                      Vec<SeatAvailability>                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both reads run in one read transaction, so the result is a consistent
//! snapshot. It may be stale by the time the caller acts on it; the
//! reservation transaction re-checks everything under the write lock.

use std::collections::HashSet;

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::{catalog, reservation};
use marquee_core::{group_into_rows, SeatAvailability, SeatRow};

/// Read-only seat availability queries.
#[derive(Debug, Clone)]
pub struct AvailabilityResolver {
    pool: SqlitePool,
}

impl AvailabilityResolver {
    /// Creates a new AvailabilityResolver.
    pub fn new(pool: SqlitePool) -> Self {
        AvailabilityResolver { pool }
    }

    /// Every seat of the showtime's screen with its availability, ordered by
    /// row letter then seat number.
    ///
    /// An unknown showtime yields an empty list.
    pub async fn resolve(&self, showtime_id: &str) -> DbResult<Vec<SeatAvailability>> {
        let mut tx = self.pool.begin().await?;

        let Some(showtime) = catalog::fetch_showtime(&mut *tx, showtime_id).await? else {
            debug!(showtime_id = %showtime_id, "Unknown showtime, no seats");
            return Ok(Vec::new());
        };

        let seats = catalog::fetch_seats_for_screen(&mut *tx, &showtime.screen_id).await?;
        let bound: HashSet<String> = reservation::bound_seat_ids(&mut *tx, showtime_id)
            .await?
            .into_iter()
            .collect();

        tx.commit().await?;

        let resolved: Vec<SeatAvailability> = seats
            .into_iter()
            .map(|seat| {
                let is_available = !bound.contains(&seat.id);
                SeatAvailability { seat, is_available }
            })
            .collect();

        debug!(
            showtime_id = %showtime_id,
            seats = resolved.len(),
            taken = bound.len(),
            "Resolved seat availability"
        );

        Ok(resolved)
    }

    /// Free seats counted from bindings rather than the cached counter.
    /// `None` for an unknown showtime.
    pub async fn available_count(&self, showtime_id: &str) -> DbResult<Option<i64>> {
        catalog::authoritative_available(&self.pool, showtime_id).await
    }

    /// [`resolve`](Self::resolve) grouped into rows for rendering.
    pub async fn seat_map(&self, showtime_id: &str) -> DbResult<Vec<SeatRow>> {
        Ok(group_into_rows(self.resolve(showtime_id).await?))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
