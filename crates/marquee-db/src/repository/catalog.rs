//! # Catalog Repository
//!
//! Movies, screens, seats and showtimes.
//!
//! Reference data is written by seeding and only read by the booking path,
//! with one exception: the cached `showtimes.available_seats` counter, which
//! the reservation transaction maintains through the `pub(crate)` helpers at
//! the bottom of this file.
//!
//! ## Counter Ground Truth
//! ```text
//!   available_seats = seats on the showtime's screen
//!                   − active reservation_seats rows for the showtime
//! ```

use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use marquee_core::{Movie, Screen, Seat, Showtime};

/// Repository for catalog reads and seeding writes.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    // =========================================================================
    // Writes (seeding)
    // =========================================================================

    /// Inserts a movie.
    pub async fn insert_movie(&self, movie: &Movie) -> DbResult<()> {
        debug!(id = %movie.id, title = %movie.title, "Inserting movie");

        sqlx::query(
            r#"
            INSERT INTO movies (id, title, genre, duration_minutes, is_active)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&movie.id)
        .bind(&movie.title)
        .bind(&movie.genre)
        .bind(movie.duration_minutes)
        .bind(movie.is_active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts a screen.
    pub async fn insert_screen(&self, screen: &Screen) -> DbResult<()> {
        debug!(id = %screen.id, number = screen.number, "Inserting screen");

        sqlx::query(
            r#"
            INSERT INTO screens (id, number, capacity, screen_type)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&screen.id)
        .bind(screen.number)
        .bind(screen.capacity)
        .bind(&screen.screen_type)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts a seat. `(screen_id, row_letter, seat_number)` must be unique.
    pub async fn insert_seat(&self, seat: &Seat) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO seats (id, screen_id, row_letter, seat_number, seat_type, price_modifier_cents)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&seat.id)
        .bind(&seat.screen_id)
        .bind(&seat.row_letter)
        .bind(seat.seat_number)
        .bind(seat.seat_type)
        .bind(seat.price_modifier_cents)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts a showtime and returns it as stored.
    ///
    /// `available_seats` is initialized from the screen's seat count; the
    /// value on `showtime` is ignored. Add seats before showtimes.
    pub async fn insert_showtime(&self, showtime: &Showtime) -> DbResult<Showtime> {
        debug!(
            id = %showtime.id,
            movie_id = %showtime.movie_id,
            date = %showtime.show_date,
            time = %showtime.show_time,
            "Inserting showtime"
        );

        sqlx::query(
            r#"
            INSERT INTO showtimes (
                id, movie_id, screen_id, show_date, show_time,
                base_price_cents, available_seats
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, (SELECT COUNT(*) FROM seats WHERE screen_id = ?3)
            )
            "#,
        )
        .bind(&showtime.id)
        .bind(&showtime.movie_id)
        .bind(&showtime.screen_id)
        .bind(showtime.show_date)
        .bind(showtime.show_time)
        .bind(showtime.base_price_cents)
        .execute(&self.pool)
        .await?;

        let stored = fetch_showtime(&self.pool, &showtime.id).await?;
        stored.ok_or_else(|| crate::error::DbError::not_found("Showtime", &showtime.id))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets a movie by ID.
    pub async fn get_movie(&self, id: &str) -> DbResult<Option<Movie>> {
        let movie = sqlx::query_as::<_, Movie>(
            "SELECT id, title, genre, duration_minutes, is_active FROM movies WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(movie)
    }

    /// Movies currently showing, by title.
    pub async fn list_active_movies(&self) -> DbResult<Vec<Movie>> {
        let movies = sqlx::query_as::<_, Movie>(
            r#"
            SELECT id, title, genre, duration_minutes, is_active
            FROM movies
            WHERE is_active = 1
            ORDER BY title
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(movies)
    }

    /// Gets a screen by ID.
    pub async fn get_screen(&self, id: &str) -> DbResult<Option<Screen>> {
        let screen = sqlx::query_as::<_, Screen>(
            "SELECT id, number, capacity, screen_type FROM screens WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(screen)
    }

    /// Gets a showtime by ID.
    pub async fn get_showtime(&self, id: &str) -> DbResult<Option<Showtime>> {
        fetch_showtime(&self.pool, id).await
    }

    /// Showtimes of a movie, optionally limited to one date, in schedule
    /// order.
    pub async fn showtimes_for_movie(
        &self,
        movie_id: &str,
        date: Option<NaiveDate>,
    ) -> DbResult<Vec<Showtime>> {
        let showtimes = sqlx::query_as::<_, Showtime>(
            r#"
            SELECT id, movie_id, screen_id, show_date, show_time,
                   base_price_cents, available_seats
            FROM showtimes
            WHERE movie_id = ?1
              AND (?2 IS NULL OR show_date = ?2)
            ORDER BY show_date, show_time
            "#,
        )
        .bind(movie_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(showtimes)
    }

    /// Gets a seat by ID.
    pub async fn get_seat(&self, id: &str) -> DbResult<Option<Seat>> {
        fetch_seat(&self.pool, id).await
    }

    /// All seats of a screen, row ascending then number ascending.
    pub async fn seats_for_screen(&self, screen_id: &str) -> DbResult<Vec<Seat>> {
        fetch_seats_for_screen(&self.pool, screen_id).await
    }

    /// Number of seats in a screen.
    pub async fn count_seats_for_screen(&self, screen_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM seats WHERE screen_id = ?1")
            .bind(screen_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Counts movies, active or not (for diagnostics and seeding).
    pub async fn count_movies(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM movies")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Shared Queries
// =============================================================================
// Usable with the pool or inside a reservation transaction.

pub(crate) async fn fetch_showtime<'c>(
    executor: impl SqliteExecutor<'c>,
    id: &str,
) -> DbResult<Option<Showtime>> {
    let showtime = sqlx::query_as::<_, Showtime>(
        r#"
        SELECT id, movie_id, screen_id, show_date, show_time,
               base_price_cents, available_seats
        FROM showtimes
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(showtime)
}

pub(crate) async fn fetch_seat<'c>(
    executor: impl SqliteExecutor<'c>,
    id: &str,
) -> DbResult<Option<Seat>> {
    let seat = sqlx::query_as::<_, Seat>(
        r#"
        SELECT id, screen_id, row_letter, seat_number, seat_type, price_modifier_cents
        FROM seats
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(seat)
}

pub(crate) async fn fetch_seats_for_screen<'c>(
    executor: impl SqliteExecutor<'c>,
    screen_id: &str,
) -> DbResult<Vec<Seat>> {
    let seats = sqlx::query_as::<_, Seat>(
        r#"
        SELECT id, screen_id, row_letter, seat_number, seat_type, price_modifier_cents
        FROM seats
        WHERE screen_id = ?1
        ORDER BY row_letter, seat_number, id
        "#,
    )
    .bind(screen_id)
    .fetch_all(executor)
    .await?;

    Ok(seats)
}

pub(crate) async fn all_showtime_ids<'c>(executor: impl SqliteExecutor<'c>) -> DbResult<Vec<String>> {
    let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM showtimes ORDER BY id")
        .fetch_all(executor)
        .await?;

    Ok(ids)
}

/// Authoritative free-seat count, or `None` for an unknown showtime.
pub(crate) async fn authoritative_available<'c>(
    executor: impl SqliteExecutor<'c>,
    showtime_id: &str,
) -> DbResult<Option<i64>> {
    let count: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT
            (SELECT COUNT(*) FROM seats s WHERE s.screen_id = st.screen_id)
          - (SELECT COUNT(*) FROM reservation_seats rs
             WHERE rs.showtime_id = st.id AND rs.released_at IS NULL)
        FROM showtimes st
        WHERE st.id = ?1
        "#,
    )
    .bind(showtime_id)
    .fetch_optional(executor)
    .await?;

    Ok(count)
}

/// Shifts the cached counter by `delta`, floored at zero.
pub(crate) async fn adjust_available(
    conn: &mut SqliteConnection,
    showtime_id: &str,
    delta: i64,
) -> DbResult<()> {
    sqlx::query(
        "UPDATE showtimes SET available_seats = MAX(available_seats + ?2, 0) WHERE id = ?1",
    )
    .bind(showtime_id)
    .bind(delta)
    .execute(conn)
    .await?;

    Ok(())
}

/// Overwrites the cached counter.
pub(crate) async fn set_available(
    conn: &mut SqliteConnection,
    showtime_id: &str,
    value: i64,
) -> DbResult<()> {
    sqlx::query("UPDATE showtimes SET available_seats = ?2 WHERE id = ?1")
        .bind(showtime_id)
        .bind(value)
        .execute(conn)
        .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
