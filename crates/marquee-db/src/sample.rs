//! # Sample Venue
//!
//! Seeds a small cinema so a fresh kiosk has something to sell:
//!
//! ```text
//!   Screen 1 (Standard, 50 seats)      rows A..J × seats 1..5
//!
//!   Oppenheimer   today      14:30
//!   It            today      19:00
//!   Oppenheimer   tomorrow   16:00
//!
//!   Large Popcorn   popcorn  $8.50   × 50
//!   Medium Soda     drinks   $4.00   × 100
//!   Chocolate Candy candy    $4.50   × 75
//! ```
//!
//! Seeding is skipped when the catalog already has movies.

use chrono::{Days, NaiveDate, NaiveTime};
use tracing::info;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use marquee_core::{Money, Movie, Screen, Seat, SeatType, Showtime, Snack};

const ROWS: [&str; 10] = ["A", "B", "C", "D", "E", "F", "G", "H", "I", "J"];
const SEATS_PER_ROW: i64 = 5;

/// What [`seed_sample_data`] created.
#[derive(Debug, Clone)]
pub struct SampleVenue {
    pub movies: Vec<Movie>,
    pub screen: Screen,
    /// Row then number order.
    pub seats: Vec<Seat>,
    /// Oppenheimer today, It today, Oppenheimer tomorrow.
    pub showtimes: Vec<Showtime>,
    /// Popcorn, soda, candy.
    pub snacks: Vec<Snack>,
}

#[derive(Debug, Clone)]
pub enum SeedOutcome {
    Created(SampleVenue),
    /// Nothing written; the catalog already held this many movies.
    AlreadySeeded { movies: i64 },
}

/// Seeds the sample venue with showtimes on `today` and the day after,
/// all at `base_price` per seat.
pub async fn seed_sample_data(
    db: &Database,
    today: NaiveDate,
    base_price: Money,
) -> DbResult<SeedOutcome> {
    let catalog = db.catalog();

    let movies = catalog.count_movies().await?;
    if movies > 0 {
        info!(movies, "Catalog already populated, skipping sample data");
        return Ok(SeedOutcome::AlreadySeeded { movies });
    }

    let tomorrow = today
        .checked_add_days(Days::new(1))
        .ok_or_else(|| DbError::Internal(format!("no day after {today}")))?;

    let oppenheimer = movie("Oppenheimer", "Drama", 180);
    let it = movie("It", "Horror", 135);
    for m in [&oppenheimer, &it] {
        catalog.insert_movie(m).await?;
    }

    let screen = Screen {
        id: new_id(),
        number: 1,
        capacity: Some(ROWS.len() as i64 * SEATS_PER_ROW),
        screen_type: Some("Standard".to_string()),
    };
    catalog.insert_screen(&screen).await?;

    let mut seats = Vec::with_capacity(ROWS.len() * SEATS_PER_ROW as usize);
    for row in ROWS {
        for number in 1..=SEATS_PER_ROW {
            let seat = Seat {
                id: new_id(),
                screen_id: screen.id.clone(),
                row_letter: row.to_string(),
                seat_number: number,
                seat_type: SeatType::Standard,
                price_modifier_cents: None,
            };
            catalog.insert_seat(&seat).await?;
            seats.push(seat);
        }
    }

    let slots = [
        (&oppenheimer, today, time(14, 30)?),
        (&it, today, time(19, 0)?),
        (&oppenheimer, tomorrow, time(16, 0)?),
    ];
    let mut showtimes = Vec::with_capacity(slots.len());
    for (m, show_date, show_time) in slots {
        let showtime = Showtime {
            id: new_id(),
            movie_id: m.id.clone(),
            screen_id: screen.id.clone(),
            show_date,
            show_time,
            base_price_cents: base_price.cents(),
            available_seats: 0,
        };
        showtimes.push(catalog.insert_showtime(&showtime).await?);
    }

    let snacks = vec![
        snack("Large Popcorn", "popcorn", 850, 50),
        snack("Medium Soda", "drinks", 400, 100),
        snack("Chocolate Candy", "candy", 450, 75),
    ];
    let snack_repo = db.snacks();
    for s in &snacks {
        snack_repo.insert(s).await?;
    }

    info!(
        movies = 2,
        seats = seats.len(),
        showtimes = showtimes.len(),
        snacks = snacks.len(),
        "Sample venue created"
    );

    Ok(SeedOutcome::Created(SampleVenue {
        movies: vec![oppenheimer, it],
        screen,
        seats,
        showtimes,
        snacks,
    }))
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn time(hour: u32, minute: u32) -> DbResult<NaiveTime> {
    NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or_else(|| DbError::Internal(format!("invalid time {hour}:{minute}")))
}

fn movie(title: &str, genre: &str, duration_minutes: i64) -> Movie {
    Movie {
        id: new_id(),
        title: title.to_string(),
        genre: Some(genre.to_string()),
        duration_minutes: Some(duration_minutes),
        is_active: true,
    }
}

fn snack(name: &str, category: &str, price_cents: i64, stock_quantity: i64) -> Snack {
    Snack {
        id: new_id(),
        name: name.to_string(),
        category: Some(category.to_string()),
        price_cents,
        stock_quantity,
        min_stock_level: 10,
        is_available: true,
    }
}
