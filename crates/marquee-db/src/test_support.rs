//! Shared fixtures for the unit tests: a seeded sample venue and scripted
//! ticket numbers.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::booking::{BookingConfig, ConfirmedReservation, ReservationManager, ReservationRequest};
use crate::pool::{Database, DbConfig};
use crate::sample::{seed_sample_data, SeedOutcome};
use crate::ticket::TicketNumberSource;
use marquee_core::{Money, Screen, Seat, SeatType, Showtime, Snack, TicketNumber};

/// A migrated database holding the sample venue.
pub struct Fixture {
    pub db: Database,
    /// Oppenheimer, today.
    pub showtime: Showtime,
    /// It, today. Same screen.
    pub later: Showtime,
    /// Oppenheimer, tomorrow. Same screen.
    pub tomorrow: Showtime,
    pub seats: Vec<Seat>,
    pub popcorn: Snack,
    pub soda: Snack,
    pub candy: Snack,
}

impl Fixture {
    /// In-memory database.
    pub async fn new() -> Self {
        Fixture::with_config(DbConfig::in_memory()).await
    }

    pub async fn with_config(config: DbConfig) -> Self {
        let db = Database::new(config).await.unwrap();
        let today = Utc::now().date_naive();

        let SeedOutcome::Created(venue) = seed_sample_data(&db, today, Money::from_cents(1200))
            .await
            .unwrap()
        else {
            panic!("fixture database was not empty");
        };

        let mut showtimes = venue.showtimes.into_iter();
        let mut snacks = venue.snacks.into_iter();

        Fixture {
            db,
            showtime: showtimes.next().unwrap(),
            later: showtimes.next().unwrap(),
            tomorrow: showtimes.next().unwrap(),
            seats: venue.seats,
            popcorn: snacks.next().unwrap(),
            soda: snacks.next().unwrap(),
            candy: snacks.next().unwrap(),
        }
    }

    /// Seat of the sample screen by label, e.g. `"C4"`.
    pub fn seat(&self, label: &str) -> &Seat {
        self.seats
            .iter()
            .find(|s| s.label().to_string() == label)
            .unwrap_or_else(|| panic!("no seat {label}"))
    }

    pub fn seat_ids(&self, labels: &[&str]) -> Vec<String> {
        labels.iter().map(|l| self.seat(l).id.clone()).collect()
    }

    pub fn booking(&self) -> ReservationManager {
        self.db.booking(BookingConfig::default())
    }

    /// Request for the main showtime.
    pub fn request(&self, labels: &[&str]) -> ReservationRequest {
        ReservationRequest::new(&self.showtime.id).seats(self.seat_ids(labels))
    }

    /// Reserves seats for the main showtime, panicking on failure.
    pub async fn reserve(&self, labels: &[&str]) -> ConfirmedReservation {
        self.booking().reserve(self.request(labels)).await.unwrap()
    }

    pub async fn is_available(&self, label: &str) -> bool {
        let seat_id = &self.seat(label).id;
        self.db
            .availability()
            .resolve(&self.showtime.id)
            .await
            .unwrap()
            .iter()
            .any(|s| &s.seat.id == seat_id && s.is_available)
    }

    /// Cached `available_seats` of a showtime.
    pub async fn counter(&self, showtime_id: &str) -> i64 {
        self.db
            .catalog()
            .get_showtime(showtime_id)
            .await
            .unwrap()
            .unwrap()
            .available_seats
    }

    pub async fn count(&self, table: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(self.db.pool())
            .await
            .unwrap()
    }

    /// Adds a snack with a restock threshold of 10.
    pub async fn add_snack(&self, name: &str, price_cents: i64, stock: i64) -> Snack {
        let snack = Snack {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            category: Some("snacks".to_string()),
            price_cents,
            stock_quantity: stock,
            min_stock_level: 10,
            is_available: true,
        };
        self.db.snacks().insert(&snack).await.unwrap();
        snack
    }

    /// Adds another screen holding a single seat `A1`.
    pub async fn add_screen_with_seat(&self, number: i64) -> Seat {
        let catalog = self.db.catalog();
        let screen = Screen {
            id: Uuid::new_v4().to_string(),
            number,
            capacity: Some(1),
            screen_type: None,
        };
        catalog.insert_screen(&screen).await.unwrap();

        let seat = Seat {
            id: Uuid::new_v4().to_string(),
            screen_id: screen.id,
            row_letter: "A".to_string(),
            seat_number: 1,
            seat_type: SeatType::Vip,
            price_modifier_cents: Some(300),
        };
        catalog.insert_seat(&seat).await.unwrap();
        seat
    }
}

/// A file database in the temp directory, deleted on drop.
pub struct TempDatabase {
    path: PathBuf,
}

impl TempDatabase {
    pub fn new() -> Self {
        let path = std::env::temp_dir().join(format!("marquee-test-{}.db", Uuid::new_v4()));
        TempDatabase { path }
    }

    pub fn config(&self, max_connections: u32) -> DbConfig {
        DbConfig::new(&self.path).max_connections(max_connections)
    }
}

impl Drop for TempDatabase {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}

/// Hands out a fixed sequence of ticket numbers, then random ones.
#[derive(Debug)]
pub struct ScriptedTicketNumbers {
    queue: Mutex<VecDeque<TicketNumber>>,
    repeat: Option<TicketNumber>,
}

impl ScriptedTicketNumbers {
    pub fn new(numbers: Vec<TicketNumber>) -> Self {
        ScriptedTicketNumbers {
            queue: Mutex::new(numbers.into()),
            repeat: None,
        }
    }

    /// Always returns `number`.
    pub fn repeating(number: TicketNumber) -> Self {
        ScriptedTicketNumbers {
            queue: Mutex::new(VecDeque::new()),
            repeat: Some(number),
        }
    }
}

impl TicketNumberSource for ScriptedTicketNumbers {
    fn next_number(&self, issued_on: NaiveDate) -> TicketNumber {
        if let Some(number) = &self.repeat {
            return number.clone();
        }
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| TicketNumber::generate("TKT", issued_on))
    }
}
