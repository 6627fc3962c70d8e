//! # Sample Venue Seeder
//!
//! Populates a kiosk database with the sample venue for development and
//! demos, or repairs seat counters on an existing one.
//!
//! ## Usage
//! ```bash
//! # Seed the database named in kiosk.toml (or the platform default)
//! cargo run -p marquee-db --bin seed
//!
//! # Specify database path
//! cargo run -p marquee-db --bin seed -- --db ./data/kiosk.db
//!
//! # Use a specific config file
//! cargo run -p marquee-db --bin seed -- --config ./kiosk.toml
//!
//! # Recompute every showtime's available seat count
//! cargo run -p marquee-db --bin seed -- --reconcile
//! ```
//!
//! ## Log Levels
//! - `RUST_LOG=debug` - Show debug messages
//! - Default: `info,marquee_db=debug,sqlx=warn`

use std::env;
use std::path::PathBuf;

use chrono::Utc;
use tracing_subscriber::EnvFilter;

use marquee_db::{seed_sample_data, Database, KioskConfig, SeedOutcome};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut reconcile = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--reconcile" | "-r" => reconcile = true,
            "--help" | "-h" => {
                println!("Marquee Kiosk Sample Venue Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>       Database file path (overrides config)");
                println!("  -c, --config <PATH>   Config file (default: platform config dir)");
                println!("  -r, --reconcile       Recompute seat counters instead of seeding");
                println!("  -h, --help            Show this help message");
                return Ok(());
            }
            other => eprintln!("Ignoring unknown argument: {}", other),
        }
        i += 1;
    }

    let mut config = KioskConfig::load(config_path)?;
    if let Some(path) = db_path {
        config.database.path = path;
    }

    println!("🎬 Marquee Kiosk Seeder");
    println!("=======================");
    println!("Venue:    {}", config.venue.name);
    println!("Database: {}", config.database.path.display());
    println!();

    if let Some(parent) = config.database.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db = Database::new(config.db_config()).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    if reconcile {
        let reports = db.booking(config.booking_config()).reconcile_all().await?;
        for report in &reports {
            let marker = if report.drifted() { "⚠" } else { "✓" };
            println!(
                "  {} showtime {}: {} → {}",
                marker, report.showtime_id, report.before, report.after
            );
        }
        println!();
        println!("✓ Reconciled {} showtimes", reports.len());
        db.close().await;
        return Ok(());
    }

    let today = Utc::now().date_naive();
    match seed_sample_data(&db, today, config.base_price()?).await? {
        SeedOutcome::AlreadySeeded { movies } => {
            println!("⚠ Database already has {} movies", movies);
            println!("  Skipping seed to avoid duplicates.");
            println!("  Delete the database file to regenerate.");
        }
        SeedOutcome::Created(venue) => {
            println!();
            println!(
                "Screen {} ({} seats)",
                venue.screen.number,
                venue.seats.len()
            );

            println!();
            println!("Showtimes:");
            for showtime in &venue.showtimes {
                let title = venue
                    .movies
                    .iter()
                    .find(|m| m.id == showtime.movie_id)
                    .map(|m| m.title.as_str())
                    .unwrap_or("?");
                println!(
                    "  {:<12} {} {}  {}  [{}]",
                    title,
                    showtime.show_date,
                    showtime.show_time.format("%H:%M"),
                    showtime.base_price(),
                    showtime.id
                );
            }

            println!();
            println!("Snacks:");
            for snack in &venue.snacks {
                println!(
                    "  {:<16} {:>7}  × {}",
                    snack.name,
                    snack.price().to_string(),
                    snack.stock_quantity
                );
            }

            println!();
            println!("✓ Sample venue created");
        }
    }

    db.close().await;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,marquee_db=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
