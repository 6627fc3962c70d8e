//! # Kiosk Configuration
//!
//! Configuration for the database and the reservation workflow.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     MARQUEE_DB_PATH=/var/lib/marquee/kiosk.db                          │
//! │     MARQUEE_MAX_SEATS=8                                                │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/marquee-kiosk/kiosk.toml (Linux)                         │
//! │     ~/Library/Application Support/com.marquee.kiosk/kiosk.toml (macOS) │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # kiosk.toml
//! [database]
//! path = "/var/lib/marquee/kiosk.db"
//! max_connections = 5
//! busy_timeout_ms = 5000
//!
//! [booking]
//! max_seats_per_reservation = 10
//! ticket_prefix = "TKT"
//! ticket_max_attempts = 5
//!
//! [venue]
//! name = "Marquee Cinema"
//! default_base_price = "12.00"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use marquee_core::ticket::DEFAULT_TICKET_PREFIX;
use marquee_core::validation::validate_price_cents;
use marquee_core::{Money, MAX_SEATS_PER_RESERVATION};

use crate::booking::BookingConfig;
use crate::pool::DbConfig;

/// File name looked up in the platform config directory.
pub const CONFIG_FILE_NAME: &str = "kiosk.toml";

// =============================================================================
// Errors
// =============================================================================

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Database Section
// =============================================================================

/// `[database]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path. `:memory:` for a throwaway database.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a reservation waits for another terminal's write to finish.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("com", "marquee", "kiosk")
        .map(|dirs| dirs.data_dir().join("kiosk.db"))
        .unwrap_or_else(|| PathBuf::from("kiosk.db"))
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_connect_timeout_secs() -> u64 {
    30
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout_ms(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

// =============================================================================
// Booking Section
// =============================================================================

/// `[booking]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingSettings {
    #[serde(default = "default_max_seats")]
    pub max_seats_per_reservation: usize,

    /// Leading part of every ticket number (`TKT-20261019-...`).
    #[serde(default = "default_ticket_prefix")]
    pub ticket_prefix: String,

    /// Fresh numbers tried before a reservation fails with a collision.
    #[serde(default = "default_ticket_max_attempts")]
    pub ticket_max_attempts: u32,

    /// Recorded on reservations made at this kiosk (e.g. "card").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
}

fn default_max_seats() -> usize {
    MAX_SEATS_PER_RESERVATION
}

fn default_ticket_prefix() -> String {
    DEFAULT_TICKET_PREFIX.to_string()
}

fn default_ticket_max_attempts() -> u32 {
    5
}

impl Default for BookingSettings {
    fn default() -> Self {
        BookingSettings {
            max_seats_per_reservation: default_max_seats(),
            ticket_prefix: default_ticket_prefix(),
            ticket_max_attempts: default_ticket_max_attempts(),
            payment_method: None,
        }
    }
}

// =============================================================================
// Venue Section
// =============================================================================

/// `[venue]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueSettings {
    #[serde(default = "default_venue_name")]
    pub name: String,

    /// Per-seat price used when seeding showtimes, as a decimal string.
    #[serde(default = "default_base_price")]
    pub default_base_price: String,
}

fn default_venue_name() -> String {
    "Marquee Cinema".to_string()
}

fn default_base_price() -> String {
    "12.00".to_string()
}

impl Default for VenueSettings {
    fn default() -> Self {
        VenueSettings {
            name: default_venue_name(),
            default_base_price: default_base_price(),
        }
    }
}

// =============================================================================
// Kiosk Configuration
// =============================================================================

/// Complete kiosk configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KioskConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub booking: BookingSettings,

    #[serde(default)]
    pub venue: VenueSettings,
}

impl KioskConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`kiosk.toml`)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = match config_path.or_else(Self::default_config_path) {
            Some(path) if path.exists() => {
                info!(?path, "Loading kiosk config from file");
                Self::from_file(&path)?
            }
            Some(path) => {
                debug!(?path, "Config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Parses a config file without applying overrides.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Writes the configuration as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        info!(?path, "Kiosk config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.booking.max_seats_per_reservation == 0 {
            return Err(ConfigError::Invalid(
                "booking.max_seats_per_reservation must be greater than 0".into(),
            ));
        }

        if self.booking.ticket_max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "booking.ticket_max_attempts must be greater than 0".into(),
            ));
        }

        let prefix = &self.booking.ticket_prefix;
        if prefix.is_empty()
            || prefix.len() > 8
            || !prefix.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(ConfigError::Invalid(format!(
                "booking.ticket_prefix must be 1-8 ASCII letters or digits, got '{}'",
                prefix
            )));
        }

        self.base_price()?;

        Ok(())
    }

    /// Applies overrides from a key lookup (the process environment in
    /// [`KioskConfig::load`]).
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("MARQUEE_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(value) = lookup("MARQUEE_MAX_CONNECTIONS") {
            match value.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %value, "Ignoring invalid MARQUEE_MAX_CONNECTIONS"),
            }
        }

        if let Some(value) = lookup("MARQUEE_BUSY_TIMEOUT_MS") {
            match value.parse::<u64>() {
                Ok(ms) => self.database.busy_timeout_ms = ms,
                Err(_) => warn!(value = %value, "Ignoring invalid MARQUEE_BUSY_TIMEOUT_MS"),
            }
        }

        if let Some(prefix) = lookup("MARQUEE_TICKET_PREFIX") {
            self.booking.ticket_prefix = prefix;
        }

        if let Some(value) = lookup("MARQUEE_MAX_SEATS") {
            match value.parse::<usize>() {
                Ok(n) => self.booking.max_seats_per_reservation = n,
                Err(_) => warn!(value = %value, "Ignoring invalid MARQUEE_MAX_SEATS"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "marquee", "kiosk")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    // =========================================================================
    // Conversions
    // =========================================================================

    /// Database pool settings.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database.path.clone())
            .max_connections(self.database.max_connections)
            .connect_timeout(Duration::from_secs(self.database.connect_timeout_secs))
            .busy_timeout(Duration::from_millis(self.database.busy_timeout_ms))
    }

    /// Reservation workflow settings.
    pub fn booking_config(&self) -> BookingConfig {
        BookingConfig {
            max_seats_per_reservation: self.booking.max_seats_per_reservation,
            ticket_prefix: self.booking.ticket_prefix.clone(),
            ticket_max_attempts: self.booking.ticket_max_attempts,
            payment_method: self.booking.payment_method.clone(),
        }
    }

    /// The venue's default per-seat price.
    pub fn base_price(&self) -> ConfigResult<Money> {
        let price = Money::parse_decimal(&self.venue.default_base_price)
            .map_err(|e| ConfigError::Invalid(format!("venue.default_base_price: {e}")))?;
        validate_price_cents(price.cents())
            .map_err(|e| ConfigError::Invalid(format!("venue.default_base_price: {e}")))?;
        Ok(price)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
