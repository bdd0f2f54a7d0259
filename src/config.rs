//! Application configuration constants.
//!
//! This module centralizes all tunable scheduling values so they are named
//! configuration rather than literals scattered through the codebase.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Deserialize;
use std::path::PathBuf;

use crate::error::{Error, Result};

// ==================== Database Configuration ====================

/// Configuration file structure for config.toml
#[derive(Debug, Deserialize, Default)]
struct AppConfig {
    database: Option<DatabaseConfig>,
    srs: Option<SrsConfig>,
}

#[derive(Debug, Deserialize)]
struct DatabaseConfig {
    path: Option<String>,
}

/// Load database path with priority: config.toml > .env > default
pub fn load_database_path() -> PathBuf {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // Priority 1: config.toml
    if let Ok(contents) = std::fs::read_to_string("config.toml") {
        if let Ok(config) = toml::from_str::<AppConfig>(&contents) {
            if let Some(db) = config.database {
                if let Some(path) = db.path {
                    tracing::info!("Using database from config.toml: {}", path);
                    return PathBuf::from(path);
                }
            }
        }
    }

    // Priority 2: .env DATABASE_PATH
    if let Ok(path) = std::env::var("DATABASE_PATH") {
        tracing::info!("Using database from DATABASE_PATH env: {}", path);
        return PathBuf::from(path);
    }

    // Default
    let default = PathBuf::from("data/cardbox.db");
    tracing::info!("Using default database path: {}", default.display());
    default
}

// ==================== SRS Learning Steps ====================

/// Learning/relearning step ladder in minutes: 1min → 10min
pub const LEARNING_STEPS_MINUTES: [i64; 2] = [1, 10];

/// Seed interval (days) when a card graduates from Learning via Good
pub const GRADUATING_INTERVAL_DAYS: i64 = 4;

/// Seed interval (days) when a card graduates via Easy
pub const EASY_INTERVAL_DAYS: i64 = 5;

/// Seed interval (days) when a lapsed card re-graduates from Relearning
pub const RELEARN_INTERVAL_DAYS: i64 = 1;

// ==================== SRS Ease Factors ====================

/// Ease factor assigned to a card on creation
pub const STARTING_EASE: f64 = 2.5;

/// Floor below which the ease factor never drops
pub const MINIMUM_EASE: f64 = 1.3;

/// Ease penalty applied when a Review card lapses (Again)
pub const LAPSE_EASE_PENALTY: f64 = 0.20;

/// Ease penalty applied on a Hard review
pub const HARD_EASE_PENALTY: f64 = 0.15;

/// Ease bonus applied on an Easy review
pub const EASY_EASE_BONUS: f64 = 0.15;

// ==================== SRS Interval Growth ====================

/// Interval multiplier for Hard reviews (instead of the ease factor)
pub const HARD_INTERVAL_FACTOR: f64 = 1.2;

/// Extra multiplier on top of ease for Easy reviews
pub const EASY_BONUS: f64 = 1.3;

/// Fuzz fraction applied to computed review intervals (± this share)
pub const INTERVAL_FUZZ: f64 = 0.05;

/// Review intervals shorter than this many days are never fuzzed
pub const FUZZ_MINIMUM_DAYS: i64 = 2;

// ==================== Queue Configuration ====================

/// Default number of new cards a deck introduces per day
pub const DEFAULT_NEW_CARDS_PER_DAY: i64 = 20;

/// Default limit for due-queue selection
pub const DEFAULT_QUEUE_LIMIT: usize = 50;

// ==================== SrsConfig ====================

/// Tunable scheduling parameters.
///
/// Every numeric constant of the scheduling algorithm lives here so a
/// deployment can override it from the `[srs]` table of config.toml.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SrsConfig {
    pub learning_steps_minutes: Vec<i64>,
    pub graduating_interval_days: i64,
    pub easy_interval_days: i64,
    pub relearn_interval_days: i64,
    pub starting_ease: f64,
    pub minimum_ease: f64,
    pub lapse_ease_penalty: f64,
    pub hard_ease_penalty: f64,
    pub easy_ease_bonus: f64,
    pub hard_interval_factor: f64,
    pub easy_bonus: f64,
    pub interval_fuzz: f64,
    /// Offset from UTC, in minutes, defining the learner's local midnight
    pub local_utc_offset_minutes: i32,
}

impl Default for SrsConfig {
    fn default() -> Self {
        Self {
            learning_steps_minutes: LEARNING_STEPS_MINUTES.to_vec(),
            graduating_interval_days: GRADUATING_INTERVAL_DAYS,
            easy_interval_days: EASY_INTERVAL_DAYS,
            relearn_interval_days: RELEARN_INTERVAL_DAYS,
            starting_ease: STARTING_EASE,
            minimum_ease: MINIMUM_EASE,
            lapse_ease_penalty: LAPSE_EASE_PENALTY,
            hard_ease_penalty: HARD_EASE_PENALTY,
            easy_ease_bonus: EASY_EASE_BONUS,
            hard_interval_factor: HARD_INTERVAL_FACTOR,
            easy_bonus: EASY_BONUS,
            interval_fuzz: INTERVAL_FUZZ,
            local_utc_offset_minutes: 0,
        }
    }
}

impl SrsConfig {
    /// The learning/relearning step ladder
    pub fn ladder(&self) -> &[i64] {
        &self.learning_steps_minutes
    }

    /// Delay of the first ladder step in minutes
    pub fn first_step_minutes(&self) -> i64 {
        self.learning_steps_minutes.first().copied().unwrap_or(1)
    }

    /// Local calendar date for `now` under the configured UTC offset
    pub fn local_day(&self, now: DateTime<Utc>) -> NaiveDate {
        (now + Duration::minutes(self.local_utc_offset_minutes as i64)).date_naive()
    }

    pub fn validate(&self) -> Result<()> {
        if self.learning_steps_minutes.is_empty() {
            return Err(Error::Config("learning_steps_minutes must not be empty".into()));
        }
        if self.learning_steps_minutes.iter().any(|&m| m <= 0) {
            return Err(Error::Config("learning steps must be positive minutes".into()));
        }
        if self.minimum_ease <= 0.0 || self.starting_ease < self.minimum_ease {
            return Err(Error::Config("ease bounds are inconsistent".into()));
        }
        if !(0.0..1.0).contains(&self.interval_fuzz) {
            return Err(Error::Config("interval_fuzz must be in [0, 1)".into()));
        }
        Ok(())
    }
}

/// Load scheduling parameters with priority: config.toml `[srs]` > defaults
pub fn load_srs_config() -> Result<SrsConfig> {
    let config = match std::fs::read_to_string("config.toml") {
        Ok(contents) => match toml::from_str::<AppConfig>(&contents) {
            Ok(app) => app.srs.unwrap_or_default(),
            Err(e) => return Err(Error::Config(format!("config.toml: {}", e))),
        },
        Err(_) => SrsConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SrsConfig::default().validate().is_ok());
    }

    #[test]
    fn test_empty_ladder_rejected() {
        let config = SrsConfig {
            learning_steps_minutes: vec![],
            ..SrsConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_step_rejected() {
        let config = SrsConfig {
            learning_steps_minutes: vec![1, -10],
            ..SrsConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_fuzz_out_of_range_rejected() {
        let config = SrsConfig {
            interval_fuzz: 1.0,
            ..SrsConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_local_day_utc() {
        let config = SrsConfig::default();
        let now = Utc.with_ymd_and_hms(2026, 3, 5, 23, 30, 0).unwrap();
        assert_eq!(config.local_day(now), NaiveDate::from_ymd_opt(2026, 3, 5).unwrap());
    }

    #[test]
    fn test_local_day_offset_crosses_midnight() {
        let config = SrsConfig {
            local_utc_offset_minutes: 60,
            ..SrsConfig::default()
        };
        let now = Utc.with_ymd_and_hms(2026, 3, 5, 23, 30, 0).unwrap();
        // 23:30 UTC is 00:30 next day at UTC+1
        assert_eq!(config.local_day(now), NaiveDate::from_ymd_opt(2026, 3, 6).unwrap());
    }

    #[test]
    fn test_srs_table_deserializes_partially() {
        let config: SrsConfig = toml::from_str("graduating_interval_days = 2").unwrap();
        assert_eq!(config.graduating_interval_days, 2);
        assert_eq!(config.easy_interval_days, EASY_INTERVAL_DAYS);
    }
}
