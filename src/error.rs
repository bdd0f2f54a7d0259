//! Error types for the cardbox scheduling core.

use chrono::{DateTime, Utc};

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for cardbox operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Rating outside the accepted 1..=4 range; rejected before any mutation
    #[error("invalid rating {0}: must be 1 (Again) through 4 (Easy)")]
    InvalidRating(u8),

    /// `now` precedes the card's last review; rejected, no partial update
    #[error("clock regression: now {now} precedes last review at {last_reviewed_at}")]
    ClockRegression {
        now: DateTime<Utc>,
        last_reviewed_at: DateTime<Utc>,
    },

    /// Referenced card or deck does not exist (or is soft-deleted)
    #[error("{0} not found")]
    NotFound(String),

    /// Database error
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    /// Configuration validation error
    #[error("configuration error: {0}")]
    Config(String),

    /// A thread panicked while holding the database lock
    #[error("database unavailable: lock poisoned")]
    LockPoisoned,
}
