use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config;

/// Minutes in a calendar day; review intervals are whole days stored as minutes
pub const MINUTES_PER_DAY: i64 = 1_440;

/// Scheduling state of a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardState {
  New,
  Learning,
  Review,
  Relearning,
}

impl CardState {
  pub fn from_str(s: &str) -> Self {
    match s {
      "Learning" => Self::Learning,
      "Review" => Self::Review,
      "Relearning" => Self::Relearning,
      _ => Self::New,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::New => "New",
      Self::Learning => "Learning",
      Self::Review => "Review",
      Self::Relearning => "Relearning",
    }
  }

  /// True while the card climbs the step ladder (learning_step is meaningful)
  pub fn in_learning_phase(&self) -> bool {
    matches!(self, Self::Learning | Self::Relearning)
  }
}

/// A card's scheduling record.
///
/// Content (front/back, media) is owned externally and referenced by `id`;
/// this struct carries only what the scheduler needs. All scheduling fields
/// are written exclusively by the rating processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
  pub id: i64,
  pub deck_id: i64,
  pub state: CardState,
  /// Index into the step ladder; held at 0 outside Learning/Relearning
  pub learning_step: i64,
  /// Current interval with sub-day precision (ladder steps are minutes)
  pub interval_minutes: i64,
  pub ease_factor: f64,
  pub due_at: DateTime<Utc>,
  pub review_count: i64,
  pub laps_count: i64,
  pub last_reviewed_at: Option<DateTime<Utc>>,
  pub first_reviewed_at: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
  pub deleted_at: Option<DateTime<Utc>>,
}

impl Card {
  pub fn new(deck_id: i64) -> Self {
    let now = Utc::now();
    Self {
      id: 0,
      deck_id,
      state: CardState::New,
      learning_step: 0,
      interval_minutes: 0,
      ease_factor: config::STARTING_EASE,
      due_at: now,
      review_count: 0,
      laps_count: 0,
      last_reviewed_at: None,
      first_reviewed_at: None,
      created_at: now,
      deleted_at: None,
    }
  }

  /// True iff the card's due time has passed.
  ///
  /// New cards are never time-due; they enter the queue through the daily
  /// new-card budget instead.
  pub fn is_due(&self, now: DateTime<Utc>) -> bool {
    self.state != CardState::New && self.due_at <= now
  }

  /// Current interval expressed in days
  pub fn interval_days(&self) -> f64 {
    self.interval_minutes as f64 / MINUTES_PER_DAY as f64
  }
}
