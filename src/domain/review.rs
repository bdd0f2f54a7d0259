use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Learner's answer quality for a single review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rating {
  Again = 1,
  Hard = 2,
  Good = 3,
  Easy = 4,
}

impl Rating {
  pub fn from_u8(value: u8) -> Option<Self> {
    match value {
      1 => Some(Self::Again),
      2 => Some(Self::Hard),
      3 => Some(Self::Good),
      4 => Some(Self::Easy),
      _ => None,
    }
  }

  pub fn as_u8(&self) -> u8 {
    *self as u8
  }

  /// Everything but Again counts as a successful recall
  pub fn is_correct(&self) -> bool {
    !matches!(self, Self::Again)
  }
}

/// Append-only record of a single rating.
///
/// Events are never mutated or deleted; they are the sole input to the
/// statistics aggregator and survive card/deck soft-deletion for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewEvent {
  pub id: i64,
  pub card_id: i64,
  pub rating: Rating,
  pub time_spent_ms: Option<i64>,
  pub reviewed_at: DateTime<Utc>,
}

impl ReviewEvent {
  pub fn new(
    card_id: i64,
    rating: Rating,
    time_spent_ms: Option<i64>,
    reviewed_at: DateTime<Utc>,
  ) -> Self {
    Self {
      id: 0,
      card_id,
      rating,
      time_spent_ms,
      reviewed_at,
    }
  }
}
