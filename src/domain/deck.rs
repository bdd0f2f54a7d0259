use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config;

/// A learner-owned collection of cards.
///
/// Each card belongs to exactly one deck. `new_cards_per_day` bounds how many
/// New cards the deck introduces per local calendar day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deck {
  pub id: i64,
  pub name: String,
  pub new_cards_per_day: i64,
  pub created_at: DateTime<Utc>,
  pub deleted_at: Option<DateTime<Utc>>,
}

impl Deck {
  pub fn new(name: String) -> Self {
    Self {
      id: 0,
      name,
      new_cards_per_day: config::DEFAULT_NEW_CARDS_PER_DAY,
      created_at: Utc::now(),
      deleted_at: None,
    }
  }
}
