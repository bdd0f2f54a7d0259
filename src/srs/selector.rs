//! Due-queue assembly.
//!
//! Builds the bounded batch of cards to present next: learning and
//! relearning cards first (their delays are minutes, not days), then due
//! reviews with the day's remaining new-card allowance spread through them.

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::config::SrsConfig;
use crate::db;
use crate::domain::Card;
use crate::error::{Error, Result};

/// Queue sizes for a deck at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueCounts {
  pub learning: i64,
  pub review: i64,
  /// New cards still introducible today (bounded by the daily budget)
  pub new_available: i64,
}

/// Select the ordered batch of cards to present next.
///
/// Selection mutates nothing: the daily new-card counter advances when a New
/// card is actually studied, so repeated calls with the same `now` and no
/// intervening ratings return the same ordered set. `limit` truncates the
/// result but never fabricates cards; an empty result is valid.
pub fn select_due(
  conn: &Connection,
  config: &SrsConfig,
  deck_id: i64,
  now: DateTime<Utc>,
  limit: usize,
) -> Result<Vec<Card>> {
  let deck = db::decks::get_deck_by_id(conn, deck_id)?
    .filter(|d| d.deleted_at.is_none())
    .ok_or_else(|| Error::NotFound(format!("deck {}", deck_id)))?;

  if limit == 0 {
    return Ok(vec![]);
  }

  let learning = db::cards::get_learning_due(conn, deck_id, now)?;
  let reviews = db::cards::get_review_due(conn, deck_id, now)?;

  let introduced = db::decks::get_daily_new_count(conn, deck_id, config.local_day(now))?;
  let allowance = (deck.new_cards_per_day - introduced).max(0) as usize;
  let new_cards = db::cards::get_new_cards(conn, deck_id, allowance)?;

  tracing::debug!(
    deck_id,
    learning = learning.len(),
    reviews = reviews.len(),
    new = new_cards.len(),
    limit,
    "assembling due queue"
  );

  let mut queue = learning;
  queue.extend(interleave(reviews, new_cards));
  queue.truncate(limit);
  Ok(queue)
}

/// Queue sizes without assembling the queue (for badges and dashboards)
pub fn due_counts(
  conn: &Connection,
  config: &SrsConfig,
  deck_id: i64,
  now: DateTime<Utc>,
) -> Result<DueCounts> {
  let deck = db::decks::get_deck_by_id(conn, deck_id)?
    .filter(|d| d.deleted_at.is_none())
    .ok_or_else(|| Error::NotFound(format!("deck {}", deck_id)))?;

  let introduced = db::decks::get_daily_new_count(conn, deck_id, config.local_day(now))?;
  let allowance = (deck.new_cards_per_day - introduced).max(0);
  let new_in_deck = db::cards::get_new_card_count(conn, deck_id)?;

  Ok(DueCounts {
    learning: db::cards::get_learning_due_count(conn, deck_id, now)?,
    review: db::cards::get_review_due_count(conn, deck_id, now)?,
    new_available: allowance.min(new_in_deck),
  })
}

/// When the next scheduled card becomes due, if any
pub fn next_due_at(
  conn: &Connection,
  deck_id: i64,
  now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>> {
  Ok(db::cards::get_next_due_at(conn, deck_id, now)?)
}

/// Spread new cards evenly through the review run: one new card after every
/// `stride` reviews, leftovers appended.
fn interleave(reviews: Vec<Card>, new_cards: Vec<Card>) -> Vec<Card> {
  if new_cards.is_empty() {
    return reviews;
  }
  if reviews.is_empty() {
    return new_cards;
  }

  let stride = reviews.len().div_ceil(new_cards.len() + 1).max(1);
  let mut out = Vec::with_capacity(reviews.len() + new_cards.len());
  let mut remaining_new = new_cards.into_iter();

  for (i, card) in reviews.into_iter().enumerate() {
    out.push(card);
    if (i + 1) % stride == 0 {
      if let Some(new_card) = remaining_new.next() {
        out.push(new_card);
      }
    }
  }
  out.extend(remaining_new);
  out
}
