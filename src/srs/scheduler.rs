use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::config::{self, SrsConfig};
use crate::domain::{Card, CardState, MINUTES_PER_DAY, Rating, ReviewEvent};
use crate::error::{Error, Result};

/// Apply a rating to a card and compute its next schedule.
///
/// Pure function over its inputs: no I/O, randomness injected through `rng`
/// so interval fuzz is seedable in tests. Returns the updated card together
/// with the review event to persist; the caller owns both writes and must
/// serialize concurrent ratings per card.
///
/// State machine:
///   - New: enters Learning at step 0; Easy graduates straight to Review
///   - Learning/Relearning: Again resets to step 0, Hard repeats the step,
///     Good climbs the ladder and graduates past its end, Easy graduates
///     immediately with the larger seed
///   - Review: interval grows from the ease factor (Hard/Good/Easy) or the
///     card lapses into Relearning (Again)
pub fn apply_rating(
  card: &Card,
  rating: Rating,
  time_spent_ms: Option<i64>,
  now: DateTime<Utc>,
  config: &SrsConfig,
  rng: &mut impl Rng,
) -> Result<(Card, ReviewEvent)> {
  if let Some(last) = card.last_reviewed_at {
    if now < last {
      return Err(Error::ClockRegression {
        now,
        last_reviewed_at: last,
      });
    }
  }

  let mut next = card.clone();

  // learning_step is undefined outside Learning/Relearning; never trust it
  if !next.state.in_learning_phase() {
    next.learning_step = 0;
  }

  match next.state {
    CardState::New => rate_new(&mut next, rating, now, config),
    CardState::Learning | CardState::Relearning => {
      rate_learning_phase(&mut next, rating, now, config)
    }
    CardState::Review => rate_review(&mut next, rating, now, config, rng),
  }

  next.review_count += 1;
  next.last_reviewed_at = Some(now);
  if next.first_reviewed_at.is_none() {
    next.first_reviewed_at = Some(now);
  }

  let event = ReviewEvent::new(card.id, rating, time_spent_ms, now);
  Ok((next, event))
}

/// First rating on a New card
fn rate_new(card: &mut Card, rating: Rating, now: DateTime<Utc>, config: &SrsConfig) {
  match rating {
    Rating::Easy => {
      card.ease_factor = config.starting_ease;
      graduate(card, config.easy_interval_days, now);
    }
    _ => {
      card.state = CardState::Learning;
      schedule_step(card, 0, now, config);
    }
  }
}

/// Rating while the card climbs the step ladder (Learning or Relearning)
fn rate_learning_phase(card: &mut Card, rating: Rating, now: DateTime<Utc>, config: &SrsConfig) {
  match rating {
    Rating::Again => schedule_step(card, 0, now, config),
    Rating::Hard => schedule_step(card, card.learning_step, now, config),
    Rating::Good => {
      let next_step = card.learning_step + 1;
      if next_step as usize >= config.ladder().len() {
        let seed = if card.state == CardState::Relearning {
          config.relearn_interval_days
        } else {
          config.graduating_interval_days
        };
        graduate(card, seed, now);
      } else {
        schedule_step(card, next_step, now, config);
      }
    }
    Rating::Easy => graduate(card, config.easy_interval_days, now),
  }
}

/// Rating on a graduated card
fn rate_review(
  card: &mut Card,
  rating: Rating,
  now: DateTime<Utc>,
  config: &SrsConfig,
  rng: &mut impl Rng,
) {
  if rating == Rating::Again {
    card.laps_count += 1;
    card.ease_factor = (card.ease_factor - config.lapse_ease_penalty).max(config.minimum_ease);
    card.state = CardState::Relearning;
    schedule_step(card, 0, now, config);
    return;
  }

  let prev_days = card.interval_days().max(1.0);
  let (grown_days, new_ease) = match rating {
    Rating::Hard => (
      prev_days * config.hard_interval_factor,
      (card.ease_factor - config.hard_ease_penalty).max(config.minimum_ease),
    ),
    Rating::Good => (prev_days * card.ease_factor, card.ease_factor),
    Rating::Easy => (
      prev_days * card.ease_factor * config.easy_bonus,
      card.ease_factor + config.easy_ease_bonus,
    ),
    Rating::Again => unreachable!("lapse handled above"),
  };

  let rounded = grown_days.round().max(1.0) as i64;
  let fuzzed = fuzz_interval_days(rounded, config.interval_fuzz, rng);

  card.ease_factor = new_ease;
  card.learning_step = 0;
  card.interval_minutes = fuzzed * MINUTES_PER_DAY;
  card.due_at = now + Duration::days(fuzzed);
}

/// Place the card on a ladder step and schedule its short delay
fn schedule_step(card: &mut Card, step: i64, now: DateTime<Utc>, config: &SrsConfig) {
  let ladder = config.ladder();
  let idx = (step.max(0) as usize).min(ladder.len().saturating_sub(1));
  let minutes = ladder.get(idx).copied().unwrap_or(config.first_step_minutes());

  card.learning_step = idx as i64;
  card.interval_minutes = minutes;
  card.due_at = now + Duration::minutes(minutes);
}

/// Move the card to Review with a whole-day seed interval
fn graduate(card: &mut Card, interval_days: i64, now: DateTime<Utc>) {
  let days = interval_days.max(1);
  card.state = CardState::Review;
  card.learning_step = 0;
  card.interval_minutes = days * MINUTES_PER_DAY;
  card.due_at = now + Duration::days(days);
}

/// Perturb a computed review interval by ± the configured fraction.
///
/// Intervals under the fuzz minimum pass through untouched; the result never
/// drops below 1 day.
pub fn fuzz_interval_days(days: i64, fuzz: f64, rng: &mut impl Rng) -> i64 {
  if days < config::FUZZ_MINIMUM_DAYS || fuzz <= 0.0 {
    return days.max(1);
  }

  let span = ((days as f64 * fuzz).round() as i64).max(1);
  rng.random_range(days - span..=days + span).max(1)
}
