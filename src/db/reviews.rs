//! Review-event logging and the rating transaction

use chrono::{DateTime, Utc};
use rand::Rng;
use rusqlite::{Connection, Result, params};

use crate::config::SrsConfig;
use crate::domain::{Card, CardState, Rating, ReviewEvent};
use crate::error::Error;
use crate::srs::scheduler;

use super::{cards, decks};

pub fn insert_review_event(conn: &Connection, event: &ReviewEvent) -> Result<i64> {
    conn.execute(
        r#"
    INSERT INTO review_events (card_id, rating, time_spent_ms, reviewed_at)
    VALUES (?1, ?2, ?3, ?4)
    "#,
        params![
            event.card_id,
            event.rating.as_u8(),
            event.time_spent_ms,
            event.reviewed_at.to_rfc3339(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Full rating history of a card, oldest first
pub fn get_events_for_card(conn: &Connection, card_id: i64) -> Result<Vec<ReviewEvent>> {
    let mut stmt = conn.prepare(
        r#"
    SELECT id, card_id, rating, time_spent_ms, reviewed_at
    FROM review_events
    WHERE card_id = ?1
    ORDER BY reviewed_at ASC, id ASC
    "#,
    )?;

    let events = stmt
        .query_map(params![card_id], row_to_event)?
        .collect::<Result<Vec<_>>>()?;
    Ok(events)
}

/// Apply a rating to a stored card and persist the outcome atomically.
///
/// Loads the card, runs the rating processor, then writes the new card
/// state, appends the review event and advances the daily new-card counter
/// (when the card was New) inside one transaction. A rejected rating leaves
/// the stored card untouched.
pub fn record_review(
    conn: &Connection,
    config: &SrsConfig,
    card_id: i64,
    rating: u8,
    time_spent_ms: Option<i64>,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> crate::error::Result<(Card, ReviewEvent)> {
    let rating = Rating::from_u8(rating).ok_or(Error::InvalidRating(rating))?;

    let tx = conn.unchecked_transaction()?;

    let card = cards::get_card_by_id(&tx, card_id)?
        .filter(|c| c.deleted_at.is_none())
        .ok_or_else(|| Error::NotFound(format!("card {}", card_id)))?;

    let was_new = card.state == CardState::New;
    let (updated, mut event) =
        scheduler::apply_rating(&card, rating, time_spent_ms, now, config, rng)?;

    cards::update_card_after_review(&tx, &updated)?;
    event.id = insert_review_event(&tx, &event)?;

    if was_new {
        decks::increment_daily_new_count(&tx, card.deck_id, config.local_day(now))?;
    }

    tx.commit()?;

    tracing::debug!(
        card_id,
        rating = event.rating.as_u8(),
        state = updated.state.as_str(),
        "recorded review"
    );

    Ok((updated, event))
}

/// Convert a database row to a ReviewEvent
fn row_to_event(row: &rusqlite::Row) -> Result<ReviewEvent> {
    let rating_int: u8 = row.get(2)?;
    let reviewed_at_str: String = row.get(4)?;

    Ok(ReviewEvent {
        id: row.get(0)?,
        card_id: row.get(1)?,
        rating: Rating::from_u8(rating_int).unwrap_or(Rating::Good),
        time_spent_ms: row.get(3)?,
        reviewed_at: DateTime::parse_from_rfc3339(&reviewed_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Deck;
    use crate::testing::TestEnv;
    use chrono::Duration;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn setup(env: &TestEnv) -> (SrsConfig, i64, i64) {
        let config = SrsConfig {
            interval_fuzz: 0.0,
            ..SrsConfig::default()
        };
        let deck_id = decks::insert_deck(&env.conn, &Deck::new("d".to_string())).unwrap();
        let card_id = cards::insert_card(&env.conn, &Card::new(deck_id)).unwrap();
        (config, deck_id, card_id)
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(1)
    }

    #[test]
    fn test_record_review_persists_card_and_event() {
        let env = TestEnv::new().unwrap();
        let (config, deck_id, card_id) = setup(&env);
        let now = Utc::now();

        let (card, event) =
            record_review(&env.conn, &config, card_id, 3, Some(1800), now, &mut rng()).unwrap();

        assert_eq!(card.state, CardState::Learning);
        assert_eq!(event.card_id, card_id);
        assert!(event.id > 0);

        let stored = cards::get_card_by_id(&env.conn, card_id).unwrap().unwrap();
        assert_eq!(stored.state, CardState::Learning);
        assert_eq!(stored.review_count, 1);

        let events = get_events_for_card(&env.conn, card_id).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].rating, Rating::Good);
        assert_eq!(events[0].time_spent_ms, Some(1800));

        // The card was New, so the day's introduction counter advanced
        let day = config.local_day(now);
        assert_eq!(decks::get_daily_new_count(&env.conn, deck_id, day).unwrap(), 1);
    }

    #[test]
    fn test_invalid_rating_rejected_without_mutation() {
        let env = TestEnv::new().unwrap();
        let (config, deck_id, card_id) = setup(&env);
        let now = Utc::now();

        let result = record_review(&env.conn, &config, card_id, 5, None, now, &mut rng());
        assert!(matches!(result, Err(Error::InvalidRating(5))));

        let stored = cards::get_card_by_id(&env.conn, card_id).unwrap().unwrap();
        assert_eq!(stored.state, CardState::New);
        assert_eq!(stored.review_count, 0);
        assert!(get_events_for_card(&env.conn, card_id).unwrap().is_empty());
        let day = config.local_day(now);
        assert_eq!(decks::get_daily_new_count(&env.conn, deck_id, day).unwrap(), 0);
    }

    #[test]
    fn test_clock_regression_rejected_without_mutation() {
        let env = TestEnv::new().unwrap();
        let (config, _, card_id) = setup(&env);
        let now = Utc::now();

        record_review(&env.conn, &config, card_id, 3, None, now, &mut rng()).unwrap();
        let result = record_review(
            &env.conn,
            &config,
            card_id,
            3,
            None,
            now - Duration::minutes(10),
            &mut rng(),
        );
        assert!(matches!(result, Err(Error::ClockRegression { .. })));

        let stored = cards::get_card_by_id(&env.conn, card_id).unwrap().unwrap();
        assert_eq!(stored.review_count, 1);
        assert_eq!(get_events_for_card(&env.conn, card_id).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_card_not_found() {
        let env = TestEnv::new().unwrap();
        let (config, _, _) = setup(&env);

        let result = record_review(&env.conn, &config, 9999, 3, None, Utc::now(), &mut rng());
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_deleted_card_not_found() {
        let env = TestEnv::new().unwrap();
        let (config, _, card_id) = setup(&env);
        let now = Utc::now();

        cards::soft_delete_card(&env.conn, card_id, now).unwrap();
        let result = record_review(&env.conn, &config, card_id, 3, None, now, &mut rng());
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_counter_only_advances_on_first_study() {
        let env = TestEnv::new().unwrap();
        let (config, deck_id, card_id) = setup(&env);
        let now = Utc::now();

        record_review(&env.conn, &config, card_id, 3, None, now, &mut rng()).unwrap();
        record_review(
            &env.conn,
            &config,
            card_id,
            3,
            None,
            now + Duration::minutes(2),
            &mut rng(),
        )
        .unwrap();

        let day = config.local_day(now);
        assert_eq!(decks::get_daily_new_count(&env.conn, deck_id, day).unwrap(), 1);
    }

    #[test]
    fn test_events_append_in_order() {
        let env = TestEnv::new().unwrap();
        let (config, _, card_id) = setup(&env);
        let now = Utc::now();

        record_review(&env.conn, &config, card_id, 1, None, now, &mut rng()).unwrap();
        record_review(
            &env.conn,
            &config,
            card_id,
            3,
            None,
            now + Duration::minutes(1),
            &mut rng(),
        )
        .unwrap();

        let events = get_events_for_card(&env.conn, card_id).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].rating, Rating::Again);
        assert_eq!(events[1].rating, Rating::Good);
        assert!(events[0].reviewed_at < events[1].reviewed_at);
    }
}
