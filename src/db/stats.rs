//! Study statistics derived from the review-event log

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusqlite::{Connection, Result, params};

use crate::config::SrsConfig;

/// Summary metrics for a time range
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsSummary {
    /// Distinct cards with at least one review in range
    pub cards_studied: i64,
    pub total_reviews: i64,
    /// Reviews that were a card's first-ever rating
    pub new_cards_studied: i64,
    pub repeat_reviews: i64,
    pub total_time_ms: i64,
    pub average_time_ms: f64,
    /// Distinct local study days within the range
    pub distinct_days: i64,
    /// Consecutive local days with activity ending today or yesterday
    pub current_streak: i64,
}

/// One local calendar day of study activity
#[derive(Debug, Clone, PartialEq)]
pub struct DailyActivity {
    pub day: NaiveDate,
    pub reviews: i64,
    pub new_cards: i64,
    pub time_spent_ms: i64,
}

struct EventRow {
    reviewed_at: DateTime<Utc>,
    time_spent_ms: Option<i64>,
    card_id: i64,
    is_first: bool,
}

/// Aggregate review activity for a deck (or all decks) over `[since, until]`.
///
/// Zero-event ranges produce an all-zero summary. Events of soft-deleted
/// cards are excluded even though the rows remain in the log.
pub fn aggregate_stats(
    conn: &Connection,
    config: &SrsConfig,
    deck_id: Option<i64>,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<StatsSummary> {
    let events = fetch_events(conn, deck_id, Some((since, until)))?;

    let mut cards = BTreeSet::new();
    let mut days = BTreeSet::new();
    let mut new_cards_studied = 0;
    let mut total_time_ms = 0;
    let mut timed_reviews = 0;

    for event in &events {
        cards.insert(event.card_id);
        days.insert(config.local_day(event.reviewed_at));
        if event.is_first {
            new_cards_studied += 1;
        }
        if let Some(ms) = event.time_spent_ms {
            total_time_ms += ms;
            timed_reviews += 1;
        }
    }

    let total_reviews = events.len() as i64;
    let average_time_ms = if timed_reviews > 0 {
        total_time_ms as f64 / timed_reviews as f64
    } else {
        0.0
    };

    // The streak walks the full history, not just the requested range
    let all_days = study_days(conn, config, deck_id)?;

    Ok(StatsSummary {
        cards_studied: cards.len() as i64,
        total_reviews,
        new_cards_studied,
        repeat_reviews: total_reviews - new_cards_studied,
        total_time_ms,
        average_time_ms,
        distinct_days: days.len() as i64,
        current_streak: current_streak(&all_days, config.local_day(now)),
    })
}

/// Per-day activity for the trailing `days` local calendar days (oldest
/// first, zero-filled)
pub fn aggregate_history(
    conn: &Connection,
    config: &SrsConfig,
    deck_id: Option<i64>,
    days: u32,
    now: DateTime<Utc>,
) -> Result<Vec<DailyActivity>> {
    if days == 0 {
        return Ok(vec![]);
    }

    let today = config.local_day(now);
    let first_day = today - Duration::days(days as i64 - 1);

    // Over-fetch by a day to cover the UTC offset, then bucket by local day
    let since = now - Duration::days(days as i64 + 1);
    let events = fetch_events(conn, deck_id, Some((since, now)))?;

    let mut history: Vec<DailyActivity> = (0..days)
        .map(|i| DailyActivity {
            day: first_day + Duration::days(i as i64),
            reviews: 0,
            new_cards: 0,
            time_spent_ms: 0,
        })
        .collect();

    for event in &events {
        let day = config.local_day(event.reviewed_at);
        if day < first_day || day > today {
            continue;
        }
        let slot = (day - first_day).num_days() as usize;
        history[slot].reviews += 1;
        if event.is_first {
            history[slot].new_cards += 1;
        }
        history[slot].time_spent_ms += event.time_spent_ms.unwrap_or(0);
    }

    Ok(history)
}

/// Walk backward from the most recent active day; a missing day breaks the
/// chain. A streak only counts while it reaches today or yesterday.
pub fn current_streak(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> i64 {
    let yesterday = today - Duration::days(1);
    let mut cursor = if days.contains(&today) {
        today
    } else if days.contains(&yesterday) {
        yesterday
    } else {
        return 0;
    };

    let mut streak = 0;
    while days.contains(&cursor) {
        streak += 1;
        cursor = cursor - Duration::days(1);
    }
    streak
}

/// Every local day with at least one review in scope
fn study_days(
    conn: &Connection,
    config: &SrsConfig,
    deck_id: Option<i64>,
) -> Result<BTreeSet<NaiveDate>> {
    let events = fetch_events(conn, deck_id, None)?;
    Ok(events
        .iter()
        .map(|e| config.local_day(e.reviewed_at))
        .collect())
}

fn fetch_events(
    conn: &Connection,
    deck_id: Option<i64>,
    range: Option<(DateTime<Utc>, DateTime<Utc>)>,
) -> Result<Vec<EventRow>> {
    let deck_clause = if deck_id.is_some() {
        "AND c.deck_id = ?3"
    } else {
        ""
    };

    let query = format!(
        r#"
    SELECT e.reviewed_at, e.time_spent_ms, e.card_id,
           e.id = (SELECT MIN(e2.id) FROM review_events e2 WHERE e2.card_id = e.card_id)
    FROM review_events e
    JOIN cards c ON e.card_id = c.id
    WHERE c.deleted_at IS NULL
      AND e.reviewed_at >= ?1 AND e.reviewed_at <= ?2
      {}
    ORDER BY e.reviewed_at ASC, e.id ASC
    "#,
        deck_clause
    );

    // RFC3339 UTC strings compare lexicographically
    let (since, until) = match range {
        Some((since, until)) => (since.to_rfc3339(), until.to_rfc3339()),
        None => ("0000".to_string(), "9999".to_string()),
    };

    let mut stmt = conn.prepare(&query)?;
    let rows = match deck_id {
        Some(id) => stmt
            .query_map(params![since, until, id], row_to_event_row)?
            .collect::<Result<Vec<_>>>()?,
        None => stmt
            .query_map(params![since, until], row_to_event_row)?
            .collect::<Result<Vec<_>>>()?,
    };

    Ok(rows)
}

fn row_to_event_row(row: &rusqlite::Row) -> Result<EventRow> {
    let reviewed_at_str: String = row.get(0)?;

    Ok(EventRow {
        reviewed_at: DateTime::parse_from_rfc3339(&reviewed_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        time_spent_ms: row.get(1)?,
        card_id: row.get(2)?,
        is_first: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{cards, decks, reviews};
    use crate::domain::{Card, Deck, Rating, ReviewEvent};
    use crate::testing::TestEnv;
    use chrono::TimeZone;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn at(d: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, d, hour, 0, 0).unwrap()
    }

    fn seed_card(env: &TestEnv, deck_id: i64) -> i64 {
        cards::insert_card(&env.conn, &Card::new(deck_id)).unwrap()
    }

    fn seed_event(env: &TestEnv, card_id: i64, reviewed_at: DateTime<Utc>, time_ms: Option<i64>) {
        let event = ReviewEvent::new(card_id, Rating::Good, time_ms, reviewed_at);
        reviews::insert_review_event(&env.conn, &event).unwrap();
    }

    #[test]
    fn test_zero_events_returns_zeros() {
        let env = TestEnv::new().unwrap();
        let config = SrsConfig::default();

        let summary =
            aggregate_stats(&env.conn, &config, None, at(1, 0), at(10, 0), at(10, 12)).unwrap();

        assert_eq!(summary, StatsSummary::default());
    }

    #[test]
    fn test_basic_aggregation() {
        let env = TestEnv::new().unwrap();
        let config = SrsConfig::default();
        let deck_id = decks::insert_deck(&env.conn, &Deck::new("d".to_string())).unwrap();
        let a = seed_card(&env, deck_id);
        let b = seed_card(&env, deck_id);

        seed_event(&env, a, at(5, 9), Some(2000));
        seed_event(&env, a, at(6, 9), Some(4000));
        seed_event(&env, b, at(6, 10), None);

        let summary =
            aggregate_stats(&env.conn, &config, None, at(1, 0), at(10, 0), at(6, 12)).unwrap();

        assert_eq!(summary.cards_studied, 2);
        assert_eq!(summary.total_reviews, 3);
        assert_eq!(summary.new_cards_studied, 2);
        assert_eq!(summary.repeat_reviews, 1);
        assert_eq!(summary.total_time_ms, 6000);
        assert!((summary.average_time_ms - 3000.0).abs() < f64::EPSILON);
        assert_eq!(summary.distinct_days, 2);
        assert_eq!(summary.current_streak, 2); // day 5 and 6, ending today
    }

    #[test]
    fn test_range_filters_events() {
        let env = TestEnv::new().unwrap();
        let config = SrsConfig::default();
        let deck_id = decks::insert_deck(&env.conn, &Deck::new("d".to_string())).unwrap();
        let a = seed_card(&env, deck_id);

        seed_event(&env, a, at(1, 9), None);
        seed_event(&env, a, at(20, 9), None);

        let summary =
            aggregate_stats(&env.conn, &config, None, at(10, 0), at(25, 0), at(25, 12)).unwrap();

        assert_eq!(summary.total_reviews, 1);
        // The in-range event is not the card's first-ever rating
        assert_eq!(summary.new_cards_studied, 0);
        assert_eq!(summary.repeat_reviews, 1);
    }

    #[test]
    fn test_deck_scoping() {
        let env = TestEnv::new().unwrap();
        let config = SrsConfig::default();
        let deck_a = decks::insert_deck(&env.conn, &Deck::new("a".to_string())).unwrap();
        let deck_b = decks::insert_deck(&env.conn, &Deck::new("b".to_string())).unwrap();
        let card_a = seed_card(&env, deck_a);
        let card_b = seed_card(&env, deck_b);

        seed_event(&env, card_a, at(5, 9), None);
        seed_event(&env, card_b, at(5, 10), None);

        let summary =
            aggregate_stats(&env.conn, &config, Some(deck_a), at(1, 0), at(10, 0), at(5, 12))
                .unwrap();

        assert_eq!(summary.total_reviews, 1);
        assert_eq!(summary.cards_studied, 1);
    }

    #[test]
    fn test_deleted_cards_excluded_from_aggregates() {
        let env = TestEnv::new().unwrap();
        let config = SrsConfig::default();
        let deck_id = decks::insert_deck(&env.conn, &Deck::new("d".to_string())).unwrap();
        let a = seed_card(&env, deck_id);

        seed_event(&env, a, at(5, 9), None);
        cards::soft_delete_card(&env.conn, a, at(6, 0)).unwrap();

        let summary =
            aggregate_stats(&env.conn, &config, None, at(1, 0), at(10, 0), at(5, 12)).unwrap();

        assert_eq!(summary.total_reviews, 0);
        // The event row itself is still in the log for audit
        let raw: i64 = env
            .conn
            .query_row("SELECT COUNT(*) FROM review_events", [], |row| row.get(0))
            .unwrap();
        assert_eq!(raw, 1);
    }

    #[test]
    fn test_streak_consecutive_days() {
        let days: BTreeSet<NaiveDate> = [day(8), day(9), day(10)].into_iter().collect();
        assert_eq!(current_streak(&days, day(10)), 3);
    }

    #[test]
    fn test_streak_gap_breaks_chain() {
        // D-3, D-1, D: the gap at D-2 limits the run to D-1..D
        let days: BTreeSet<NaiveDate> = [day(7), day(9), day(10)].into_iter().collect();
        assert_eq!(current_streak(&days, day(10)), 2);
    }

    #[test]
    fn test_streak_ending_yesterday_counts() {
        let days: BTreeSet<NaiveDate> = [day(8), day(9)].into_iter().collect();
        assert_eq!(current_streak(&days, day(10)), 2);
    }

    #[test]
    fn test_streak_zero_when_stale() {
        let days: BTreeSet<NaiveDate> = [day(5), day(6)].into_iter().collect();
        assert_eq!(current_streak(&days, day(10)), 0);

        let empty = BTreeSet::new();
        assert_eq!(current_streak(&empty, day(10)), 0);
    }

    #[test]
    fn test_history_zero_fills_days() {
        let env = TestEnv::new().unwrap();
        let config = SrsConfig::default();
        let deck_id = decks::insert_deck(&env.conn, &Deck::new("d".to_string())).unwrap();
        let a = seed_card(&env, deck_id);

        seed_event(&env, a, at(9, 9), Some(1000));
        seed_event(&env, a, at(9, 10), Some(2000));

        let history = aggregate_history(&env.conn, &config, None, 3, at(10, 12)).unwrap();

        assert_eq!(history.len(), 3);
        assert_eq!(history[0].day, day(8));
        assert_eq!(history[0].reviews, 0);
        assert_eq!(history[1].day, day(9));
        assert_eq!(history[1].reviews, 2);
        assert_eq!(history[1].new_cards, 1);
        assert_eq!(history[1].time_spent_ms, 3000);
        assert_eq!(history[2].day, day(10));
        assert_eq!(history[2].reviews, 0);
    }

    #[test]
    fn test_history_zero_days_is_empty() {
        let env = TestEnv::new().unwrap();
        let config = SrsConfig::default();
        let history = aggregate_history(&env.conn, &config, None, 0, at(10, 12)).unwrap();
        assert!(history.is_empty());
    }
}
