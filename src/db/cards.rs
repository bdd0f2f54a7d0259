//! Card CRUD and scheduling queries

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Result, params};

use crate::domain::{Card, CardState};

const CARD_COLUMNS: &str = r#"id, deck_id, state, learning_step, interval_minutes, ease_factor,
           due_at, review_count, laps_count, last_reviewed_at, first_reviewed_at,
           created_at, deleted_at"#;

pub fn insert_card(conn: &Connection, card: &Card) -> Result<i64> {
    conn.execute(
        r#"
    INSERT INTO cards (deck_id, state, learning_step, interval_minutes, ease_factor, due_at,
                       review_count, laps_count, last_reviewed_at, first_reviewed_at, created_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
    "#,
        params![
            card.deck_id,
            card.state.as_str(),
            card.learning_step,
            card.interval_minutes,
            card.ease_factor,
            card.due_at.to_rfc3339(),
            card.review_count,
            card.laps_count,
            card.last_reviewed_at.map(|dt| dt.to_rfc3339()),
            card.first_reviewed_at.map(|dt| dt.to_rfc3339()),
            card.created_at.to_rfc3339(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_card_by_id(conn: &Connection, id: i64) -> Result<Option<Card>> {
    conn.query_row(
        &format!("SELECT {} FROM cards WHERE id = ?1", CARD_COLUMNS),
        params![id],
        row_to_card,
    )
    .optional()
}

/// Learning/Relearning cards whose due time has passed, soonest first
pub fn get_learning_due(conn: &Connection, deck_id: i64, now: DateTime<Utc>) -> Result<Vec<Card>> {
    let mut stmt = conn.prepare(&format!(
        r#"
    SELECT {}
    FROM cards
    WHERE deck_id = ?1 AND deleted_at IS NULL
      AND state IN ('Learning', 'Relearning')
      AND due_at <= ?2
    ORDER BY due_at ASC, id ASC
    "#,
        CARD_COLUMNS
    ))?;

    let cards = stmt
        .query_map(params![deck_id, now.to_rfc3339()], row_to_card)?
        .collect::<Result<Vec<_>>>()?;
    Ok(cards)
}

/// Review cards whose due time has passed, most overdue first
pub fn get_review_due(conn: &Connection, deck_id: i64, now: DateTime<Utc>) -> Result<Vec<Card>> {
    let mut stmt = conn.prepare(&format!(
        r#"
    SELECT {}
    FROM cards
    WHERE deck_id = ?1 AND deleted_at IS NULL
      AND state = 'Review'
      AND due_at <= ?2
    ORDER BY due_at ASC, id ASC
    "#,
        CARD_COLUMNS
    ))?;

    let cards = stmt
        .query_map(params![deck_id, now.to_rfc3339()], row_to_card)?
        .collect::<Result<Vec<_>>>()?;
    Ok(cards)
}

/// New cards in insertion order, up to `limit`
pub fn get_new_cards(conn: &Connection, deck_id: i64, limit: usize) -> Result<Vec<Card>> {
    if limit == 0 {
        return Ok(vec![]);
    }

    let mut stmt = conn.prepare(&format!(
        r#"
    SELECT {}
    FROM cards
    WHERE deck_id = ?1 AND deleted_at IS NULL AND state = 'New'
    ORDER BY id ASC
    LIMIT ?2
    "#,
        CARD_COLUMNS
    ))?;

    let cards = stmt
        .query_map(params![deck_id, limit as i64], row_to_card)?
        .collect::<Result<Vec<_>>>()?;
    Ok(cards)
}

pub fn get_new_card_count(conn: &Connection, deck_id: i64) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM cards WHERE deck_id = ?1 AND deleted_at IS NULL AND state = 'New'",
        params![deck_id],
        |row| row.get(0),
    )
}

pub fn get_learning_due_count(conn: &Connection, deck_id: i64, now: DateTime<Utc>) -> Result<i64> {
    conn.query_row(
        r#"
    SELECT COUNT(*) FROM cards
    WHERE deck_id = ?1 AND deleted_at IS NULL
      AND state IN ('Learning', 'Relearning') AND due_at <= ?2
    "#,
        params![deck_id, now.to_rfc3339()],
        |row| row.get(0),
    )
}

pub fn get_review_due_count(conn: &Connection, deck_id: i64, now: DateTime<Utc>) -> Result<i64> {
    conn.query_row(
        r#"
    SELECT COUNT(*) FROM cards
    WHERE deck_id = ?1 AND deleted_at IS NULL
      AND state = 'Review' AND due_at <= ?2
    "#,
        params![deck_id, now.to_rfc3339()],
        |row| row.get(0),
    )
}

/// The next upcoming due time among scheduled (non-New) cards
pub fn get_next_due_at(
    conn: &Connection,
    deck_id: i64,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>> {
    let result: Option<String> = conn.query_row(
        r#"
    SELECT MIN(due_at) FROM cards
    WHERE deck_id = ?1 AND deleted_at IS NULL
      AND state != 'New' AND due_at > ?2
    "#,
        params![deck_id, now.to_rfc3339()],
        |row| row.get(0),
    )?;

    Ok(result.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }))
}

pub fn soft_delete_card(conn: &Connection, card_id: i64, now: DateTime<Utc>) -> Result<()> {
    conn.execute(
        "UPDATE cards SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
        params![now.to_rfc3339(), card_id],
    )?;
    Ok(())
}

/// Overwrite a card's scheduling fields with the rating processor's output.
///
/// The full field set is written in one statement so readers never observe a
/// partially-applied rating.
pub fn update_card_after_review(conn: &Connection, card: &Card) -> Result<()> {
    conn.execute(
        r#"
    UPDATE cards
    SET state = ?1, learning_step = ?2, interval_minutes = ?3, ease_factor = ?4,
        due_at = ?5, review_count = ?6, laps_count = ?7,
        last_reviewed_at = ?8, first_reviewed_at = ?9
    WHERE id = ?10
    "#,
        params![
            card.state.as_str(),
            card.learning_step,
            card.interval_minutes,
            card.ease_factor,
            card.due_at.to_rfc3339(),
            card.review_count,
            card.laps_count,
            card.last_reviewed_at.map(|dt| dt.to_rfc3339()),
            card.first_reviewed_at.map(|dt| dt.to_rfc3339()),
            card.id,
        ],
    )?;
    Ok(())
}

/// Convert a database row to a Card struct
pub(crate) fn row_to_card(row: &rusqlite::Row) -> Result<Card> {
    let state_str: String = row.get(2)?;
    let due_at_str: String = row.get(6)?;
    let last_reviewed_str: Option<String> = row.get(9)?;
    let first_reviewed_str: Option<String> = row.get(10)?;
    let created_at_str: String = row.get(11)?;
    let deleted_at_str: Option<String> = row.get(12)?;

    let parse = |s: &str| {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    };

    Ok(Card {
        id: row.get(0)?,
        deck_id: row.get(1)?,
        state: CardState::from_str(&state_str),
        learning_step: row.get(3)?,
        interval_minutes: row.get(4)?,
        ease_factor: row.get(5)?,
        due_at: parse(&due_at_str),
        review_count: row.get(7)?,
        laps_count: row.get(8)?,
        last_reviewed_at: last_reviewed_str.as_deref().map(parse),
        first_reviewed_at: first_reviewed_str.as_deref().map(parse),
        created_at: parse(&created_at_str),
        deleted_at: deleted_at_str.as_deref().map(parse),
    })
}
