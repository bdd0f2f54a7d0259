//! Deck CRUD, settings and the daily new-card counter

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Result, params};

use crate::domain::Deck;

pub fn insert_deck(conn: &Connection, deck: &Deck) -> Result<i64> {
    conn.execute(
        r#"
    INSERT INTO decks (name, new_cards_per_day, created_at)
    VALUES (?1, ?2, ?3)
    "#,
        params![deck.name, deck.new_cards_per_day, deck.created_at.to_rfc3339()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_deck_by_id(conn: &Connection, id: i64) -> Result<Option<Deck>> {
    conn.query_row(
        r#"
    SELECT id, name, new_cards_per_day, created_at, deleted_at
    FROM decks WHERE id = ?1
    "#,
        params![id],
        row_to_deck,
    )
    .optional()
}

/// All decks that have not been soft-deleted
pub fn list_decks(conn: &Connection) -> Result<Vec<Deck>> {
    let mut stmt = conn.prepare(
        r#"
    SELECT id, name, new_cards_per_day, created_at, deleted_at
    FROM decks
    WHERE deleted_at IS NULL
    ORDER BY id ASC
    "#,
    )?;

    let decks = stmt
        .query_map([], row_to_deck)?
        .collect::<Result<Vec<_>>>()?;
    Ok(decks)
}

pub fn set_new_cards_per_day(conn: &Connection, deck_id: i64, cap: i64) -> Result<()> {
    conn.execute(
        "UPDATE decks SET new_cards_per_day = ?1 WHERE id = ?2",
        params![cap.max(0), deck_id],
    )?;
    Ok(())
}

/// Soft-delete a deck and all of its cards.
///
/// Review events are kept for audit; the deck and cards just stop appearing
/// in selection and statistics.
pub fn soft_delete_deck(conn: &Connection, deck_id: i64, now: DateTime<Utc>) -> Result<()> {
    let stamp = now.to_rfc3339();
    conn.execute(
        "UPDATE decks SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
        params![stamp, deck_id],
    )?;
    conn.execute(
        "UPDATE cards SET deleted_at = ?1 WHERE deck_id = ?2 AND deleted_at IS NULL",
        params![stamp, deck_id],
    )?;
    Ok(())
}

// ==================== Daily new-card counter ====================

/// New cards first studied in this deck on the given local day
pub fn get_daily_new_count(conn: &Connection, deck_id: i64, day: NaiveDate) -> Result<i64> {
    let count: Option<i64> = conn
        .query_row(
            "SELECT introduced FROM daily_new_counts WHERE deck_id = ?1 AND day = ?2",
            params![deck_id, day.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(count.unwrap_or(0))
}

pub fn increment_daily_new_count(conn: &Connection, deck_id: i64, day: NaiveDate) -> Result<()> {
    conn.execute(
        r#"
    INSERT INTO daily_new_counts (deck_id, day, introduced)
    VALUES (?1, ?2, 1)
    ON CONFLICT (deck_id, day) DO UPDATE SET introduced = introduced + 1
    "#,
        params![deck_id, day.to_string()],
    )?;
    Ok(())
}

/// Convert a database row to a Deck struct
fn row_to_deck(row: &rusqlite::Row) -> Result<Deck> {
    let created_at_str: String = row.get(3)?;
    let deleted_at_str: Option<String> = row.get(4)?;

    Ok(Deck {
        id: row.get(0)?,
        name: row.get(1)?,
        new_cards_per_day: row.get(2)?,
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        deleted_at: deleted_at_str.and_then(|s| {
            DateTime::parse_from_rfc3339(&s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        }),
    })
}
