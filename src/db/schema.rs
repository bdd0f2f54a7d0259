use rusqlite::{Connection, Result};

pub fn run_migrations(conn: &Connection) -> Result<()> {
  // Create tables with COMPLETE schema for new databases
  // Migrations below handle upgrades for existing databases
  conn.execute_batch(
    r#"
    CREATE TABLE IF NOT EXISTS decks (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      name TEXT NOT NULL,
      new_cards_per_day INTEGER NOT NULL DEFAULT 20,
      created_at TEXT NOT NULL,
      deleted_at TEXT
    );

    CREATE TABLE IF NOT EXISTS cards (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      deck_id INTEGER NOT NULL,
      state TEXT NOT NULL DEFAULT 'New',
      learning_step INTEGER NOT NULL DEFAULT 0,
      interval_minutes INTEGER NOT NULL DEFAULT 0,
      ease_factor REAL NOT NULL DEFAULT 2.5,
      due_at TEXT NOT NULL,
      review_count INTEGER NOT NULL DEFAULT 0,
      laps_count INTEGER NOT NULL DEFAULT 0,
      last_reviewed_at TEXT,
      first_reviewed_at TEXT,
      created_at TEXT NOT NULL,
      deleted_at TEXT,
      FOREIGN KEY (deck_id) REFERENCES decks(id)
    );

    CREATE TABLE IF NOT EXISTS review_events (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      card_id INTEGER NOT NULL,
      rating INTEGER NOT NULL,
      time_spent_ms INTEGER,
      reviewed_at TEXT NOT NULL,
      FOREIGN KEY (card_id) REFERENCES cards(id)
    );

    CREATE TABLE IF NOT EXISTS daily_new_counts (
      deck_id INTEGER NOT NULL,
      day TEXT NOT NULL,
      introduced INTEGER NOT NULL DEFAULT 0,
      PRIMARY KEY (deck_id, day)
    );

    -- Indexes
    CREATE INDEX IF NOT EXISTS idx_cards_deck_due ON cards(deck_id, due_at);
    CREATE INDEX IF NOT EXISTS idx_cards_deck_state ON cards(deck_id, state);
    CREATE INDEX IF NOT EXISTS idx_review_events_card_id ON review_events(card_id, reviewed_at);
    CREATE INDEX IF NOT EXISTS idx_review_events_reviewed_at ON review_events(reviewed_at);
    "#,
  )?;

  // ============================================================
  // MIGRATIONS FOR EXISTING DATABASES
  // These are no-ops for new databases (columns already exist)
  // ============================================================

  // Migration: review events gained a duration column
  add_column_if_missing(conn, "review_events", "time_spent_ms", "INTEGER")?;

  // Migration: soft deletion for decks and cards
  add_column_if_missing(conn, "decks", "deleted_at", "TEXT")?;
  add_column_if_missing(conn, "cards", "deleted_at", "TEXT")?;

  Ok(())
}

/// Check if a column exists in a table
fn column_exists(conn: &Connection, table: &str, column: &str) -> bool {
  conn
    .prepare(&format!("SELECT {} FROM {} LIMIT 1", column, table))
    .is_ok()
}

/// Add a column if it doesn't already exist
fn add_column_if_missing(conn: &Connection, table: &str, column: &str, column_def: &str) -> Result<()> {
  if !column_exists(conn, table, column) {
    conn.execute(
      &format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, column_def),
      [],
    )?;
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_migrations_idempotent() {
    let conn = Connection::open_in_memory().unwrap();
    run_migrations(&conn).unwrap();
    run_migrations(&conn).unwrap();

    let cards: i64 = conn
      .query_row("SELECT COUNT(*) FROM cards", [], |row| row.get(0))
      .unwrap();
    assert_eq!(cards, 0);
  }
}
