pub mod cards;
pub mod decks;
pub mod reviews;
pub mod schema;
pub mod stats;

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::{Card, Deck};
use crate::error::{Error, Result};

// Re-export all public items from submodules
pub use cards::*;
pub use decks::*;
pub use reviews::*;
pub use schema::run_migrations;
pub use stats::*;

pub type DbPool = Arc<Mutex<Connection>>;

/// Try to acquire the database lock, returning an error if poisoned
pub fn try_lock(pool: &DbPool) -> Result<MutexGuard<'_, Connection>> {
  pool.lock().map_err(|_: PoisonError<_>| {
    tracing::error!("Database mutex poisoned - a thread panicked while holding the lock");
    Error::LockPoisoned
  })
}

pub fn init_db(path: &Path) -> Result<DbPool> {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).ok();
  }

  // Create backup before migrations if database exists
  if path.exists() {
    let backup_path = path.with_extension("db.backup");
    if let Err(e) = std::fs::copy(path, &backup_path) {
      tracing::warn!("Could not create database backup: {}", e);
    }
  }

  let conn = Connection::open(path)?;
  schema::run_migrations(&conn)?;
  Ok(Arc::new(Mutex::new(conn)))
}

/// Seed a starter deck so a fresh install has something to schedule.
///
/// No-op when any deck already exists. Card content lives outside this
/// service; the seeded cards are scheduling records only.
pub fn seed_starter_deck(conn: &Connection) -> Result<i64> {
  let count: i64 = conn.query_row("SELECT COUNT(*) FROM decks", [], |row| row.get(0))?;
  if count > 0 {
    let id: i64 = conn.query_row("SELECT id FROM decks ORDER BY id LIMIT 1", [], |row| {
      row.get(0)
    })?;
    return Ok(id);
  }

  let deck_id = decks::insert_deck(conn, &Deck::new("Starter deck".to_string()))?;
  for _ in 0..10 {
    cards::insert_card(conn, &Card::new(deck_id))?;
  }

  tracing::info!("Seeded starter deck {} with 10 cards", deck_id);
  Ok(deck_id)
}
