use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cardbox::{config, db, srs};

fn main() {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cardbox=debug".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let srs_config = config::load_srs_config().expect("Invalid scheduling configuration");
  let db_path = config::load_database_path();
  let pool = db::init_db(&db_path).expect("Failed to initialize database");

  let conn = db::try_lock(&pool).expect("Database lock failed during startup");
  let deck_id = db::seed_starter_deck(&conn).expect("Failed to seed starter deck");

  let now = chrono::Utc::now();
  let counts =
    srs::due_counts(&conn, &srs_config, deck_id, now).expect("Failed to count due cards");
  let queue = srs::select_due(&conn, &srs_config, deck_id, now, config::DEFAULT_QUEUE_LIMIT)
    .expect("Failed to assemble due queue");
  tracing::info!(
    deck_id,
    learning = counts.learning,
    review = counts.review,
    new = counts.new_available,
    queued = queue.len(),
    "due queue ready"
  );

  if let Ok(Some(next)) = srs::next_due_at(&conn, deck_id, now) {
    tracing::info!("next scheduled card due at {}", next);
  }
}
