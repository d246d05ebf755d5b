//! Shared test fixtures: an in-memory SQLite pool carrying the real schema.

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

/// Fresh in-memory database with migrations applied.
///
/// A single connection keeps every query in the test on the same
/// in-memory database (each new `:memory:` connection is its own store).
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("failed to open in-memory database");

    super::migrations::run_migrations(&pool)
        .await
        .expect("failed to run migrations");

    pool
}
