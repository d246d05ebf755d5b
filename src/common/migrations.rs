// src/common/migrations.rs
//! Database schema management
//!
//! All statements are idempotent (`CREATE ... IF NOT EXISTS`), so the
//! whole pass runs unconditionally at every startup and from tests.

use sqlx::SqlitePool;
use tracing::info;

/// Run all database migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    create_tables(pool).await?;
    create_indexes(pool).await?;

    info!("Database migration completed");

    Ok(())
}

async fn create_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Users: one row per account. provider is 'email' or 'google';
    // provider_id carries the Google `sub` and is NULL for email users.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            name TEXT,
            picture TEXT,
            provider TEXT NOT NULL DEFAULT 'email',
            provider_id TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One-time passcodes. Rows are never reused: verification flips
    // consumed under a condition, and a fresh request marks prior
    // unconsumed rows for the same (email, purpose) consumed first.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS otps (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL,
            code TEXT NOT NULL,
            purpose TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            consumed INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notes (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            title TEXT NOT NULL,
            body TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // The unique (provider, provider_id) pair makes Google find-or-create
    // race-safe the same way the users.email UNIQUE column does for OTP
    // signups: concurrent inserts collapse onto one row.
    let indexes = vec![
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_provider_subject
         ON users(provider, provider_id) WHERE provider_id IS NOT NULL",
        "CREATE INDEX IF NOT EXISTS idx_otps_email_purpose
         ON otps(email, purpose, consumed)",
        "CREATE INDEX IF NOT EXISTS idx_notes_user_created
         ON notes(user_id, created_at)",
    ];

    for statement in indexes {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}
