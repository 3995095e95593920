//! Database Migrations
//!
//! Handles schema creation and versioned migrations.

use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use tracing::{info, warn};

/// Current database schema version
const SCHEMA_VERSION: i32 = 3;

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    let current_version = get_current_version(pool).await?;

    if current_version < SCHEMA_VERSION {
        info!(
            "Running database migrations from v{} to v{}",
            current_version, SCHEMA_VERSION
        );

        for version in (current_version + 1)..=SCHEMA_VERSION {
            run_migration(pool, version).await?;
        }

        info!("Database migrations completed successfully");
    }

    Ok(())
}

/// Get the current schema version
async fn get_current_version(pool: &SqlitePool) -> Result<i32, sqlx::Error> {
    let result = sqlx::query("SELECT MAX(version) as version FROM _migrations")
        .fetch_optional(pool)
        .await?;

    Ok(result
        .and_then(|row| row.try_get::<i32, _>("version").ok())
        .unwrap_or(0))
}

/// Run a specific migration version
async fn run_migration(pool: &SqlitePool, version: i32) -> Result<(), sqlx::Error> {
    let (name, sql) = match version {
        1 => ("initial_schema", MIGRATION_V1),
        2 => ("word_audio_fields", MIGRATION_V2),
        3 => ("fetch_jobs", MIGRATION_V3),
        _ => {
            warn!("Unknown migration version: {}", version);
            return Ok(());
        }
    };

    info!("Applying migration v{}: {}", version, name);

    for statement in sql.split(';').filter(|s| !s.trim().is_empty()) {
        sqlx::query(statement.trim()).execute(pool).await?;
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(version)
        .bind(name)
        .execute(pool)
        .await?;

    Ok(())
}

/// Migration v1: words and sets tables
const MIGRATION_V1: &str = r#"
CREATE TABLE IF NOT EXISTS words (
    id TEXT PRIMARY KEY,
    word TEXT NOT NULL,
    phonetics TEXT NOT NULL,
    definitions TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    set_name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sets (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    number_of_words INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_words_timestamp ON words(timestamp DESC);
CREATE INDEX IF NOT EXISTS idx_words_set_name ON words(set_name);
CREATE INDEX IF NOT EXISTS idx_words_word ON words(word);
CREATE UNIQUE INDEX IF NOT EXISTS idx_sets_name ON sets(name)
"#;

/// Migration v2: per-word audio download tracking
const MIGRATION_V2: &str = r#"
ALTER TABLE words ADD COLUMN audio_url TEXT;
ALTER TABLE words ADD COLUMN audio_file_path TEXT;
ALTER TABLE words ADD COLUMN audio_download_status INTEGER NOT NULL DEFAULT 0
"#;

/// Migration v3: durable fetch job queue
const MIGRATION_V3: &str = r#"
CREATE TABLE IF NOT EXISTS fetch_jobs (
    id TEXT PRIMARY KEY,
    set_name TEXT NOT NULL,
    words TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    created_at TEXT NOT NULL,
    completed_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_fetch_jobs_status ON fetch_jobs(status)
"#;
