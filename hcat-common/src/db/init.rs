//! Database initialization
//!
//! Creates the database on first run and brings the schema up idempotently.
//! Every `create_*` function is safe to call repeatedly.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Milliseconds a connection waits for a competing writer before failing
pub const BUSY_TIMEOUT_MS: u64 = 5000;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Pragmas go on the connect options so every pooled connection gets them
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create every table and index used by the catalog services
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_artifacts_table(pool).await?;
    create_artifact_images_table(pool).await?;
    create_feedback_table(pool).await?;
    create_api_tokens_table(pool).await?;
    Ok(())
}

/// Artifacts are owned by the catalog CRUD service; this core only patches them
pub async fn create_artifacts_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS artifacts (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            category TEXT NOT NULL,
            tags TEXT NOT NULL DEFAULT '[]',
            location TEXT,
            image_url TEXT,
            status TEXT NOT NULL DEFAULT 'published',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_artifact_images_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS artifact_images (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            artifact_id TEXT NOT NULL REFERENCES artifacts(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            url TEXT NOT NULL,
            public_id TEXT,
            is_primary INTEGER NOT NULL DEFAULT 0 CHECK (is_primary IN (0, 1)),
            UNIQUE (artifact_id, position)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // At most one primary image per artifact
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_artifact_images_single_primary
        ON artifact_images(artifact_id) WHERE is_primary = 1
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Feedback rows reference artifacts loosely: an artifact may be removed
/// externally while feedback about it is still pending.
pub async fn create_feedback_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS feedback (
            id TEXT PRIMARY KEY,
            artifact_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            username TEXT NOT NULL,
            feedback_type TEXT NOT NULL
                CHECK (feedback_type IN ('edit_suggestion', 'new_info', 'correction', 'general')),
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'approved', 'rejected')),
            suggested_changes TEXT NOT NULL DEFAULT '{}',
            suggested_images TEXT NOT NULL DEFAULT '[]',
            reviewed_by TEXT,
            review_note TEXT,
            reviewed_at TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    for (name, column) in [
        ("idx_feedback_artifact", "artifact_id"),
        ("idx_feedback_status", "status"),
        ("idx_feedback_user", "user_id"),
        ("idx_feedback_created", "created_at"),
    ] {
        let sql = format!(
            "CREATE INDEX IF NOT EXISTS {} ON feedback({})",
            name, column
        );
        sqlx::query(&sql).execute(pool).await?;
    }

    Ok(())
}

/// Bearer tokens are issued elsewhere; only their SHA-256 hashes are stored
pub async fn create_api_tokens_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS api_tokens (
            token_hash TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            username TEXT NOT NULL,
            role TEXT NOT NULL CHECK (role IN ('user', 'elder', 'admin')),
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
