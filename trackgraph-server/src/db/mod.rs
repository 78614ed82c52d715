//! SQLite snapshot storage
//!
//! The graph lives in memory; the database only holds the most recent
//! snapshot so a restarted service resumes with the same state.
//!
//! Identifiers and counters are `u64` in the graph and `INTEGER` (i64) in
//! SQLite; they are stored bit-for-bit (`as i64` / `as u64`), which
//! round-trips every value.

use std::path::Path;

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tracing::info;

use crate::error::Result;

mod snapshots;

pub use snapshots::{load_snapshot, save_snapshot};

/// Open (creating if needed) the snapshot database and its tables
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new snapshot database: {}", db_path.display());
    } else {
        info!("Opened existing snapshot database: {}", db_path.display());
    }

    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_tracks_table(&pool).await?;
    create_artists_table(&pool).await?;
    create_edges_table(&pool).await?;
    create_removed_tracks_table(&pool).await?;
    create_interactions_table(&pool).await?;
    create_graph_meta_table(&pool).await?;

    Ok(pool)
}

async fn create_tracks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tracks (
            track_id INTEGER PRIMARY KEY,
            metadata_uri TEXT NOT NULL,
            interaction_count INTEGER NOT NULL DEFAULT 0,
            seq INTEGER NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_artists_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS artists (
            identity TEXT PRIMARY KEY,
            metadata_uri TEXT NOT NULL,
            track_count INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_edges_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS edges (
            from_track INTEGER NOT NULL,
            to_track INTEGER NOT NULL,
            weight INTEGER NOT NULL CHECK (weight BETWEEN 0 AND 100),
            PRIMARY KEY (from_track, to_track)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_removed_tracks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS removed_tracks (
            track_id INTEGER PRIMARY KEY
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_interactions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS interactions (
            user TEXT NOT NULL,
            track_id INTEGER NOT NULL,
            kind TEXT NOT NULL CHECK (kind IN ('view', 'like', 'share')),
            first_at TEXT NOT NULL,
            last_at TEXT NOT NULL,
            PRIMARY KEY (user, track_id)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_graph_meta_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS graph_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}
