//! Single-row snapshot persistence
//!
//! The whole session lives in one row of `player_state`, keyed by a fixed id
//! and replaced wholesale on every write. The row is deleted on graceful
//! shutdown so a restarted hub starts empty.

use cowatch_common::PlaybackSnapshot;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;

/// Fixed key of the only row
pub const SESSION_ROW_ID: i64 = 1;

/// Database file location under the data folder
pub fn database_path(data_folder: &Path) -> PathBuf {
    data_folder.join("session").join("session.db")
}

/// Handle to the durable snapshot row
#[derive(Clone)]
pub struct SnapshotStore {
    pool: SqlitePool,
}

impl SnapshotStore {
    /// Open (creating if needed) the database at `db_path`
    pub async fn open(db_path: &Path) -> Result<Self> {
        let newly_created = !db_path.exists();

        if let Some(parent) = db_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
                info!("Created session directory {}", parent.display());
            }
        }

        // mode=rwc: create the file on first run
        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect(&db_url)
            .await?;

        if newly_created {
            info!("Initialized new database: {}", db_path.display());
        } else {
            info!("Opened existing database: {}", db_path.display());
        }

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, creating the table if it does not exist
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query("PRAGMA busy_timeout = 5000")
            .execute(&pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS player_state (
                id INTEGER PRIMARY KEY,
                data TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    /// Read the persisted snapshot, if any
    pub async fn load(&self) -> Result<Option<PlaybackSnapshot>> {
        let row: Option<String> = sqlx::query_scalar("SELECT data FROM player_state WHERE id = ?")
            .bind(SESSION_ROW_ID)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    /// Replace the row with `snapshot`
    pub async fn save(&self, snapshot: &PlaybackSnapshot) -> Result<()> {
        let data = serde_json::to_string(snapshot)?;
        sqlx::query("INSERT OR REPLACE INTO player_state (id, data) VALUES (?, ?)")
            .bind(SESSION_ROW_ID)
            .bind(data)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete the session row
    pub async fn wipe(&self) -> Result<()> {
        sqlx::query("DELETE FROM player_state")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Close the underlying pool, waiting for in-flight queries
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
