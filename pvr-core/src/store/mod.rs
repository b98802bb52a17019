//! Persistence store for the DVR core.
//!
//! SQLite-backed storage for:
//! - Backend client identities
//! - Channels and channel groups (TV and radio)
//! - Guide data per channel
//! - Per-channel playback settings, last-channel memory and the last
//!   guide scan timestamp

mod channel;
mod client;
mod group;
mod guide;
mod models;
mod schema;
mod settings;

pub use models::*;

use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

/// Store error types.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("client not found: {0}")]
    ClientNotFound(i64),

    #[error("channel not found: id={0}")]
    ChannelNotFound(i64),

    #[error("migration failed: {0}")]
    MigrationFailed(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Main database connection wrapper.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create a database at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let store = Self { conn };
        store.initialize_schema()?;

        Ok(store)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let store = Self { conn };
        store.initialize_schema()?;

        Ok(store)
    }

    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute_batch(schema::SCHEMA_SQL)?;
        self.apply_migrations()?;
        Ok(())
    }

    /// Add a column to a table if it doesn't exist.
    fn add_column_if_not_exists(&self, table: &str, column: &str, column_type: &str) -> Result<()> {
        let mut stmt = self.conn.prepare(&format!("PRAGMA table_info({})", table))?;
        let column_exists = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .filter_map(|r| r.ok())
            .any(|name| name == column);

        if !column_exists {
            let sql = format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, column_type);
            self.conn.execute(&sql, [])?;
            log::info!("Migration: Added column {} to table {}", column, table);
        }

        Ok(())
    }

    /// Apply pending migrations.
    fn apply_migrations(&self) -> Result<()> {
        // Migration 001: watch statistics did not exist in early schemas
        self.add_column_if_not_exists("channels", "watch_count", "INTEGER NOT NULL DEFAULT 0")?;
        self.add_column_if_not_exists("channels", "watch_seconds", "INTEGER NOT NULL DEFAULT 0")?;
        self.add_column_if_not_exists("channels", "last_watched", "INTEGER")?;

        // Migration 002: audio/subtitle delay settings
        self.add_column_if_not_exists("channel_settings", "audio_delay", "REAL NOT NULL DEFAULT 0.0")?;
        self.add_column_if_not_exists("channel_settings", "subtitle_delay", "REAL NOT NULL DEFAULT 0.0")?;

        Ok(())
    }

    /// Get the underlying connection (for advanced queries).
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

/// Last guide scan bookkeeping.
impl Store {
    /// Timestamp of the last full guide scan, if any.
    pub fn get_last_epg_scan(&self) -> Result<Option<i64>> {
        let result: std::result::Result<i64, _> =
            self.conn
                .query_row("SELECT scan_time FROM last_epg_scan WHERE id = 1", [], |row| {
                    row.get(0)
                });

        match result {
            Ok(ts) => Ok(Some(ts)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set_last_epg_scan(&self, scan_time: i64) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO last_epg_scan (id, scan_time) VALUES (1, ?1)",
            [scan_time],
        )?;
        Ok(())
    }
}
