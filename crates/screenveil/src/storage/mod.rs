//! Storage layer for screenveil.
//!
//! This module provides `SQLite`-based persistence for user settings and
//! the share session history. Settings are read once at startup and
//! written on change; session state itself is never stored.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::detect::ShareSource;
use crate::error::{Error, Result};
use crate::settings::Settings;

/// Key under which the settings JSON is stored.
const SETTINGS_KEY: &str = "settings";

/// A recorded share session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareSessionRecord {
    /// Row id assigned by the store.
    pub id: i64,
    /// Platform the share originated from, if known.
    pub source: Option<ShareSource>,
    /// When the share started.
    pub started_at: DateTime<Utc>,
    /// When the share ended; `None` while still active.
    pub ended_at: Option<DateTime<Utc>>,
}

impl ShareSessionRecord {
    /// Whether the session is still open.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }
}

/// Persistent store for settings and share history.
#[derive(Debug)]
pub struct Store {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Store {
    /// Open or create a store at the given path.
    ///
    /// Creates the parent directories and database file if they don't
    /// exist. Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema
    /// initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // WAL for better concurrent read behavior
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings, falling back to defaults when none were saved yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the stored JSON is invalid.
    pub fn load_settings(&self) -> Result<Settings> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                [SETTINGS_KEY],
                |row| row.get(0),
            )
            .optional()?;

        match value {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Settings::default()),
        }
    }

    /// Persist settings, replacing whatever was saved before.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        let json = serde_json::to_string(settings)?;
        self.conn.execute(
            r"
            INSERT INTO settings (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3
            ",
            params![SETTINGS_KEY, json, Utc::now().to_rfc3339()],
        )?;
        debug!("Settings saved");
        Ok(())
    }

    /// Record the start of a share session. Returns the assigned id.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn record_share_started(
        &self,
        source: Option<ShareSource>,
        started_at: DateTime<Utc>,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO share_sessions (source, started_at) VALUES (?1, ?2)",
            params![
                source.map(|s| s.to_string()),
                started_at.to_rfc3339()
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(id, "Share session recorded");
        Ok(id)
    }

    /// Mark a share session as ended. Returns `false` if the id is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn record_share_stopped(&self, id: i64, ended_at: DateTime<Utc>) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE share_sessions SET ended_at = ?1 WHERE id = ?2 AND ended_at IS NULL",
            params![ended_at.to_rfc3339(), id],
        )?;
        Ok(changed > 0)
    }

    /// The most recent share sessions, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn recent_sessions(&self, limit: usize) -> Result<Vec<ShareSessionRecord>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, source, started_at, ended_at
            FROM share_sessions
            ORDER BY started_at DESC, id DESC
            LIMIT ?1
            ",
        )?;

        let rows = stmt.query_map([i64::try_from(limit).unwrap_or(i64::MAX)], |row| {
            let id: i64 = row.get(0)?;
            let source: Option<String> = row.get(1)?;
            let started_at: String = row.get(2)?;
            let ended_at: Option<String> = row.get(3)?;
            Ok((id, source, started_at, ended_at))
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            let (id, source, started_at, ended_at) = row?;
            sessions.push(ShareSessionRecord {
                id,
                source: source.and_then(|s| s.parse().ok()),
                started_at: parse_timestamp(&started_at)?,
                ended_at: ended_at.as_deref().map(parse_timestamp).transpose()?,
            });
        }
        Ok(sessions)
    }

    /// Total number of recorded share sessions.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn session_count(&self) -> Result<usize> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM share_sessions", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Delete all but the newest `max` share sessions.
    ///
    /// Returns the number of deleted rows. A `max` of 0 means unlimited
    /// (nothing is deleted).
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn prune_sessions(&self, max: usize) -> Result<usize> {
        if max == 0 {
            return Ok(0);
        }
        let deleted = self.conn.execute(
            r"
            DELETE FROM share_sessions
            WHERE id NOT IN (
                SELECT id FROM share_sessions
                ORDER BY started_at DESC, id DESC
                LIMIT ?1
            )
            ",
            [i64::try_from(max).unwrap_or(i64::MAX)],
        )?;
        if deleted > 0 {
            debug!(deleted, "Pruned old share sessions");
        }
        Ok(deleted)
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::internal(format!("invalid timestamp '{value}': {e}")))
}
