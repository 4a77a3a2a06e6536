//! `SQLite` schema definitions for screenveil.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the settings key-value table.
pub const CREATE_SETTINGS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create the share session history table.
pub const CREATE_SHARE_SESSIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS share_sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source TEXT,
    started_at TEXT NOT NULL,
    ended_at TEXT
)
";

/// SQL statement to create an index on `started_at` for recency queries.
pub const CREATE_SESSIONS_STARTED_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_share_sessions_started ON share_sessions(started_at DESC)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_SETTINGS_TABLE,
    CREATE_SHARE_SESSIONS_TABLE,
    CREATE_SESSIONS_STARTED_INDEX,
    CREATE_METADATA_TABLE,
];
