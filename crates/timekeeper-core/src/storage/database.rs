//! SQLite-backed persistent store.
//!
//! Holds the three core tables plus the message template bank:
//! - `work_history`: normalized time-tracking facts for the rolling window
//! - `project_patterns`: the learned per-project typical-hours cache
//! - `notification_history`: the append-only notification ledger
//! - `message_templates`: phrasings the notification text is drawn from
//!
//! Timestamps are stored as RFC3339 TEXT (UTC, second precision) so range
//! queries can compare lexicographically.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;

use crate::error::DatabaseError;

use super::data_dir;

/// Format a timestamp the way every stored column and query parameter
/// expects it. All comparisons rely on this single format.
pub fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Parse a stored timestamp back.
pub fn parse_ts(
    raw: &str,
    table: &'static str,
    column: &'static str,
) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::CorruptValue {
            table,
            column,
            message: format!("{raw:?}: {e}"),
        })
}

/// SQLite database for history, patterns and the notification ledger.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/timekeeper/timekeeper.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable or the
    /// database cannot be opened or migrated.
    pub fn open_default() -> crate::error::Result<Self> {
        let path = data_dir()?.join("timekeeper.db");
        Ok(Self::open(&path)?)
    }

    /// Open (and migrate) the database at an explicit path.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database. Used by tests and ephemeral runs.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS work_history (
                    id               INTEGER PRIMARY KEY AUTOINCREMENT,
                    project_id       TEXT NOT NULL,
                    project_name     TEXT NOT NULL,
                    start_time       TEXT NOT NULL,
                    end_time         TEXT,
                    duration_minutes INTEGER NOT NULL DEFAULT 0,
                    day_of_week      INTEGER NOT NULL,
                    is_weekend       INTEGER NOT NULL DEFAULT 0,
                    is_holiday       INTEGER NOT NULL DEFAULT 0,
                    hour_of_day      INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS project_patterns (
                    project_id                   TEXT PRIMARY KEY,
                    project_name                 TEXT NOT NULL,
                    weekday_typical_hours        TEXT NOT NULL DEFAULT '[]',
                    weekend_typical_hours        TEXT NOT NULL DEFAULT '[]',
                    weekday_avg_duration_minutes INTEGER NOT NULL DEFAULT 0,
                    weekend_avg_duration_minutes INTEGER NOT NULL DEFAULT 0,
                    last_worked_at               TEXT,
                    updated_at                   TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS notification_history (
                    id          INTEGER PRIMARY KEY AUTOINCREMENT,
                    category    TEXT NOT NULL,
                    project_id  TEXT,
                    message     TEXT NOT NULL,
                    notified_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS message_templates (
                    id               INTEGER PRIMARY KEY AUTOINCREMENT,
                    category         TEXT NOT NULL,
                    message_template TEXT NOT NULL,
                    UNIQUE(category, message_template)
                );

                CREATE INDEX IF NOT EXISTS idx_work_history_start
                    ON work_history(start_time);
                CREATE INDEX IF NOT EXISTS idx_work_history_project
                    ON work_history(project_id, start_time);
                CREATE INDEX IF NOT EXISTS idx_notification_history_category
                    ON notification_history(category, notified_at);",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }
}
