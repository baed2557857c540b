//! Work-history ingestion.
//!
//! Pulls raw entries from the time-tracking provider for a rolling
//! window and stores a normalized copy. The whole window is replaced on
//! every run, so re-ingestion is idempotent; rows are never updated in
//! place.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::calendar::{self, DayType};
use crate::error::Result;
use crate::providers::{CalendarClassifier, TimeEntryHistoryProvider};
use crate::storage::database::{parse_ts, ts};
use crate::storage::Database;

/// A normalized, immutable time-tracking fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkHistoryEntry {
    pub project_id: String,
    pub project_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_minutes: i64,
    /// 0 = Monday .. 6 = Sunday.
    pub day_of_week: u32,
    pub is_weekend: bool,
    pub is_holiday: bool,
    pub hour_of_day: u32,
}

/// Normalizes and stores raw provider entries for the rolling window.
pub struct HistoryIngester {
    provider: Arc<dyn TimeEntryHistoryProvider>,
    calendar: Arc<dyn CalendarClassifier>,
}

impl HistoryIngester {
    pub fn new(
        provider: Arc<dyn TimeEntryHistoryProvider>,
        calendar: Arc<dyn CalendarClassifier>,
    ) -> Self {
        Self { provider, calendar }
    }

    /// Fetch `[now - window_days, now]` from the provider and replace the
    /// stored window with the normalized result.
    ///
    /// The fetch happens before any delete: a provider failure leaves the
    /// store untouched. Returns the number of entries stored; zero is a
    /// valid outcome.
    pub fn ingest(&self, db: &Database, now: DateTime<Utc>, window_days: u32) -> Result<usize> {
        let window_start = now - Duration::days(i64::from(window_days));
        debug!(
            from = %window_start.date_naive(),
            to = %now.date_naive(),
            "fetching work history"
        );

        let raw = self
            .provider
            .fetch(window_start, now)
            .map_err(|e| crate::error::CoreError::provider("history", e))?;

        let entries: Vec<WorkHistoryEntry> = raw
            .into_iter()
            .map(|entry| {
                let day_type = calendar::categorize(entry.start.date_naive(), &*self.calendar);
                let duration_minutes = if entry.duration_seconds > 0 {
                    entry.duration_seconds / 60
                } else {
                    // Running or invalid entries report non-positive durations.
                    0
                };
                WorkHistoryEntry {
                    project_id: entry
                        .project_id
                        .unwrap_or_else(|| "unknown".to_string()),
                    project_name: entry
                        .project_name
                        .or(entry.description)
                        .unwrap_or_else(|| "Untitled".to_string()),
                    start_time: entry.start,
                    end_time: entry.stop,
                    duration_minutes,
                    day_of_week: entry.start.weekday().num_days_from_monday(),
                    is_weekend: day_type == DayType::Weekend,
                    is_holiday: day_type == DayType::Holiday,
                    hour_of_day: entry.start.hour(),
                }
            })
            .collect();

        let conn = db.conn();
        let tx = conn.unchecked_transaction().map_err(crate::error::DatabaseError::from)?;
        // Replace-not-merge: clear the window, then drop anything that has
        // aged out of it entirely.
        tx.execute(
            "DELETE FROM work_history WHERE start_time >= ?1",
            params![ts(window_start)],
        )
        .map_err(crate::error::DatabaseError::from)?;
        tx.execute(
            "DELETE FROM work_history WHERE start_time < ?1",
            params![ts(window_start)],
        )
        .map_err(crate::error::DatabaseError::from)?;

        for entry in &entries {
            tx.execute(
                "INSERT INTO work_history
                 (project_id, project_name, start_time, end_time,
                  duration_minutes, day_of_week, is_weekend, is_holiday, hour_of_day)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    entry.project_id,
                    entry.project_name,
                    ts(entry.start_time),
                    entry.end_time.map(ts),
                    entry.duration_minutes,
                    entry.day_of_week,
                    entry.is_weekend,
                    entry.is_holiday,
                    entry.hour_of_day,
                ],
            )
            .map_err(crate::error::DatabaseError::from)?;
        }
        tx.commit().map_err(crate::error::DatabaseError::from)?;

        info!(count = entries.len(), "stored work history entries");
        Ok(entries.len())
    }
}

/// All stored entries with `start_time >= cutoff`, in insertion order.
pub fn entries_since(db: &Database, cutoff: DateTime<Utc>) -> Result<Vec<WorkHistoryEntry>> {
    let mut stmt = db.conn().prepare(
        "SELECT project_id, project_name, start_time, end_time,
                duration_minutes, day_of_week, is_weekend, is_holiday, hour_of_day
         FROM work_history
         WHERE start_time >= ?1
         ORDER BY id",
    )?;
    let rows = stmt.query_map(params![ts(cutoff)], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, Option<String>>(3)?,
            row.get::<_, i64>(4)?,
            row.get::<_, u32>(5)?,
            row.get::<_, bool>(6)?,
            row.get::<_, bool>(7)?,
            row.get::<_, u32>(8)?,
        ))
    })?;

    let mut entries = Vec::new();
    for row in rows {
        let (project_id, project_name, start, end, duration, dow, weekend, holiday, hour) =
            row.map_err(crate::error::DatabaseError::from)?;
        entries.push(WorkHistoryEntry {
            project_id,
            project_name,
            start_time: parse_ts(&start, "work_history", "start_time")?,
            end_time: end
                .map(|raw| parse_ts(&raw, "work_history", "end_time"))
                .transpose()?,
            duration_minutes: duration,
            day_of_week: dow,
            is_weekend: weekend,
            is_holiday: holiday,
            hour_of_day: hour,
        });
    }
    Ok(entries)
}

/// The most recent `start_time` across all stored history, if any.
pub fn last_start_time(db: &Database) -> Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = db
        .conn()
        .query_row("SELECT MAX(start_time) FROM work_history", [], |row| {
            row.get(0)
        })
        .map_err(crate::error::DatabaseError::from)?;
    raw.map(|raw| parse_ts(&raw, "work_history", "start_time").map_err(Into::into))
        .transpose()
}
