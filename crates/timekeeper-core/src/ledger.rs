//! Append-only notification ledger.
//!
//! Every emitted notification is recorded here; the classifier consults
//! the ledger to deduplicate. Records are never mutated, only pruned by
//! age — and pruning is driven by an external caller, the ledger keeps
//! no schedule of its own.

use chrono::{DateTime, Duration, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage::database::{parse_ts, ts};
use crate::storage::Database;

/// Notification categories the core emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    /// No timer running during an hour the project is normally active.
    SaboriReminder,
    /// Working well before the usual hours.
    EarlyStart,
    /// Working past the usual hours, but before deep night.
    LateWork,
    /// Still working deep into the night.
    DeepNightPraise,
}

impl NotificationCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationCategory::SaboriReminder => "sabori_reminder",
            NotificationCategory::EarlyStart => "early_start",
            NotificationCategory::LateWork => "late_work",
            NotificationCategory::DeepNightPraise => "deep_night_praise",
        }
    }

    /// The categories gated once per running timer session.
    pub const SESSION_SCOPED: [NotificationCategory; 3] = [
        NotificationCategory::EarlyStart,
        NotificationCategory::LateWork,
        NotificationCategory::DeepNightPraise,
    ];
}

impl std::fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ledger row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: i64,
    pub category: String,
    pub project_id: Option<String>,
    pub message: String,
    pub notified_at: DateTime<Utc>,
}

/// Append-only record of sent notifications.
pub struct NotificationLedger;

impl NotificationLedger {
    /// Append a record.
    pub fn record(
        db: &Database,
        category: NotificationCategory,
        project_id: Option<&str>,
        message: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        db.conn().execute(
            "INSERT INTO notification_history (category, project_id, message, notified_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![category.as_str(), project_id, message, ts(at)],
        )?;
        Ok(())
    }

    /// Whether a matching record exists with `notified_at >= now - window`.
    /// When `project_id` is given the match is scoped to that project.
    pub fn has_recent(
        db: &Database,
        category: NotificationCategory,
        window_minutes: i64,
        project_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let since = ts(now - Duration::minutes(window_minutes));
        let count: i64 = match project_id {
            Some(project_id) => db.conn().query_row(
                "SELECT COUNT(*) FROM notification_history
                 WHERE category = ?1 AND project_id = ?2 AND notified_at >= ?3",
                params![category.as_str(), project_id, since],
                |row| row.get(0),
            )?,
            None => db.conn().query_row(
                "SELECT COUNT(*) FROM notification_history
                 WHERE category = ?1 AND notified_at >= ?2",
                params![category.as_str(), since],
                |row| row.get(0),
            )?,
        };
        Ok(count > 0)
    }

    /// Whether a matching record exists for this project at any time in
    /// the retained ledger. The session-scope gate: "has this timer run
    /// already been flagged".
    pub fn has_any(
        db: &Database,
        category: NotificationCategory,
        project_id: &str,
    ) -> Result<bool> {
        let count: i64 = db.conn().query_row(
            "SELECT COUNT(*) FROM notification_history
             WHERE category = ?1 AND project_id = ?2",
            params![category.as_str(), project_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Delete records older than the retention horizon.
    pub fn prune(db: &Database, retention_days: u32, now: DateTime<Utc>) -> Result<usize> {
        let cutoff = ts(now - Duration::days(i64::from(retention_days)));
        let deleted = db.conn().execute(
            "DELETE FROM notification_history WHERE notified_at < ?1",
            params![cutoff],
        )?;
        Ok(deleted)
    }

    /// Most-recent-first listing, mainly for diagnostics and tests.
    pub fn recent(db: &Database, limit: u32) -> Result<Vec<NotificationRecord>> {
        let mut stmt = db.conn().prepare(
            "SELECT id, category, project_id, message, notified_at
             FROM notification_history
             ORDER BY notified_at DESC, id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, category, project_id, message, notified_at) =
                row.map_err(crate::error::DatabaseError::from)?;
            records.push(NotificationRecord {
                id,
                category,
                project_id,
                message,
                notified_at: parse_ts(&notified_at, "notification_history", "notified_at")?,
            });
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 5, 12, 0, 0).unwrap()
    }

    #[test]
    fn record_and_query_window() {
        let db = Database::open_memory().unwrap();
        NotificationLedger::record(
            &db,
            NotificationCategory::SaboriReminder,
            Some("p1"),
            "get to it",
            now() - Duration::minutes(10),
        )
        .unwrap();

        assert!(NotificationLedger::has_recent(
            &db,
            NotificationCategory::SaboriReminder,
            60,
            None,
            now()
        )
        .unwrap());
        // Outside a 5-minute window.
        assert!(!NotificationLedger::has_recent(
            &db,
            NotificationCategory::SaboriReminder,
            5,
            None,
            now()
        )
        .unwrap());
        // Different category.
        assert!(!NotificationLedger::has_recent(
            &db,
            NotificationCategory::LateWork,
            60,
            None,
            now()
        )
        .unwrap());
    }

    #[test]
    fn project_scoping() {
        let db = Database::open_memory().unwrap();
        NotificationLedger::record(
            &db,
            NotificationCategory::EarlyStart,
            Some("p1"),
            "early bird",
            now(),
        )
        .unwrap();

        assert!(NotificationLedger::has_recent(
            &db,
            NotificationCategory::EarlyStart,
            60,
            Some("p1"),
            now()
        )
        .unwrap());
        assert!(!NotificationLedger::has_recent(
            &db,
            NotificationCategory::EarlyStart,
            60,
            Some("p2"),
            now()
        )
        .unwrap());
    }

    #[test]
    fn has_any_ignores_age() {
        let db = Database::open_memory().unwrap();
        NotificationLedger::record(
            &db,
            NotificationCategory::DeepNightPraise,
            Some("p1"),
            "well done",
            now() - Duration::days(2),
        )
        .unwrap();

        assert!(
            NotificationLedger::has_any(&db, NotificationCategory::DeepNightPraise, "p1").unwrap()
        );
        assert!(
            !NotificationLedger::has_any(&db, NotificationCategory::DeepNightPraise, "p2").unwrap()
        );
    }

    #[test]
    fn prune_deletes_only_old_records() {
        let db = Database::open_memory().unwrap();
        NotificationLedger::record(
            &db,
            NotificationCategory::SaboriReminder,
            None,
            "old",
            now() - Duration::days(10),
        )
        .unwrap();
        NotificationLedger::record(
            &db,
            NotificationCategory::SaboriReminder,
            None,
            "fresh",
            now() - Duration::hours(1),
        )
        .unwrap();

        let deleted = NotificationLedger::prune(&db, 7, now()).unwrap();
        assert_eq!(deleted, 1);

        let left = NotificationLedger::recent(&db, 10).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].message, "fresh");
    }
}
