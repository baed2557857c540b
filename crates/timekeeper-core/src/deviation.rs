//! Deviation classification.
//!
//! Compares "now" plus the current-activity signal against the learned
//! patterns and decides whether an anomaly notification is due. Two
//! branches:
//!
//! - idle: some project is normally active at this hour but no timer is
//!   running ("sabori" detection), deduplicated by a fixed 60-minute
//!   ledger window across projects;
//! - active: a timer is running outside the project's typical hours
//!   (too early, too late, or deep-night), gated once per running
//!   session via an unbounded per-project ledger look-back.
//!
//! The two suppression mechanisms are intentionally separate.
//!
//! The classifier reads the ledger but never writes it; recording is the
//! caller's job once the event is actually emitted.

use std::sync::Arc;

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calendar;
use crate::error::Result;
use crate::history;
use crate::ledger::{NotificationCategory, NotificationLedger};
use crate::messages::MessageCatalog;
use crate::pattern::{self, ProjectPattern};
use crate::providers::{ActivitySignal, CalendarClassifier};
use crate::storage::config::DetectionConfig;
use crate::storage::Database;

/// A notification-worthy deviation from the learned pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anomaly {
    pub category: NotificationCategory,
    pub project_id: Option<String>,
    pub project_name: String,
    pub message: String,
}

/// Decides whether the current moment deserves a notification.
pub struct DeviationClassifier {
    detection: DetectionConfig,
    calendar: Arc<dyn CalendarClassifier>,
}

impl DeviationClassifier {
    pub fn new(detection: DetectionConfig, calendar: Arc<dyn CalendarClassifier>) -> Self {
        Self {
            detection,
            calendar,
        }
    }

    /// Evaluate the current moment. Returns zero or more anomalies; the
    /// caller records emitted ones in the ledger.
    pub fn evaluate(
        &self,
        db: &Database,
        now: DateTime<Utc>,
        signal: Option<&ActivitySignal>,
    ) -> Result<Vec<Anomaly>> {
        if self.is_on_vacation(db, now)? {
            debug!("appears to be on vacation, suppressing notifications");
            return Ok(Vec::new());
        }

        let off_day = calendar::categorize(now.date_naive(), &*self.calendar).is_off();

        match signal {
            None => self.check_idle(db, now, off_day),
            Some(signal) => self.check_active(db, now, off_day, signal),
        }
    }

    /// Vacation guard: with no tracked work at all, or none for several
    /// days, every notification is suppressed.
    pub fn is_on_vacation(&self, db: &Database, now: DateTime<Utc>) -> Result<bool> {
        let last = match history::last_start_time(db)? {
            Some(last) => last,
            None => return Ok(true),
        };
        Ok((now - last).num_days() >= self.detection.vacation_after_days)
    }

    fn check_idle(&self, db: &Database, now: DateTime<Utc>, off_day: bool) -> Result<Vec<Anomaly>> {
        let hour = now.hour();
        let mut candidates: Vec<ProjectPattern> = pattern::load_patterns(db)?
            .into_iter()
            .filter(|p| p.typical_hours(off_day).contains(&hour))
            .collect();
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        // Most recently worked first; project id breaks remaining ties.
        candidates.sort_by(|a, b| {
            b.last_worked_at
                .cmp(&a.last_worked_at)
                .then_with(|| a.project_id.cmp(&b.project_id))
        });
        let expected = &candidates[0];

        // One idle reminder per window, regardless of which project it
        // pointed at.
        if NotificationLedger::has_recent(
            db,
            NotificationCategory::SaboriReminder,
            self.detection.sabori_suppress_minutes,
            None,
            now,
        )? {
            return Ok(Vec::new());
        }

        let message = MessageCatalog::random_message(
            db,
            NotificationCategory::SaboriReminder,
            &expected.project_name,
        )?;
        debug!(project = %expected.project_id, "idle during a typical hour");
        Ok(vec![Anomaly {
            category: NotificationCategory::SaboriReminder,
            project_id: Some(expected.project_id.clone()),
            project_name: expected.project_name.clone(),
            message,
        }])
    }

    fn check_active(
        &self,
        db: &Database,
        now: DateTime<Utc>,
        off_day: bool,
        signal: &ActivitySignal,
    ) -> Result<Vec<Anomaly>> {
        let project_id = match &signal.project_id {
            Some(project_id) => project_id,
            None => return Ok(Vec::new()),
        };
        let pattern = match pattern::get_pattern(db, project_id)? {
            Some(pattern) => pattern,
            None => return Ok(Vec::new()),
        };

        let hours = pattern.typical_hours(off_day);
        if hours.is_empty() || hours.contains(&now.hour()) {
            return Ok(Vec::new());
        }

        // Once per running session: if this project has already been
        // flagged, stay quiet until the ledger is pruned.
        for category in NotificationCategory::SESSION_SCOPED {
            if NotificationLedger::has_any(db, category, project_id)? {
                return Ok(Vec::new());
            }
        }

        let (Some(min), Some(max)) = (hours.iter().copied().min(), hours.iter().copied().max())
        else {
            return Ok(Vec::new());
        };
        let min_typical = i64::from(min);
        let max_typical = i64::from(max);
        let hour = i64::from(now.hour());
        let minute = i64::from(now.minute());

        let mut category = None;

        // Morning-type projects (usually started by 9) get a finer,
        // minute-granular early check.
        if min_typical <= 9 {
            let minutes_early = min_typical * 60 - (hour * 60 + minute);
            if minutes_early >= self.detection.morning_threshold_minutes {
                category = Some(NotificationCategory::EarlyStart);
            }
        }

        if category.is_none() {
            if hour < min_typical - self.detection.other_threshold_hours {
                category = Some(NotificationCategory::EarlyStart);
            } else if hour > max_typical + self.detection.other_threshold_hours {
                category = Some(if hour >= i64::from(self.detection.deep_night_hour) {
                    NotificationCategory::DeepNightPraise
                } else {
                    NotificationCategory::LateWork
                });
            }
        }

        let category = match category {
            Some(category) => category,
            None => return Ok(Vec::new()),
        };

        let message = MessageCatalog::random_message(db, category, &pattern.project_name)?;
        debug!(project = %project_id, %category, "working at an unusual hour");
        Ok(vec![Anomaly {
            category,
            project_id: Some(project_id.clone()),
            project_name: pattern.project_name.clone(),
            message,
        }])
    }
}
