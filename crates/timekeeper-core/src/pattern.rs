//! Per-project working-pattern learning.
//!
//! Runs independently over two day-type partitions (weekday vs.
//! weekend-or-holiday) and derives, for each project, the set of
//! hours-of-day it is typically worked on plus an average duration.
//!
//! The heuristic: an hour is "typical" iff its entry frequency is at
//! least 80% of the project's mean per-hour frequency in that partition.
//! The duration statistic is the mean of the per-hour mean durations,
//! not a count-weighted mean. Both are load-bearing compatibility
//! choices and must not be "improved".

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::history::{self, WorkHistoryEntry};
use crate::storage::config::LearningConfig;
use crate::storage::database::{parse_ts, ts};
use crate::storage::Database;

/// A partition needs at least this many entries before a project gets a
/// typical-hours set for it.
const MIN_PARTITION_ENTRIES: i64 = 3;

/// The learned pattern for one project, both partitions merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectPattern {
    pub project_id: String,
    pub project_name: String,
    /// Sorted, deduplicated hours 0-23.
    pub weekday_typical_hours: Vec<u32>,
    pub weekend_typical_hours: Vec<u32>,
    pub weekday_avg_duration_minutes: i64,
    pub weekend_avg_duration_minutes: i64,
    pub last_worked_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectPattern {
    /// The typical-hours set for the given day-type partition.
    pub fn typical_hours(&self, off_day: bool) -> &[u32] {
        if off_day {
            &self.weekend_typical_hours
        } else {
            &self.weekday_typical_hours
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct HourAgg {
    count: i64,
    duration_sum: i64,
}

#[derive(Debug, Default)]
struct ProjectAgg {
    name: String,
    hours: BTreeMap<u32, HourAgg>,
}

/// One partition's result for one project.
#[derive(Debug, Clone)]
struct PartitionPattern {
    name: String,
    typical_hours: Vec<u32>,
    avg_duration: i64,
}

/// Apply the relative-frequency cutoff to one project's hour histogram.
///
/// Returns the typical hours (sorted) and the average of the per-hour
/// average durations, truncated to whole minutes.
fn typical_hours_and_avg(hours: &BTreeMap<u32, HourAgg>, threshold: f64) -> (Vec<u32>, i64) {
    let total: i64 = hours.values().map(|h| h.count).sum();
    let avg_frequency = total as f64 / hours.len() as f64;
    let cutoff = avg_frequency * threshold;

    let typical = hours
        .iter()
        .filter(|(_, agg)| agg.count as f64 >= cutoff)
        .map(|(hour, _)| *hour)
        .collect();

    let avg_sum: f64 = hours
        .values()
        .map(|agg| agg.duration_sum as f64 / agg.count as f64)
        .sum();
    let avg_duration = (avg_sum / hours.len() as f64) as i64;

    (typical, avg_duration)
}

fn learn_partition(
    entries: &[WorkHistoryEntry],
    off_day: bool,
    threshold: f64,
) -> BTreeMap<String, PartitionPattern> {
    let mut aggregates: BTreeMap<String, ProjectAgg> = BTreeMap::new();
    for entry in entries {
        if (entry.is_weekend || entry.is_holiday) != off_day {
            continue;
        }
        let agg = aggregates.entry(entry.project_id.clone()).or_default();
        if agg.name.is_empty() {
            agg.name = entry.project_name.clone();
        }
        let hour = agg.hours.entry(entry.hour_of_day).or_default();
        hour.count += 1;
        hour.duration_sum += entry.duration_minutes;
    }

    let mut results = BTreeMap::new();
    for (project_id, agg) in aggregates {
        let total: i64 = agg.hours.values().map(|h| h.count).sum();
        if total < MIN_PARTITION_ENTRIES {
            continue;
        }
        let (typical_hours, avg_duration) = typical_hours_and_avg(&agg.hours, threshold);
        results.insert(
            project_id,
            PartitionPattern {
                name: agg.name,
                typical_hours,
                avg_duration,
            },
        );
    }
    results
}

/// Recomputes and persists `ProjectPattern` rows from stored history.
pub struct PatternLearner {
    config: LearningConfig,
}

impl PatternLearner {
    pub fn new(config: LearningConfig) -> Self {
        Self { config }
    }

    /// Learn patterns from the stored rolling window and upsert them.
    ///
    /// The whole pattern table is brought in line with the new result in
    /// one transaction: projects that no longer have enough recent
    /// history lose their row. Returns the learned set keyed by project.
    pub fn learn(
        &self,
        db: &Database,
        now: DateTime<Utc>,
    ) -> Result<BTreeMap<String, ProjectPattern>> {
        let cutoff = now - Duration::days(i64::from(self.config.window_days));
        let entries = history::entries_since(db, cutoff)?;
        debug!(entries = entries.len(), "learning project patterns");

        let weekday = learn_partition(&entries, false, self.config.pattern_threshold);
        let weekend = learn_partition(&entries, true, self.config.pattern_threshold);

        let mut project_ids: Vec<&String> = weekday.keys().chain(weekend.keys()).collect();
        project_ids.sort();
        project_ids.dedup();

        let mut patterns = BTreeMap::new();
        for project_id in project_ids {
            let on = weekday.get(project_id);
            let off = weekend.get(project_id);
            let project_name = on
                .map(|p| p.name.clone())
                .or_else(|| off.map(|p| p.name.clone()))
                .unwrap_or_else(|| "Unknown".to_string());

            let last_worked_at = last_worked(db, project_id)?;

            patterns.insert(
                project_id.clone(),
                ProjectPattern {
                    project_id: project_id.clone(),
                    project_name,
                    weekday_typical_hours: on.map(|p| p.typical_hours.clone()).unwrap_or_default(),
                    weekend_typical_hours: off.map(|p| p.typical_hours.clone()).unwrap_or_default(),
                    weekday_avg_duration_minutes: on.map(|p| p.avg_duration).unwrap_or(0),
                    weekend_avg_duration_minutes: off.map(|p| p.avg_duration).unwrap_or(0),
                    last_worked_at,
                    updated_at: now,
                },
            );
        }

        let conn = db.conn();
        let tx = conn.unchecked_transaction()?;
        tx.execute("DELETE FROM project_patterns", [])?;
        for pattern in patterns.values() {
            tx.execute(
                "INSERT OR REPLACE INTO project_patterns
                 (project_id, project_name, weekday_typical_hours, weekend_typical_hours,
                  weekday_avg_duration_minutes, weekend_avg_duration_minutes,
                  last_worked_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    pattern.project_id,
                    pattern.project_name,
                    serde_json::to_string(&pattern.weekday_typical_hours)?,
                    serde_json::to_string(&pattern.weekend_typical_hours)?,
                    pattern.weekday_avg_duration_minutes,
                    pattern.weekend_avg_duration_minutes,
                    pattern.last_worked_at.map(ts),
                    ts(pattern.updated_at),
                ],
            )?;
        }
        tx.commit()?;

        info!(projects = patterns.len(), "learned project patterns");
        Ok(patterns)
    }
}

fn last_worked(db: &Database, project_id: &str) -> Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = db.conn().query_row(
        "SELECT MAX(start_time) FROM work_history WHERE project_id = ?1",
        params![project_id],
        |row| row.get(0),
    )?;
    raw.map(|raw| parse_ts(&raw, "work_history", "start_time").map_err(Into::into))
        .transpose()
}

/// Load every stored pattern.
pub fn load_patterns(db: &Database) -> Result<Vec<ProjectPattern>> {
    let mut stmt = db.conn().prepare(
        "SELECT project_id, project_name, weekday_typical_hours, weekend_typical_hours,
                weekday_avg_duration_minutes, weekend_avg_duration_minutes,
                last_worked_at, updated_at
         FROM project_patterns
         ORDER BY project_id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, i64>(4)?,
            row.get::<_, i64>(5)?,
            row.get::<_, Option<String>>(6)?,
            row.get::<_, String>(7)?,
        ))
    })?;

    let mut patterns = Vec::new();
    for row in rows {
        let (id, name, on_hours, off_hours, on_avg, off_avg, last, updated) =
            row.map_err(crate::error::DatabaseError::from)?;
        patterns.push(ProjectPattern {
            project_id: id,
            project_name: name,
            weekday_typical_hours: parse_hours(&on_hours)?,
            weekend_typical_hours: parse_hours(&off_hours)?,
            weekday_avg_duration_minutes: on_avg,
            weekend_avg_duration_minutes: off_avg,
            last_worked_at: last
                .map(|raw| parse_ts(&raw, "project_patterns", "last_worked_at"))
                .transpose()?,
            updated_at: parse_ts(&updated, "project_patterns", "updated_at")?,
        });
    }
    Ok(patterns)
}

/// Load one project's pattern, if learned.
pub fn get_pattern(db: &Database, project_id: &str) -> Result<Option<ProjectPattern>> {
    let patterns = load_patterns(db)?;
    Ok(patterns.into_iter().find(|p| p.project_id == project_id))
}

fn parse_hours(raw: &str) -> Result<Vec<u32>> {
    Ok(serde_json::from_str(raw)?)
}
