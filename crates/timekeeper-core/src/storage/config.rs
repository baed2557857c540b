//! TOML-based configuration for the watchdog core.
//!
//! Stores the cadence and threshold knobs:
//! - scheduler intervals (check cycle, relearn cycle)
//! - learning window and relative-frequency threshold
//! - deviation thresholds (morning margin, generic margin, deep-night hour)
//! - ledger retention
//!
//! Configuration is stored at `~/.config/timekeeper/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;

use super::data_dir;

/// Periodic-activity cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerIntervals {
    /// Check cycle period in seconds.
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
    /// Relearn cycle period in seconds.
    #[serde(default = "default_relearn_interval_secs")]
    pub relearn_interval_secs: u64,
}

/// Pattern-learning configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Rolling history window in days.
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    /// Relative-frequency cutoff: an hour is typical iff its frequency is
    /// at least `avg_frequency * pattern_threshold`.
    #[serde(default = "default_pattern_threshold")]
    pub pattern_threshold: f64,
}

/// Deviation-classification thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Early-start margin for morning-type projects, in minutes.
    #[serde(default = "default_morning_threshold_minutes")]
    pub morning_threshold_minutes: i64,
    /// Early/late margin for everything else, in hours.
    #[serde(default = "default_other_threshold_hours")]
    pub other_threshold_hours: i64,
    /// Late work at or past this hour is praised instead of nudged.
    #[serde(default = "default_deep_night_hour")]
    pub deep_night_hour: u32,
    /// Suppression window for idle reminders, in minutes.
    #[serde(default = "default_sabori_suppress_minutes")]
    pub sabori_suppress_minutes: i64,
    /// Days without any tracked work before everything is suppressed.
    #[serde(default = "default_vacation_after_days")]
    pub vacation_after_days: i64,
}

/// Notification-ledger retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/timekeeper/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerIntervals,
    #[serde(default)]
    pub learning: LearningConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

fn default_check_interval_secs() -> u64 {
    3600
}
fn default_relearn_interval_secs() -> u64 {
    86400
}
fn default_window_days() -> u32 {
    14
}
fn default_pattern_threshold() -> f64 {
    0.8
}
fn default_morning_threshold_minutes() -> i64 {
    30
}
fn default_other_threshold_hours() -> i64 {
    2
}
fn default_deep_night_hour() -> u32 {
    22
}
fn default_sabori_suppress_minutes() -> i64 {
    60
}
fn default_vacation_after_days() -> i64 {
    3
}
fn default_retention_days() -> u32 {
    7
}

impl Default for SchedulerIntervals {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval_secs(),
            relearn_interval_secs: default_relearn_interval_secs(),
        }
    }
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            pattern_threshold: default_pattern_threshold(),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            morning_threshold_minutes: default_morning_threshold_minutes(),
            other_threshold_hours: default_other_threshold_hours(),
            deep_night_hour: default_deep_night_hour(),
            sabori_suppress_minutes: default_sabori_suppress_minutes(),
            vacation_after_days: default_vacation_after_days(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
        }
    }
}

impl Config {
    fn config_path() -> Result<PathBuf, std::io::Error> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load the configuration file, falling back to defaults when absent.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("config.toml"),
            message: e.to_string(),
        })?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path).map_err(|e| ConfigError::LoadFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::LoadFailed {
            path,
            message: e.to_string(),
        })
    }

    /// Persist the configuration.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path().map_err(|e| ConfigError::SaveFailed {
            path: PathBuf::from("config.toml"),
            message: e.to_string(),
        })?;
        let raw = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, raw).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }
}
