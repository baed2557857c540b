//! External collaborator interfaces.
//!
//! The core never talks to the time-tracking service, the notification
//! device or a holiday calendar directly. Everything arrives through
//! these constructor-injected traits, so tests substitute doubles and
//! the hardware/SDK layers live outside this crate.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Boxed error type for collaborator failures.
pub type ProviderError = Box<dyn std::error::Error + Send + Sync>;

/// A raw time-tracking entry as the external provider reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTimeEntry {
    pub project_id: Option<String>,
    pub project_name: Option<String>,
    /// Free-text entry description; used as a name fallback.
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub stop: Option<DateTime<Utc>>,
    /// Negative or zero for a still-running entry.
    pub duration_seconds: i64,
}

/// A currently running timer, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivitySignal {
    /// Absent when the timer was started without a project.
    pub project_id: Option<String>,
    pub start: DateTime<Utc>,
}

/// Source of historical time-tracking entries.
pub trait TimeEntryHistoryProvider: Send + Sync {
    /// Fetch entries whose start falls in `[window_start, window_end]`.
    fn fetch(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<RawTimeEntry>, ProviderError>;
}

/// Source of the current-activity signal.
pub trait CurrentActivityProvider: Send + Sync {
    /// The currently running timer, or `None` when idle.
    fn current(&self) -> Result<Option<ActivitySignal>, ProviderError>;
}

/// Delivery channel for notification text.
pub trait MessageSink: Send + Sync {
    fn send(&self, text: &str) -> Result<(), ProviderError>;
}

/// Local-calendar holiday lookup.
///
/// The two fixed multi-day windows (mid-August, year-end) are handled by
/// the core itself and do not go through this trait.
pub trait CalendarClassifier: Send + Sync {
    fn is_holiday(&self, date: NaiveDate) -> bool;
}

/// Calendar that knows no holidays. Stands in when no local calendar
/// source is configured; the fixed windows still apply.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCalendar;

impl CalendarClassifier for NoCalendar {
    fn is_holiday(&self, _date: NaiveDate) -> bool {
        false
    }
}
