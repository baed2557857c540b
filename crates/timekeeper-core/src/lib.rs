//! # Timekeeper Core Library
//!
//! This library provides the core logic for Timekeeper: it learns, per
//! tracked project, the hours-of-day a person usually works on it
//! (separately for weekdays vs. weekends/holidays), periodically compares
//! current activity against the learned pattern, and turns deviations
//! into deduplicated notification events. The hardware card-reader loop,
//! the time-tracking REST client and the companion-robot SDK live outside
//! this crate and arrive through injected traits.
//!
//! ## Architecture
//!
//! - **History Ingestion**: Rolling-window fetch-and-replace of
//!   normalized time-tracking facts
//! - **Pattern Learning**: Relative-frequency typical-hours heuristic per
//!   project and day-type partition
//! - **Deviation Classification**: Idle ("sabori") and unusual-hour
//!   detection gated by the notification ledger
//! - **Storage**: SQLite-based history/pattern/ledger store and
//!   TOML-based configuration
//! - **Scheduling**: Two cancellable periodic activities driving the
//!   check and relearn cycles
//!
//! ## Key Components
//!
//! - [`Scheduler`]: Facade owning the store, the collaborators and the
//!   periodic cycles
//! - [`PatternLearner`]: Typical-hours learning over stored history
//! - [`DeviationClassifier`]: Anomaly decisions for the current moment
//! - [`NotificationLedger`]: Append-only dedup record of sent events

pub mod calendar;
pub mod deviation;
pub mod error;
pub mod history;
pub mod ledger;
pub mod messages;
pub mod pattern;
pub mod providers;
pub mod scheduler;
pub mod storage;

pub use calendar::DayType;
pub use deviation::{Anomaly, DeviationClassifier};
pub use error::{ConfigError, CoreError, DatabaseError, Result};
pub use history::{HistoryIngester, WorkHistoryEntry};
pub use ledger::{NotificationCategory, NotificationLedger, NotificationRecord};
pub use messages::MessageCatalog;
pub use pattern::{PatternLearner, ProjectPattern};
pub use providers::{
    ActivitySignal, CalendarClassifier, CurrentActivityProvider, MessageSink, NoCalendar,
    ProviderError, RawTimeEntry, TimeEntryHistoryProvider,
};
pub use scheduler::{Scheduler, SchedulerStatus};
pub use storage::{Config, Database};
