//! Shared fakes and helpers for integration tests.
//!
//! The fakes implement the collaborator traits directly; flipping their
//! `fail` flag turns the next call into an error so failure handling can
//! be exercised without any real external service.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use timekeeper_core::{
    ActivitySignal, Config, CurrentActivityProvider, Database, MessageSink, NoCalendar,
    ProviderError, RawTimeEntry, Scheduler, TimeEntryHistoryProvider,
};

pub fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

pub fn raw_entry(project: &str, start: DateTime<Utc>, duration_seconds: i64) -> RawTimeEntry {
    RawTimeEntry {
        project_id: Some(project.to_string()),
        project_name: Some(format!("{project} name")),
        description: None,
        start,
        stop: Some(start + Duration::seconds(duration_seconds.max(0))),
        duration_seconds,
    }
}

/// One entry per day for the past `days` days at the current hour and
/// the next, so "now" sits inside a typical hour whatever weekday or
/// partition the test happens to run on.
pub fn entries_around_now(project: &str, now: DateTime<Utc>, days: i64) -> Vec<RawTimeEntry> {
    let mut entries = Vec::new();
    for day in 1..=days {
        let base = now - Duration::days(day);
        entries.push(raw_entry(project, base, 1800));
        entries.push(raw_entry(project, base + Duration::hours(1), 1800));
    }
    entries
}

pub struct FakeHistory {
    pub entries: Mutex<Vec<RawTimeEntry>>,
    pub fail: AtomicBool,
}

impl FakeHistory {
    pub fn with(entries: Vec<RawTimeEntry>) -> Arc<Self> {
        Arc::new(Self {
            entries: Mutex::new(entries),
            fail: AtomicBool::new(false),
        })
    }
}

impl TimeEntryHistoryProvider for FakeHistory {
    fn fetch(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<RawTimeEntry>, ProviderError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err("history endpoint unavailable".into());
        }
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.start >= window_start && e.start <= window_end)
            .cloned()
            .collect())
    }
}

pub struct FakeActivity {
    pub signal: Mutex<Option<ActivitySignal>>,
    pub fail: AtomicBool,
}

impl FakeActivity {
    pub fn idle() -> Arc<Self> {
        Arc::new(Self {
            signal: Mutex::new(None),
            fail: AtomicBool::new(false),
        })
    }

    pub fn set_running(&self, project: &str, started: DateTime<Utc>) {
        *self.signal.lock().unwrap() = Some(ActivitySignal {
            project_id: Some(project.to_string()),
            start: started,
        });
    }
}

impl CurrentActivityProvider for FakeActivity {
    fn current(&self) -> Result<Option<ActivitySignal>, ProviderError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err("tracker unreachable".into());
        }
        Ok(self.signal.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub sent: Mutex<Vec<String>>,
    pub fail: AtomicBool,
}

impl MessageSink for RecordingSink {
    fn send(&self, text: &str) -> Result<(), ProviderError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err("device offline".into());
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

pub struct TestRig {
    pub scheduler: Scheduler,
    pub db: Arc<tokio::sync::Mutex<Database>>,
    pub history: Arc<FakeHistory>,
    pub activity: Arc<FakeActivity>,
    pub sink: Arc<RecordingSink>,
}

pub fn rig(config: Config, entries: Vec<RawTimeEntry>) -> TestRig {
    let db = Arc::new(tokio::sync::Mutex::new(Database::open_memory().unwrap()));
    let history = FakeHistory::with(entries);
    let activity = FakeActivity::idle();
    let sink = Arc::new(RecordingSink::default());
    let scheduler = Scheduler::new(
        Arc::clone(&db),
        config,
        Arc::clone(&history) as Arc<dyn TimeEntryHistoryProvider>,
        Arc::clone(&activity) as Arc<dyn CurrentActivityProvider>,
        Arc::clone(&sink) as Arc<dyn MessageSink>,
        Arc::new(NoCalendar),
    )
    .unwrap();
    TestRig {
        scheduler,
        db,
        history,
        activity,
        sink,
    }
}
