//! Integration tests for history ingestion and pattern learning.
//!
//! These tests drive the full ingest-then-learn path through the
//! scheduler facade against a fake time-tracking provider and verify
//! the learned rows in the store.

mod common;

use common::{at, raw_entry, rig};
use timekeeper_core::{pattern, Config};

// Wednesday noon; the 14-day window reaches back to 2026-07-22.
fn now() -> chrono::DateTime<chrono::Utc> {
    at(2026, 8, 5, 12, 0)
}

#[tokio::test]
async fn reingest_and_relearn_is_idempotent() {
    let entries = vec![
        raw_entry("p1", at(2026, 8, 3, 9, 0), 3600),
        raw_entry("p1", at(2026, 8, 3, 10, 0), 1800),
        raw_entry("p1", at(2026, 8, 4, 9, 0), 2700),
    ];
    let rig = rig(Config::default(), entries);

    rig.scheduler.ingest_and_learn(now()).await.unwrap();
    let first = {
        let db = rig.db.lock().await;
        pattern::load_patterns(&db).unwrap()
    };
    assert!(!first.is_empty());

    rig.scheduler.ingest_and_learn(now()).await.unwrap();
    let second = {
        let db = rig.db.lock().await;
        pattern::load_patterns(&db).unwrap()
    };

    // Same source, same moment: the pattern rows come out byte-identical.
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[tokio::test]
async fn threshold_cutoff_end_to_end() {
    // Weekday frequencies 9:5, 10:5, 11:1 over the Mon-Fri of 7/27-7/31.
    let mut entries = Vec::new();
    for day in 27..=31 {
        entries.push(raw_entry("p1", at(2026, 7, day, 9, 0), 3600));
        entries.push(raw_entry("p1", at(2026, 7, day, 10, 0), 3600));
    }
    entries.push(raw_entry("p1", at(2026, 7, 28, 11, 0), 3600));
    let rig = rig(Config::default(), entries);

    let count = rig.scheduler.ingest_and_learn(now()).await.unwrap();
    assert_eq!(count, 11);

    let db = rig.db.lock().await;
    let learned = pattern::get_pattern(&db, "p1").unwrap().unwrap();
    // avg_frequency = 11/3 ~ 3.67, threshold ~ 2.93: hour 11 stays out.
    assert_eq!(learned.weekday_typical_hours, vec![9, 10]);
    assert!(learned.weekend_typical_hours.is_empty());
}

#[tokio::test]
async fn two_entries_produce_no_pattern_row() {
    let entries = vec![
        raw_entry("p1", at(2026, 8, 3, 9, 0), 3600),
        raw_entry("p1", at(2026, 8, 4, 9, 0), 3600),
    ];
    let rig = rig(Config::default(), entries);

    rig.scheduler.ingest_and_learn(now()).await.unwrap();

    let db = rig.db.lock().await;
    assert!(pattern::get_pattern(&db, "p1").unwrap().is_none());
}

#[tokio::test]
async fn empty_fetch_starves_learning_without_error() {
    let rig = rig(Config::default(), Vec::new());

    let count = rig.scheduler.ingest_and_learn(now()).await.unwrap();
    assert_eq!(count, 0);

    let db = rig.db.lock().await;
    assert!(pattern::load_patterns(&db).unwrap().is_empty());
}

#[tokio::test]
async fn patterns_follow_the_rolling_window() {
    // Three entries that qualify today but have aged out three weeks on.
    let entries = vec![
        raw_entry("p1", at(2026, 8, 3, 9, 0), 3600),
        raw_entry("p1", at(2026, 8, 4, 9, 0), 3600),
        raw_entry("p1", at(2026, 8, 4, 10, 0), 3600),
    ];
    let rig = rig(Config::default(), entries);

    rig.scheduler.ingest_and_learn(now()).await.unwrap();
    {
        let db = rig.db.lock().await;
        assert!(pattern::get_pattern(&db, "p1").unwrap().is_some());
    }

    let later = now() + chrono::Duration::days(21);
    rig.scheduler.ingest_and_learn(later).await.unwrap();

    let db = rig.db.lock().await;
    assert!(pattern::get_pattern(&db, "p1").unwrap().is_none());
}
