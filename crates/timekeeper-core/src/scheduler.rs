//! Periodic check/relearn scheduling.
//!
//! The `Scheduler` is the facade over the whole core: it owns the shared
//! store and the injected collaborators, and while running drives two
//! independent periodic activities:
//!
//! - the check cycle (hourly by default): fetch the current activity
//!   signal, classify deviations, deliver and record the results;
//! - the relearn cycle (daily by default): re-ingest the rolling history
//!   window, relearn patterns, prune the notification ledger.
//!
//! Both cycles swallow and log every error; a failed iteration never
//! stops the schedule. Cancellation is cooperative: `stop()` flips a
//! watch channel that each task observes between iterations, so an
//! in-flight body always completes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::deviation::{Anomaly, DeviationClassifier};
use crate::error::Result;
use crate::history::HistoryIngester;
use crate::ledger::NotificationLedger;
use crate::messages::MessageCatalog;
use crate::pattern::PatternLearner;
use crate::providers::{
    CalendarClassifier, CurrentActivityProvider, MessageSink, TimeEntryHistoryProvider,
};
use crate::storage::{Config, Database};

/// Snapshot of the scheduler's state.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub last_relearn_at: Option<DateTime<Utc>>,
    pub on_vacation: bool,
}

struct Control {
    /// Present while the periodic tasks are running; sending `true`
    /// tells both to exit at their next wake-up.
    stop_tx: Option<watch::Sender<bool>>,
    last_relearn_at: Option<DateTime<Utc>>,
}

struct SchedulerInner {
    db: Arc<tokio::sync::Mutex<Database>>,
    config: Config,
    ingester: HistoryIngester,
    learner: PatternLearner,
    classifier: DeviationClassifier,
    activity: Arc<dyn CurrentActivityProvider>,
    sink: Arc<dyn MessageSink>,
    control: std::sync::Mutex<Control>,
}

/// Drives the periodic check and relearn cycles over the shared store.
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

impl Scheduler {
    /// Build the scheduler around a shared store and the injected
    /// collaborators. Seeds the message template bank.
    ///
    /// The store is shared: whatever outer control flow consumes the
    /// core (a hardware-event loop, a CLI) holds the same handle and
    /// synchronizes through it.
    pub fn new(
        db: Arc<tokio::sync::Mutex<Database>>,
        config: Config,
        history: Arc<dyn TimeEntryHistoryProvider>,
        activity: Arc<dyn CurrentActivityProvider>,
        sink: Arc<dyn MessageSink>,
        calendar: Arc<dyn CalendarClassifier>,
    ) -> Result<Self> {
        {
            let db = db
                .try_lock()
                .map_err(|_| crate::error::CoreError::Custom("store is busy".to_string()))?;
            MessageCatalog::install_defaults(&db)?;
        }
        let ingester = HistoryIngester::new(history, Arc::clone(&calendar));
        let learner = PatternLearner::new(config.learning.clone());
        let classifier = DeviationClassifier::new(config.detection.clone(), calendar);
        Ok(Self {
            inner: Arc::new(SchedulerInner {
                db,
                config,
                ingester,
                learner,
                classifier,
                activity,
                sink,
                control: std::sync::Mutex::new(Control {
                    stop_tx: None,
                    last_relearn_at: None,
                }),
            }),
        })
    }

    /// Start both periodic activities. No-op when already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut control = self.inner.control.lock().unwrap();
        if control.stop_tx.is_some() {
            warn!("scheduler is already running");
            return;
        }
        let (stop_tx, stop_rx) = watch::channel(false);
        control.stop_tx = Some(stop_tx);
        drop(control);

        // Check cycle: run once right away, then settle into the period.
        let inner = Arc::clone(&self.inner);
        let mut rx = stop_rx.clone();
        tokio::spawn(async move {
            let period =
                std::time::Duration::from_secs(inner.config.scheduler.check_interval_secs);
            loop {
                if let Err(e) = inner.run_check(Utc::now()).await {
                    error!(error = %e, "check cycle iteration failed");
                }
                if sleep_or_stop(period, &mut rx).await {
                    break;
                }
            }
            info!("check cycle stopped");
        });

        // Relearn cycle: a full period passes before the first run, the
        // initial ingest being the embedding application's job.
        let inner = Arc::clone(&self.inner);
        let mut rx = stop_rx;
        tokio::spawn(async move {
            let period =
                std::time::Duration::from_secs(inner.config.scheduler.relearn_interval_secs);
            loop {
                if sleep_or_stop(period, &mut rx).await {
                    break;
                }
                if let Err(e) = inner.run_relearn(Utc::now()).await {
                    error!(error = %e, "relearn cycle iteration failed");
                }
            }
            info!("relearn cycle stopped");
        });

        info!(
            check_interval_secs = self.inner.config.scheduler.check_interval_secs,
            relearn_interval_secs = self.inner.config.scheduler.relearn_interval_secs,
            "scheduler started"
        );
    }

    /// Signal both periodic activities to exit at their next wake-up.
    /// No-op when already stopped.
    pub fn stop(&self) {
        let mut control = self.inner.control.lock().unwrap();
        if let Some(stop_tx) = control.stop_tx.take() {
            let _ = stop_tx.send(true);
            info!("scheduler stopping");
        }
    }

    /// Ingest the rolling history window and relearn patterns. Returns
    /// the number of history entries stored.
    pub async fn ingest_and_learn(&self, now: DateTime<Utc>) -> Result<usize> {
        self.inner.ingest_and_learn(now).await
    }

    /// Run one check: fetch the activity signal, classify, and record
    /// every emitted event in the ledger. Returns the emitted events.
    ///
    /// An activity-fetch failure is logged and yields no events.
    pub async fn evaluate_once(&self, now: DateTime<Utc>) -> Result<Vec<Anomaly>> {
        self.inner.evaluate_once(now).await
    }

    /// Run the relearn logic out-of-band, synchronously with respect to
    /// the caller. Returns the ingested entry count.
    pub async fn force_relearn(&self) -> Result<usize> {
        info!("forcing pattern relearn");
        self.inner.run_relearn(Utc::now()).await
    }

    /// Current scheduler state.
    pub async fn status(&self) -> Result<SchedulerStatus> {
        let (running, last_relearn_at) = {
            let control = self.inner.control.lock().unwrap();
            (control.stop_tx.is_some(), control.last_relearn_at)
        };
        let on_vacation = {
            let db = self.inner.db.lock().await;
            self.inner.classifier.is_on_vacation(&db, Utc::now())?
        };
        Ok(SchedulerStatus {
            running,
            last_relearn_at,
            on_vacation,
        })
    }
}

/// Sleep for `period` unless the stop signal arrives first. Returns
/// whether the caller should exit.
async fn sleep_or_stop(period: std::time::Duration, rx: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(period) => {}
        _ = rx.changed() => {}
    }
    *rx.borrow()
}

impl SchedulerInner {
    async fn ingest_and_learn(&self, now: DateTime<Utc>) -> Result<usize> {
        let db = self.db.lock().await;
        let count = self
            .ingester
            .ingest(&db, now, self.config.learning.window_days)?;
        self.learner.learn(&db, now)?;
        Ok(count)
    }

    async fn evaluate_once(&self, now: DateTime<Utc>) -> Result<Vec<Anomaly>> {
        let signal = match self.activity.current() {
            Ok(signal) => signal,
            Err(e) => {
                warn!(error = %e, "failed to fetch current activity, skipping check");
                return Ok(Vec::new());
            }
        };

        let db = self.db.lock().await;
        let events = self.classifier.evaluate(&db, now, signal.as_ref())?;
        for event in &events {
            NotificationLedger::record(
                &db,
                event.category,
                event.project_id.as_deref(),
                &event.message,
                now,
            )?;
        }
        Ok(events)
    }

    async fn run_check(&self, now: DateTime<Utc>) -> Result<()> {
        let events = self.evaluate_once(now).await?;
        for event in &events {
            if let Err(e) = self.sink.send(&event.message) {
                warn!(error = %e, category = %event.category, "failed to deliver notification");
            }
        }
        Ok(())
    }

    async fn run_relearn(&self, now: DateTime<Utc>) -> Result<usize> {
        let count = self.ingest_and_learn(now).await?;
        {
            let db = self.db.lock().await;
            let pruned = NotificationLedger::prune(&db, self.config.ledger.retention_days, now)?;
            if pruned > 0 {
                info!(pruned, "pruned old notification records");
            }
        }
        self.control.lock().unwrap().last_relearn_at = Some(now);
        Ok(count)
    }
}
