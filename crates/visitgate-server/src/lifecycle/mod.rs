//! Lazy access lifecycle maintenance.
//!
//! There is no background scheduler. Read endpoints call
//! [`Lifecycle::run_due`] before answering, which finalizes closed accesses
//! and then sends reminders for windows about to open.

pub mod finalizer;
pub mod reminders;

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::warn;
use visitgate_core::config::LifecycleConfig;

pub use finalizer::Finalizer;
pub use reminders::ReminderDispatcher;

use crate::notifications::{Notifier, ReminderSink};
use crate::storage::{AccessDatabase, DatabaseError};

/// What one maintenance pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MaintenanceReport {
    pub finalized: u64,
    pub reminded: u64,
    /// The pass was throttled by `min_interval_secs`.
    pub skipped: bool,
}

/// Finalizer and reminder dispatcher run as one gate.
pub struct Lifecycle<S = Notifier> {
    finalizer: Finalizer,
    reminders: ReminderDispatcher<S>,
    min_interval_secs: i64,
    /// Civil timestamp (seconds) of the last pass that ran.
    last_run: AtomicI64,
}

impl<S: ReminderSink> Lifecycle<S> {
    pub fn new(db: AccessDatabase, sink: S, config: &LifecycleConfig) -> Self {
        Self {
            finalizer: Finalizer::new(db.clone()),
            reminders: ReminderDispatcher::new(db, sink, config.reminder_lookahead_minutes),
            min_interval_secs: i64::try_from(config.min_interval_secs).unwrap_or(i64::MAX),
            last_run: AtomicI64::new(i64::MIN),
        }
    }

    /// Finalize, then remind.
    ///
    /// Finalizer failures propagate. Reminder failures are logged so a broken
    /// notification path never blocks the request that triggered the pass.
    pub async fn run_due(&self, now: NaiveDateTime) -> Result<MaintenanceReport, DatabaseError> {
        if !self.claim_run(now) {
            return Ok(MaintenanceReport {
                skipped: true,
                ..MaintenanceReport::default()
            });
        }

        let finalized = self.finalizer.finalize_expired(now).await?;
        let reminded = match self.reminders.send_due_reminders(now).await {
            Ok(sent) => sent,
            Err(e) => {
                warn!(error = %e, "Reminder pass failed");
                0
            }
        };

        Ok(MaintenanceReport {
            finalized,
            reminded,
            skipped: false,
        })
    }

    /// Whether a pass at `now` should run, recording it if so.
    fn claim_run(&self, now: NaiveDateTime) -> bool {
        if self.min_interval_secs == 0 {
            return true;
        }

        let now_secs = now.and_utc().timestamp();
        let last = self.last_run.load(Ordering::Acquire);
        if last != i64::MIN && now_secs.saturating_sub(last) < self.min_interval_secs {
            return false;
        }

        self.last_run
            .compare_exchange(last, now_secs, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
