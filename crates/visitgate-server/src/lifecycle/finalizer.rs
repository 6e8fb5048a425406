//! Finalization of accesses whose window has permanently closed.

use chrono::NaiveDateTime;
use tracing::info;
use visitgate_core::schedule::format_civil;

use crate::storage::{AccessDatabase, DatabaseError};

/// Moves closed `active` accesses to `finalized`.
pub struct Finalizer {
    db: AccessDatabase,
}

impl Finalizer {
    pub const fn new(db: AccessDatabase) -> Self {
        Self { db }
    }

    /// Finalize every active access whose final boundary is before civil `now`.
    ///
    /// Recurrence only repeats inside the date range, so `end_date + end_time`
    /// is the last admissible instant for every schedule kind. Returns the
    /// number of accesses transitioned by this call.
    pub async fn finalize_expired(&self, now: NaiveDateTime) -> Result<u64, DatabaseError> {
        let now_civil = format_civil(now);
        let transitioned = self.db.finalize_closed_accesses(&now_civil).await?;

        if transitioned > 0 {
            info!(transitioned, now = %now_civil, "Finalized closed accesses");
        }

        Ok(transitioned)
    }
}
