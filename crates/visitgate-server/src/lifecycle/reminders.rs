//! Reminders at access-window start.
//!
//! Each access is reminded at most once: the dispatcher flips the stored
//! `reminder_sent` flag before delivering, and only the caller that flipped
//! it delivers. A failed delivery is logged and not retried.

use chrono::{NaiveDateTime, TimeDelta};
use tracing::{debug, warn};
use visitgate_core::schedule::format_civil;

use crate::notifications::{Reminder, ReminderSink};
use crate::storage::{Access, AccessDatabase, DatabaseError};

/// Sends reminders for accesses opening soon.
pub struct ReminderDispatcher<S> {
    db: AccessDatabase,
    sink: S,
    lookahead: TimeDelta,
}

impl<S: ReminderSink> ReminderDispatcher<S> {
    pub fn new(db: AccessDatabase, sink: S, lookahead_minutes: u32) -> Self {
        Self {
            db,
            sink,
            lookahead: TimeDelta::minutes(i64::from(lookahead_minutes)),
        }
    }

    /// Remind every active access whose window opens within the lookahead
    /// of civil `now`. Returns the number of reminders delivered.
    pub async fn send_due_reminders(&self, now: NaiveDateTime) -> Result<u64, DatabaseError> {
        let from = format_civil(now);
        let until = format_civil(now + self.lookahead);
        let due = self.db.accesses_due_for_reminder(&from, &until).await?;

        let mut sent = 0u64;
        for access in &due {
            let reminder = self.build_reminder(access).await?;

            if !self.db.claim_reminder(&access.id).await? {
                debug!(access_id = %access.id, "Reminder already claimed");
                continue;
            }

            match self.sink.send_reminder(&reminder).await {
                Ok(()) => sent += 1,
                Err(e) => {
                    warn!(
                        access_id = %access.id,
                        code = %access.code,
                        error = %e,
                        "Reminder delivery failed, not retrying"
                    );
                }
            }
        }

        if !due.is_empty() {
            debug!(due = due.len(), sent, "Reminder pass complete");
        }

        Ok(sent)
    }

    async fn build_reminder(&self, access: &Access) -> Result<Reminder, DatabaseError> {
        let host_email = match self.db.get_user(&access.company_id, &access.creator_id).await {
            Ok(user) => Some(user.email),
            Err(DatabaseError::NotFound(_)) => None,
            Err(e) => return Err(e),
        };
        let invited_emails = self
            .db
            .list_invited_guests(&access.id)
            .await?
            .into_iter()
            .map(|guest| guest.email)
            .collect();

        Ok(Reminder {
            access_id: access.id.clone(),
            company_id: access.company_id.clone(),
            code: access.code.clone(),
            name: access.name.clone(),
            opens_at: format!("{} {}", access.start_date, access.start_time),
            host_email,
            invited_emails,
        })
    }

    pub const fn sink(&self) -> &S {
        &self.sink
    }
}
