//! Set-based lifecycle transitions: finalization and reminder claims.
//!
//! Civil instants are passed as `YYYY-MM-DD HH:MM:SS` text and compared
//! against `date || ' ' || time` columns. Both are zero padded, so text order
//! is chronological order.

use visitgate_core::db::unix_timestamp;

use super::db::{AccessDatabase, DatabaseError};
use super::models::Access;

impl AccessDatabase {
    /// Finalize every active access whose last boundary is before `now_civil`.
    ///
    /// Returns the number of rows transitioned. Rows already in a terminal
    /// state are never touched, so repeated or concurrent calls converge.
    pub async fn finalize_closed_accesses(&self, now_civil: &str) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            "UPDATE accesses SET status = 'finalized', updated_at = ? \
             WHERE status = 'active' AND (end_date || ' ' || end_time) < ?",
        )
        .bind(unix_timestamp())
        .bind(now_civil)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected())
    }

    /// Active, not yet reminded accesses opening within `[from_civil, until_civil]`.
    pub async fn accesses_due_for_reminder(
        &self,
        from_civil: &str,
        until_civil: &str,
    ) -> Result<Vec<Access>, DatabaseError> {
        let accesses = sqlx::query_as::<_, Access>(
            "SELECT * FROM accesses \
             WHERE status = 'active' AND reminder_sent = 0 \
             AND (start_date || ' ' || start_time) BETWEEN ? AND ? \
             ORDER BY start_date ASC, start_time ASC",
        )
        .bind(from_civil)
        .bind(until_civil)
        .fetch_all(self.pool())
        .await?;

        Ok(accesses)
    }

    /// Set the reminder flag if nobody has yet.
    ///
    /// Returns `true` only for the caller that flipped it.
    pub async fn claim_reminder(&self, access_id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE accesses SET reminder_sent = 1, updated_at = ? \
             WHERE id = ? AND reminder_sent = 0",
        )
        .bind(unix_timestamp())
        .bind(access_id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
