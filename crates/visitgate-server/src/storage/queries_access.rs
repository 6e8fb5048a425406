//! Access permit and invited-guest queries.
//!
//! The usage counter is only ever changed by [`AccessDatabase::redeem_use`],
//! whose conditional `UPDATE` carries the ceiling check itself.

use visitgate_core::Schedule;
use visitgate_core::db::unix_timestamp;
use visitgate_core::schedule::{DATE_FORMAT, TIME_FORMAT};

use super::db::{AccessDatabase, DatabaseError};
use super::models::{Access, GuestStatus, InvitedGuest, Visit, VisitStatus, normalize_email};

/// Parameters for creating an access permit.
pub struct AccessParams<'a> {
    pub id: &'a str,
    pub company_id: &'a str,
    pub creator_id: &'a str,
    pub code: &'a str,
    pub qr_payload: Option<&'a str>,
    pub name: &'a str,
    pub schedule: &'a Schedule,
    pub auto_approval: bool,
    pub max_uses: i64,
    pub allow_guests: bool,
    pub require_approval: bool,
    pub invited_emails: &'a [String],
}

/// Everything a successful redemption writes, applied in one transaction.
pub struct RedemptionWrite<'a> {
    pub access_id: &'a str,
    pub company_id: &'a str,
    pub visit_id: &'a str,
    pub visitor_email: &'a str,
    pub visitor_name: Option<&'a str>,
    pub host_id: Option<&'a str>,
    pub visit_status: VisitStatus,
}

impl AccessDatabase {
    // =========================================================================
    // Access queries
    // =========================================================================

    /// Create an access permit and its invitation list.
    pub async fn create_access(&self, params: &AccessParams<'_>) -> Result<Access, DatabaseError> {
        let now = unix_timestamp();
        let schedule = params.schedule;
        let mut tx = self.pool().begin().await?;

        sqlx::query(
            "INSERT INTO accesses (id, company_id, creator_id, code, qr_payload, name, \
             start_date, end_date, start_time, end_time, recurrence, \
             auto_approval, max_uses, allow_guests, require_approval, \
             status, usage_count, reminder_sent, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'active', 0, 0, ?, ?)",
        )
        .bind(params.id)
        .bind(params.company_id)
        .bind(params.creator_id)
        .bind(params.code)
        .bind(params.qr_payload)
        .bind(params.name)
        .bind(schedule.start_date.format(DATE_FORMAT).to_string())
        .bind(schedule.end_date.format(DATE_FORMAT).to_string())
        .bind(schedule.start_time.format(TIME_FORMAT).to_string())
        .bind(schedule.end_time.format(TIME_FORMAT).to_string())
        .bind(schedule.recurrence.as_str())
        .bind(params.auto_approval)
        .bind(params.max_uses)
        .bind(params.allow_guests)
        .bind(params.require_approval)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for email in params.invited_emails {
            sqlx::query(
                "INSERT OR IGNORE INTO invited_guests (access_id, email, status, updated_at) \
                 VALUES (?, ?, ?, ?)",
            )
            .bind(params.id)
            .bind(normalize_email(email))
            .bind(GuestStatus::Sent.as_str())
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.get_access(params.company_id, params.id).await
    }

    /// Get an access by ID within a company.
    pub async fn get_access(&self, company_id: &str, id: &str) -> Result<Access, DatabaseError> {
        sqlx::query_as::<_, Access>("SELECT * FROM accesses WHERE company_id = ? AND id = ?")
            .bind(company_id)
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Access {id}")))
    }

    /// Look up an access by its code within a company.
    pub async fn get_access_by_code(
        &self,
        company_id: &str,
        code: &str,
    ) -> Result<Option<Access>, DatabaseError> {
        let access =
            sqlx::query_as::<_, Access>("SELECT * FROM accesses WHERE company_id = ? AND code = ?")
                .bind(company_id)
                .bind(code)
                .fetch_optional(self.pool())
                .await?;

        Ok(access)
    }

    /// Active and finalized accesses whose date range overlaps `[from, to]`.
    ///
    /// Both bounds are `YYYY-MM-DD` civil dates.
    pub async fn list_agenda(
        &self,
        company_id: &str,
        from: &str,
        to: &str,
    ) -> Result<Vec<Access>, DatabaseError> {
        let accesses = sqlx::query_as::<_, Access>(
            "SELECT * FROM accesses \
             WHERE company_id = ? AND status IN ('active', 'finalized') \
             AND start_date <= ? AND end_date >= ? \
             ORDER BY start_date ASC, start_time ASC, code ASC",
        )
        .bind(company_id)
        .bind(to)
        .bind(from)
        .fetch_all(self.pool())
        .await?;

        Ok(accesses)
    }

    /// Cancel an active access.
    ///
    /// Returns `false` when no active access with this code exists.
    pub async fn cancel_access(&self, company_id: &str, code: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE accesses SET status = 'cancelled', updated_at = ? \
             WHERE company_id = ? AND code = ? AND status = 'active'",
        )
        .bind(unix_timestamp())
        .bind(company_id)
        .bind(code)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Consume one use and record the resulting visit.
    ///
    /// The increment only applies while the access is active and below its
    /// ceiling. Returns `None` when that condition failed; nothing is written.
    pub async fn redeem_use(
        &self,
        write: &RedemptionWrite<'_>,
    ) -> Result<Option<Visit>, DatabaseError> {
        let now = unix_timestamp();
        let mut tx = self.pool().begin().await?;

        let consumed = sqlx::query(
            "UPDATE accesses SET usage_count = usage_count + 1, updated_at = ? \
             WHERE id = ? AND company_id = ? AND status = 'active' \
             AND (max_uses = 0 OR usage_count < max_uses)",
        )
        .bind(now)
        .bind(write.access_id)
        .bind(write.company_id)
        .execute(&mut *tx)
        .await?;

        if consumed.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let email = normalize_email(write.visitor_email);

        sqlx::query(
            "UPDATE invited_guests SET status = 'redeemed', updated_at = ? \
             WHERE access_id = ? AND email = ?",
        )
        .bind(now)
        .bind(write.access_id)
        .bind(&email)
        .execute(&mut *tx)
        .await?;

        let decided_at = (write.visit_status != VisitStatus::Pending).then_some(now);

        sqlx::query(
            "INSERT INTO visits (id, company_id, access_id, visitor_email, visitor_name, \
             host_id, status, created_at, decided_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(write.visit_id)
        .bind(write.company_id)
        .bind(write.access_id)
        .bind(&email)
        .bind(write.visitor_name)
        .bind(write.host_id)
        .bind(write.visit_status.as_str())
        .bind(now)
        .bind(decided_at)
        .execute(&mut *tx)
        .await?;

        let visit = sqlx::query_as::<_, Visit>("SELECT * FROM visits WHERE id = ?")
            .bind(write.visit_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(visit))
    }

    // =========================================================================
    // Invited guest queries
    // =========================================================================

    /// List the invitations of an access.
    pub async fn list_invited_guests(
        &self,
        access_id: &str,
    ) -> Result<Vec<InvitedGuest>, DatabaseError> {
        let guests = sqlx::query_as::<_, InvitedGuest>(
            "SELECT * FROM invited_guests WHERE access_id = ? ORDER BY email ASC",
        )
        .bind(access_id)
        .fetch_all(self.pool())
        .await?;

        Ok(guests)
    }

    /// Get one invitation by email.
    pub async fn get_invited_guest(
        &self,
        access_id: &str,
        email: &str,
    ) -> Result<Option<InvitedGuest>, DatabaseError> {
        let guest = sqlx::query_as::<_, InvitedGuest>(
            "SELECT * FROM invited_guests WHERE access_id = ? AND email = ?",
        )
        .bind(access_id)
        .bind(normalize_email(email))
        .fetch_optional(self.pool())
        .await?;

        Ok(guest)
    }

    /// Move an invitation from `sent` to `opened`.
    ///
    /// Returns `false` if the invitation is missing or already further along.
    pub async fn mark_guest_opened(
        &self,
        access_id: &str,
        email: &str,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE invited_guests SET status = 'opened', updated_at = ? \
             WHERE access_id = ? AND email = ? AND status = 'sent'",
        )
        .bind(unix_timestamp())
        .bind(access_id)
        .bind(normalize_email(email))
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
