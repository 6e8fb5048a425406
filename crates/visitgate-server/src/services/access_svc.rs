//! Access permit management: creation, QR lookup, agenda, cancellation.

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use visitgate_core::Schedule;
use visitgate_core::schedule::{DATE_FORMAT, parse_date};

use crate::code::{generate_code, qr_payload, validate_code};
use crate::error::AccessError;
use crate::lifecycle::Lifecycle;
use crate::notifications::{Notifier, ReminderSink};
use crate::storage::{
    Access, AccessDatabase, AccessParams, GuestStatus, InvitedGuest, UserRole, normalize_email,
};

/// Client request to create an access permit.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccess {
    pub creator_id: String,
    /// Generated when absent.
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub name: String,
    pub start_date: String,
    pub end_date: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub recurrence: Option<String>,
    #[serde(default)]
    pub auto_approval: bool,
    /// 0 means unlimited.
    #[serde(default)]
    pub max_uses: u32,
    #[serde(default = "default_allow_guests")]
    pub allow_guests: bool,
    #[serde(default)]
    pub require_approval: bool,
    #[serde(default)]
    pub invited_emails: Vec<String>,
}

const fn default_allow_guests() -> bool {
    true
}

/// An access with its invitations and whether it admits entry right now.
#[derive(Debug, Clone, Serialize)]
pub struct AccessView {
    #[serde(flatten)]
    pub access: Access,
    pub invited: Vec<InvitedGuest>,
    pub valid_now: bool,
}

/// Whether `access` admits entry at civil `now`.
///
/// A stored schedule that no longer parses never admits anyone.
pub(crate) fn is_open(access: &Access, now: NaiveDateTime) -> bool {
    if access.status().is_terminal() {
        return false;
    }
    match access.schedule() {
        Ok(schedule) => schedule.is_valid_at(now),
        Err(e) => {
            warn!(access_id = %access.id, error = %e, "Stored schedule is unreadable");
            false
        }
    }
}

pub struct AccessService<S = Notifier> {
    db: AccessDatabase,
    lifecycle: Arc<Lifecycle<S>>,
}

impl<S: ReminderSink> AccessService<S> {
    pub const fn new(db: AccessDatabase, lifecycle: Arc<Lifecycle<S>>) -> Self {
        Self { db, lifecycle }
    }

    #[instrument(skip(self, req), fields(creator_id = %req.creator_id))]
    pub async fn create(
        &self,
        company_id: &str,
        req: &NewAccess,
        now: NaiveDateTime,
    ) -> Result<AccessView, AccessError> {
        let creator = self.db.get_user(company_id, &req.creator_id).await?;
        if creator.role.parse::<UserRole>() == Ok(UserRole::Receptionist) {
            return Err(AccessError::InvalidInput(
                "receptionists cannot create accesses".into(),
            ));
        }

        let schedule = Schedule::parse(
            &req.start_date,
            &req.end_date,
            &req.start_time,
            &req.end_time,
            req.recurrence.as_deref().unwrap_or_default(),
        )?;

        if req.auto_approval && req.require_approval {
            return Err(AccessError::InvalidInput(
                "auto_approval and require_approval are mutually exclusive".into(),
            ));
        }

        let invited_emails = req
            .invited_emails
            .iter()
            .map(|email| checked_email(email))
            .collect::<Result<Vec<_>, _>>()?;

        let code = match req.code.as_deref() {
            Some(code) => {
                validate_code(code)?;
                code.to_string()
            }
            None => generate_code(),
        };
        let qr = qr_payload(&code);
        let id = uuid::Uuid::new_v4().to_string();

        let access = self
            .db
            .create_access(&AccessParams {
                id: &id,
                company_id,
                creator_id: &creator.id,
                code: &code,
                qr_payload: Some(&qr),
                name: req.name.trim(),
                schedule: &schedule,
                auto_approval: req.auto_approval,
                max_uses: i64::from(req.max_uses),
                allow_guests: req.allow_guests,
                require_approval: req.require_approval,
                invited_emails: &invited_emails,
            })
            .await
            .map_err(|e| match AccessError::from(e) {
                AccessError::Conflict(_) => {
                    AccessError::Conflict(format!("access code {code} is already in use"))
                }
                other => other,
            })?;

        info!(
            access_id = %access.id,
            code = %access.code,
            recurrence = %schedule.recurrence,
            invited = invited_emails.len(),
            "Access created"
        );

        self.view(access, now).await
    }

    /// QR scan lookup.
    #[instrument(skip(self))]
    pub async fn get_by_code(
        &self,
        company_id: &str,
        code: &str,
        now: NaiveDateTime,
    ) -> Result<AccessView, AccessError> {
        self.lifecycle.run_due(now).await?;
        let access = self.find(company_id, code).await?;
        self.view(access, now).await
    }

    /// Active and finalized accesses overlapping the `from..=to` date range.
    #[instrument(skip(self))]
    pub async fn agenda(
        &self,
        company_id: &str,
        from: &str,
        to: &str,
        now: NaiveDateTime,
    ) -> Result<Vec<Access>, AccessError> {
        let from = parse_date(from)?;
        let to = parse_date(to)?;
        if from > to {
            return Err(AccessError::InvalidInput(format!(
                "agenda range starts after it ends ({from} > {to})"
            )));
        }

        self.lifecycle.run_due(now).await?;

        let accesses = self
            .db
            .list_agenda(
                company_id,
                &from.format(DATE_FORMAT).to_string(),
                &to.format(DATE_FORMAT).to_string(),
            )
            .await?;
        Ok(accesses)
    }

    /// Cancel an active access. Any other status is a refused transition.
    #[instrument(skip(self))]
    pub async fn cancel(&self, company_id: &str, code: &str) -> Result<Access, AccessError> {
        if self.db.cancel_access(company_id, code).await? {
            info!(code, "Access cancelled");
            return self.find(company_id, code).await;
        }

        let access = self.find(company_id, code).await?;
        Err(AccessError::InvalidTransition(format!(
            "access {code} is {} and cannot be cancelled",
            access.status
        )))
    }

    /// Record that an invited guest opened their invitation.
    ///
    /// Invitations only move forward, so one that is already opened or
    /// redeemed is returned unchanged.
    #[instrument(skip(self))]
    pub async fn mark_invite_opened(
        &self,
        company_id: &str,
        code: &str,
        email: &str,
    ) -> Result<InvitedGuest, AccessError> {
        let access = self.find(company_id, code).await?;
        let not_invited = || AccessError::NotFound(format!("Invitation for {email} on {code}"));

        let guest = self
            .db
            .get_invited_guest(&access.id, email)
            .await?
            .ok_or_else(not_invited)?;

        if guest.status.parse::<GuestStatus>() != Ok(GuestStatus::Sent) {
            return Ok(guest);
        }

        self.db.mark_guest_opened(&access.id, email).await?;
        self.db
            .get_invited_guest(&access.id, email)
            .await?
            .ok_or_else(not_invited)
    }

    async fn find(&self, company_id: &str, code: &str) -> Result<Access, AccessError> {
        self.db
            .get_access_by_code(company_id, code)
            .await?
            .ok_or_else(|| AccessError::NotFound(format!("Access {code}")))
    }

    async fn view(&self, access: Access, now: NaiveDateTime) -> Result<AccessView, AccessError> {
        let invited = self.db.list_invited_guests(&access.id).await?;
        let valid_now = is_open(&access, now);
        Ok(AccessView {
            access,
            invited,
            valid_now,
        })
    }
}

/// Normalize an email and reject obviously malformed ones.
pub(crate) fn checked_email(email: &str) -> Result<String, AccessError> {
    let email = normalize_email(email);
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(AccessError::InvalidInput(format!(
            "'{email}' is not an email address"
        ))),
    }
}
