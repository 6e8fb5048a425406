//! Access code redemption.

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::access_svc::{checked_email, is_open};
use crate::error::AccessError;
use crate::lifecycle::Lifecycle;
use crate::notifications::{Notifier, ReminderSink};
use crate::storage::{Access, AccessDatabase, RedemptionWrite, Visit, VisitStatus};

/// The identity presented at the door.
#[derive(Debug, Clone, Deserialize)]
pub struct RedeemRequest {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RedemptionOutcome {
    AutoApproved,
    PendingApproval,
}

#[derive(Debug, Clone, Serialize)]
pub struct Redemption {
    pub outcome: RedemptionOutcome,
    pub visit: Visit,
}

pub struct RedemptionService<S = Notifier> {
    db: AccessDatabase,
    lifecycle: Arc<Lifecycle<S>>,
}

impl<S: ReminderSink> RedemptionService<S> {
    pub const fn new(db: AccessDatabase, lifecycle: Arc<Lifecycle<S>>) -> Self {
        Self { db, lifecycle }
    }

    /// Redeem one use of `code` for the presented identity.
    ///
    /// Checks run in a fixed order and the first failure wins: unknown code,
    /// malformed identity, closed window, exhausted uses, blacklisted
    /// identity, then (for invite-only accesses) an identity missing from the
    /// invitation list.
    #[instrument(skip(self, req))]
    pub async fn redeem(
        &self,
        company_id: &str,
        code: &str,
        req: &RedeemRequest,
        now: NaiveDateTime,
    ) -> Result<Redemption, AccessError> {
        self.lifecycle.run_due(now).await?;

        let access = self
            .db
            .get_access_by_code(company_id, code)
            .await?
            .ok_or_else(|| AccessError::NotFound(format!("Access {code}")))?;
        let email = checked_email(&req.email)?;

        if !is_open(&access, now) {
            return Err(AccessError::WindowClosed);
        }
        if !access.has_uses_left() {
            return Err(AccessError::UsageExhausted);
        }
        if self.db.is_blacklisted(&email, company_id).await? {
            info!(code, "Blacklisted visitor refused");
            return Err(AccessError::Blacklisted);
        }
        if !access.allow_guests
            && self.db.get_invited_guest(&access.id, &email).await?.is_none()
            && !self.db.list_invited_guests(&access.id).await?.is_empty()
        {
            return Err(AccessError::NotInvited);
        }

        let visitor_name = req.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
        self.record_use(&access, &email, visitor_name).await
    }

    /// Consume one use of an access that passed the checks and write the visit.
    ///
    /// The increment is conditional, so an access cancelled, finalized or
    /// used up since it was read is refused here.
    pub(crate) async fn record_use(
        &self,
        access: &Access,
        email: &str,
        visitor_name: Option<&str>,
    ) -> Result<Redemption, AccessError> {
        let (outcome, visit_status) = if access.auto_approval {
            (RedemptionOutcome::AutoApproved, VisitStatus::Approved)
        } else {
            (RedemptionOutcome::PendingApproval, VisitStatus::Pending)
        };
        let visit_id = uuid::Uuid::new_v4().to_string();

        let written = self
            .db
            .redeem_use(&RedemptionWrite {
                access_id: &access.id,
                company_id: &access.company_id,
                visit_id: &visit_id,
                visitor_email: email,
                visitor_name,
                host_id: Some(&access.creator_id),
                visit_status,
            })
            .await?;

        let Some(visit) = written else {
            let current = self.db.get_access(&access.company_id, &access.id).await?;
            return Err(if current.status().is_terminal() {
                AccessError::WindowClosed
            } else {
                AccessError::UsageExhausted
            });
        };

        info!(
            code = %access.code,
            visit_id = %visit.id,
            outcome = ?outcome,
            "Access redeemed"
        );

        Ok(Redemption { outcome, visit })
    }
}
