//! Shared setup for the service test modules.
#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chrono::NaiveDateTime;
use visitgate_core::config::LifecycleConfig;

use super::access_svc::{AccessService, NewAccess};
use super::redeem_svc::RedemptionService;
use crate::lifecycle::Lifecycle;
use crate::notifications::Notifier;
use crate::storage::{AccessDatabase, UserRole};

pub struct Fixture {
    pub db: AccessDatabase,
    pub accesses: AccessService,
    pub redemptions: RedemptionService,
}

/// Civil date-time from `YYYY-MM-DD HH:MM:SS`.
pub fn at(value: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(value, visitgate_core::schedule::DATETIME_FORMAT).unwrap()
}

/// Companies `c1` and `c2`, host `u1` in `c1`, receptionist `r1` in `c1`,
/// host `u2` in `c2`.
pub async fn fixture() -> Fixture {
    let db = AccessDatabase::open_in_memory().await.unwrap();
    db.create_company("c1", "Acme").await.unwrap();
    db.create_company("c2", "Globex").await.unwrap();
    db.create_user("u1", "c1", "Host", "host@acme.test", UserRole::Host)
        .await
        .unwrap();
    db.create_user("r1", "c1", "Desk", "desk@acme.test", UserRole::Receptionist)
        .await
        .unwrap();
    db.create_user("u2", "c2", "Other", "host@globex.test", UserRole::Host)
        .await
        .unwrap();

    let lifecycle = Arc::new(Lifecycle::new(
        db.clone(),
        Notifier::Log,
        &LifecycleConfig::default(),
    ));

    Fixture {
        accesses: AccessService::new(db.clone(), Arc::clone(&lifecycle)),
        redemptions: RedemptionService::new(db.clone(), lifecycle),
        db,
    }
}

/// Daily 08:00-18:00 through January 2025, created by `u1`.
pub fn january_daily(code: &str) -> NewAccess {
    NewAccess {
        creator_id: "u1".into(),
        code: Some(code.into()),
        name: "January visits".into(),
        start_date: "2025-01-01".into(),
        end_date: "2025-01-31".into(),
        start_time: "08:00".into(),
        end_time: "18:00".into(),
        recurrence: Some("daily".into()),
        auto_approval: true,
        max_uses: 0,
        allow_guests: true,
        require_approval: false,
        invited_emails: Vec::new(),
    }
}
