//! Tests for `AccessService`.
#![allow(clippy::unwrap_used)]

use super::access_svc::NewAccess;
use super::test_helpers::{at, fixture, january_daily};
use crate::code::CODE_LEN;
use crate::error::AccessError;
use crate::storage::AccessStatus;

#[tokio::test]
async fn create_generates_code_and_qr_payload() {
    let fx = fixture().await;
    let req = NewAccess {
        code: None,
        invited_emails: vec!["Guest@X.test ".into(), "guest@x.test".into()],
        ..january_daily("unused")
    };

    let view = fx.accesses.create("c1", &req, at("2025-01-15 09:00:00")).await.unwrap();

    assert_eq!(view.access.code.len(), CODE_LEN);
    assert_eq!(
        view.access.qr_payload.as_deref(),
        Some(format!("visitgate:access:{}", view.access.code).as_str())
    );
    assert_eq!(view.access.status(), AccessStatus::Active);
    assert_eq!(view.access.usage_count, 0);
    assert_eq!(view.invited.len(), 1);
    assert_eq!(view.invited[0].email, "guest@x.test");
    assert_eq!(view.invited[0].status, "sent");
    assert!(view.valid_now);
}

#[tokio::test]
async fn create_rejects_bad_schedules() {
    let fx = fixture().await;
    let now = at("2025-01-15 09:00:00");

    let inverted_dates = NewAccess {
        start_date: "2025-02-01".into(),
        ..january_daily("BAD-1")
    };
    let err = fx.accesses.create("c1", &inverted_dates, now).await.unwrap_err();
    assert!(matches!(err, AccessError::InvalidSchedule(_)), "{err}");

    let overnight_daily = NewAccess {
        start_time: "22:00".into(),
        end_time: "06:00".into(),
        ..january_daily("BAD-2")
    };
    let err = fx.accesses.create("c1", &overnight_daily, now).await.unwrap_err();
    assert!(matches!(err, AccessError::InvalidSchedule(_)), "{err}");

    let unknown_recurrence = NewAccess {
        recurrence: Some("fortnightly".into()),
        ..january_daily("BAD-3")
    };
    let err = fx.accesses.create("c1", &unknown_recurrence, now).await.unwrap_err();
    assert!(matches!(err, AccessError::InvalidSchedule(_)), "{err}");

    let five_digit_year = NewAccess {
        end_date: "+10000-01-01".into(),
        ..january_daily("BAD-4")
    };
    let err = fx.accesses.create("c1", &five_digit_year, now).await.unwrap_err();
    assert!(matches!(err, AccessError::InvalidSchedule(_)), "{err}");
    assert!(fx.db.get_access_by_code("c1", "BAD-4").await.unwrap().is_none());
}

#[tokio::test]
async fn create_rejects_conflicting_policies_and_bad_input() {
    let fx = fixture().await;
    let now = at("2025-01-15 09:00:00");

    let both = NewAccess {
        auto_approval: true,
        require_approval: true,
        ..january_daily("POLICY")
    };
    assert!(matches!(
        fx.accesses.create("c1", &both, now).await.unwrap_err(),
        AccessError::InvalidInput(_)
    ));

    let bad_email = NewAccess {
        invited_emails: vec!["not-an-email".into()],
        ..january_daily("EMAIL")
    };
    assert!(matches!(
        fx.accesses.create("c1", &bad_email, now).await.unwrap_err(),
        AccessError::InvalidInput(_)
    ));

    let bad_code = january_daily("no spaces allowed");
    assert!(matches!(
        fx.accesses.create("c1", &bad_code, now).await.unwrap_err(),
        AccessError::InvalidInput(_)
    ));
}

#[tokio::test]
async fn receptionists_and_foreign_users_cannot_create() {
    let fx = fixture().await;
    let now = at("2025-01-15 09:00:00");

    let by_receptionist = NewAccess {
        creator_id: "r1".into(),
        ..january_daily("DESK")
    };
    assert!(matches!(
        fx.accesses.create("c1", &by_receptionist, now).await.unwrap_err(),
        AccessError::InvalidInput(_)
    ));

    let by_other_tenant = NewAccess {
        creator_id: "u2".into(),
        ..january_daily("OTHER")
    };
    assert!(matches!(
        fx.accesses.create("c1", &by_other_tenant, now).await.unwrap_err(),
        AccessError::NotFound(_)
    ));
}

#[tokio::test]
async fn duplicate_code_is_a_conflict() {
    let fx = fixture().await;
    let now = at("2025-01-15 09:00:00");

    fx.accesses.create("c1", &january_daily("SAME"), now).await.unwrap();
    let err = fx.accesses.create("c1", &january_daily("SAME"), now).await.unwrap_err();
    assert_eq!(err.kind(), "conflict");
}

#[tokio::test]
async fn lookup_is_tenant_scoped() {
    let fx = fixture().await;
    let now = at("2025-01-15 09:00:00");
    fx.accesses.create("c1", &january_daily("SCOPED"), now).await.unwrap();

    assert!(fx.accesses.get_by_code("c1", "SCOPED", now).await.is_ok());
    assert!(matches!(
        fx.accesses.get_by_code("c2", "SCOPED", now).await.unwrap_err(),
        AccessError::NotFound(_)
    ));
}

#[tokio::test]
async fn lookup_reports_validity_at_now() {
    let fx = fixture().await;
    fx.accesses
        .create("c1", &january_daily("VALID"), at("2025-01-01 00:00:00"))
        .await
        .unwrap();

    let inside = fx.accesses.get_by_code("c1", "VALID", at("2025-01-15 09:00:00")).await.unwrap();
    assert!(inside.valid_now);

    let evening = fx.accesses.get_by_code("c1", "VALID", at("2025-01-15 19:00:00")).await.unwrap();
    assert!(!evening.valid_now);
    assert_eq!(evening.access.status(), AccessStatus::Active);
}

#[tokio::test]
async fn lookup_finalizes_closed_accesses_first() {
    let fx = fixture().await;
    fx.accesses
        .create("c1", &january_daily("DONE"), at("2025-01-01 00:00:00"))
        .await
        .unwrap();

    let view = fx.accesses.get_by_code("c1", "DONE", at("2025-02-01 08:00:00")).await.unwrap();
    assert_eq!(view.access.status(), AccessStatus::Finalized);
    assert!(!view.valid_now);
}

#[tokio::test]
async fn agenda_lists_overlapping_active_and_finalized() {
    let fx = fixture().await;
    let now = at("2025-01-01 00:00:00");
    fx.accesses.create("c1", &january_daily("JAN-25"), now).await.unwrap();
    let december = NewAccess {
        start_date: "2024-12-01".into(),
        end_date: "2024-12-20".into(),
        ..january_daily("DEC-24")
    };
    fx.accesses.create("c1", &december, now).await.unwrap();
    let february = NewAccess {
        start_date: "2025-02-01".into(),
        end_date: "2025-02-10".into(),
        ..january_daily("FEB-25")
    };
    fx.accesses.create("c1", &february, now).await.unwrap();
    fx.accesses.create("c1", &january_daily("GONE"), now).await.unwrap();
    fx.accesses.cancel("c1", "GONE").await.unwrap();

    let agenda = fx
        .accesses
        .agenda("c1", "2024-12-15", "2025-01-10", at("2025-01-05 10:00:00"))
        .await
        .unwrap();
    let codes: Vec<_> = agenda.iter().map(|a| a.code.as_str()).collect();
    assert_eq!(codes, ["DEC-24", "JAN-25"]);
    assert_eq!(agenda[0].status(), AccessStatus::Finalized);

    assert!(fx.accesses.agenda("c2", "2024-12-15", "2025-01-10", now).await.unwrap().is_empty());
}

#[tokio::test]
async fn agenda_rejects_bad_ranges() {
    let fx = fixture().await;
    let now = at("2025-01-05 10:00:00");

    assert!(matches!(
        fx.accesses.agenda("c1", "2025-01-10", "2025-01-01", now).await.unwrap_err(),
        AccessError::InvalidInput(_)
    ));
    assert!(matches!(
        fx.accesses.agenda("c1", "January", "2025-01-01", now).await.unwrap_err(),
        AccessError::InvalidSchedule(_)
    ));
}

#[tokio::test]
async fn cancel_only_from_active() {
    let fx = fixture().await;
    fx.accesses
        .create("c1", &january_daily("CANCEL"), at("2025-01-01 00:00:00"))
        .await
        .unwrap();

    let cancelled = fx.accesses.cancel("c1", "CANCEL").await.unwrap();
    assert_eq!(cancelled.status(), AccessStatus::Cancelled);

    assert!(matches!(
        fx.accesses.cancel("c1", "CANCEL").await.unwrap_err(),
        AccessError::InvalidTransition(_)
    ));
    assert!(matches!(
        fx.accesses.cancel("c1", "MISSING").await.unwrap_err(),
        AccessError::NotFound(_)
    ));
}

#[tokio::test]
async fn finalized_access_cannot_be_cancelled() {
    let fx = fixture().await;
    fx.accesses
        .create("c1", &january_daily("STALE"), at("2025-01-01 00:00:00"))
        .await
        .unwrap();
    fx.accesses.get_by_code("c1", "STALE", at("2025-03-01 00:00:00")).await.unwrap();

    let err = fx.accesses.cancel("c1", "STALE").await.unwrap_err();
    assert!(err.to_string().contains("finalized"), "{err}");
}

#[tokio::test]
async fn invite_opened_moves_forward_only() {
    let fx = fixture().await;
    let req = NewAccess {
        invited_emails: vec!["guest@x.test".into()],
        ..january_daily("INVITE")
    };
    fx.accesses.create("c1", &req, at("2025-01-01 00:00:00")).await.unwrap();

    let opened = fx.accesses.mark_invite_opened("c1", "INVITE", "GUEST@x.test").await.unwrap();
    assert_eq!(opened.status, "opened");

    let again = fx.accesses.mark_invite_opened("c1", "INVITE", "guest@x.test").await.unwrap();
    assert_eq!(again.status, "opened");

    assert!(matches!(
        fx.accesses.mark_invite_opened("c1", "INVITE", "stranger@x.test").await.unwrap_err(),
        AccessError::NotFound(_)
    ));
}
