#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::TimeDelta;
use serde_json::{Value, json};
use tower::ServiceExt;

use visitgate_core::CivilClock;
use visitgate_core::config::LifecycleConfig;
use visitgate_core::schedule::DATE_FORMAT;
use visitgate_server::notifications::Notifier;
use visitgate_server::routes::{AppState, build_router};
use visitgate_server::storage::AccessDatabase;

async fn app() -> axum::Router {
    let db = AccessDatabase::open_in_memory().await.unwrap();
    build_router(AppState::new(
        db,
        Notifier::Log,
        CivilClock::default(),
        &LifecycleConfig::default(),
    ))
}

/// Send a request to the app and return (status, JSON body).
async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(request).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Today's civil date shifted by `days`.
fn civil_date(days: i64) -> String {
    (CivilClock::default().now().date() + TimeDelta::days(days))
        .format(DATE_FORMAT)
        .to_string()
}

/// Create a company with one host and return `(company_id, host_id)`.
async fn seed_company(app: &axum::Router) -> (String, String) {
    let (status, company) = send(app, "POST", "/companies", Some(json!({"name": "Acme"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let company_id = company["id"].as_str().unwrap().to_string();

    let (status, user) = send(
        app,
        "POST",
        &format!("/companies/{company_id}/users"),
        Some(json!({"name": "Host", "email": "host@acme.test", "role": "host"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    (company_id, user["id"].as_str().unwrap().to_string())
}

/// An access open all day from yesterday until tomorrow.
fn open_access(host_id: &str, code: &str, extra: Value) -> Value {
    let mut body = json!({
        "creator_id": host_id,
        "code": code,
        "name": "Site visit",
        "start_date": civil_date(-1),
        "end_date": civil_date(1),
        "start_time": "00:00:00",
        "end_time": "23:59:59",
        "recurrence": "none",
        "auto_approval": true,
    });
    if let (Some(body), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
        body.extend(extra.clone());
    }
    body
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn create_lookup_and_redeem() {
    let app = app().await;
    let (company_id, host_id) = seed_company(&app).await;

    let (status, created) = send(
        &app,
        "POST",
        &format!("/companies/{company_id}/accesses"),
        Some(open_access(&host_id, "FRONT-DOOR", json!({"max_uses": 1}))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["qr_payload"], "visitgate:access:FRONT-DOOR");
    assert_eq!(created["valid_now"], true);

    let (status, found) = send(
        &app,
        "GET",
        &format!("/companies/{company_id}/accesses/FRONT-DOOR"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["status"], "active");

    let redeem_uri = format!("/companies/{company_id}/accesses/FRONT-DOOR/redeem");
    let (status, redemption) =
        send(&app, "POST", &redeem_uri, Some(json!({"email": "guest@x.test"}))).await;
    assert_eq!(status, StatusCode::OK, "{redemption}");
    assert_eq!(redemption["outcome"], "auto_approved");
    assert_eq!(redemption["visit"]["status"], "approved");

    let (status, err) =
        send(&app, "POST", &redeem_uri, Some(json!({"email": "guest@x.test"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["error"], "usage_exhausted");
}

#[tokio::test]
async fn unknown_code_is_404_with_error_body() {
    let app = app().await;
    let (company_id, _) = seed_company(&app).await;

    let (status, err) = send(
        &app,
        "POST",
        &format!("/companies/{company_id}/accesses/NOPE-NOPE/redeem"),
        Some(json!({"email": "guest@x.test"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["error"], "not_found");
    assert!(err["message"].as_str().unwrap().contains("NOPE-NOPE"));
}

#[tokio::test]
async fn blacklisted_visitor_is_forbidden() {
    let app = app().await;
    let (company_id, host_id) = seed_company(&app).await;
    send(
        &app,
        "POST",
        &format!("/companies/{company_id}/accesses"),
        Some(open_access(&host_id, "LOBBY", json!({}))),
    )
    .await;
    let (status, _) = send(
        &app,
        "POST",
        &format!("/companies/{company_id}/blacklist"),
        Some(json!({"email": "banned@x.test", "reason": "tailgating"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, err) = send(
        &app,
        "POST",
        &format!("/companies/{company_id}/accesses/LOBBY/redeem"),
        Some(json!({"email": "Banned@X.test"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(err["error"], "blacklisted");

    let (_, access) = send(
        &app,
        "GET",
        &format!("/companies/{company_id}/accesses/LOBBY"),
        None,
    )
    .await;
    assert_eq!(access["usage_count"], 0);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/companies/{company_id}/blacklist/banned@x.test"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn cancelled_access_is_window_closed() {
    let app = app().await;
    let (company_id, host_id) = seed_company(&app).await;
    send(
        &app,
        "POST",
        &format!("/companies/{company_id}/accesses"),
        Some(open_access(&host_id, "LOADING-BAY", json!({}))),
    )
    .await;

    let cancel_uri = format!("/companies/{company_id}/accesses/LOADING-BAY/cancel");
    let (status, cancelled) = send(&app, "POST", &cancel_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");

    let (status, err) = send(&app, "POST", &cancel_uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["error"], "invalid_transition");

    let (status, err) = send(
        &app,
        "POST",
        &format!("/companies/{company_id}/accesses/LOADING-BAY/redeem"),
        Some(json!({"email": "guest@x.test"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["error"], "window_closed");
}

#[tokio::test]
async fn codes_do_not_cross_tenants() {
    let app = app().await;
    let (company_a, host_a) = seed_company(&app).await;
    let (status, company_b) =
        send(&app, "POST", "/companies", Some(json!({"name": "Globex"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let company_b = company_b["id"].as_str().unwrap();

    send(
        &app,
        "POST",
        &format!("/companies/{company_a}/accesses"),
        Some(open_access(&host_a, "TENANT-A", json!({}))),
    )
    .await;

    let (status, _) = send(
        &app,
        "GET",
        &format!("/companies/{company_b}/accesses/TENANT-A"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_schedule_and_bad_json_are_400() {
    let app = app().await;
    let (company_id, host_id) = seed_company(&app).await;
    let uri = format!("/companies/{company_id}/accesses");

    let inverted = open_access(
        &host_id,
        "BACKWARDS",
        json!({"start_date": civil_date(2), "end_date": civil_date(0)}),
    );
    let (status, err) = send(&app, "POST", &uri, Some(inverted)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error"], "invalid_schedule");

    let (status, err) = send(&app, "POST", &uri, Some(json!({"name": "missing fields"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error"], "invalid_input");
}

#[tokio::test]
async fn pending_visit_decision_flow() {
    let app = app().await;
    let (company_id, host_id) = seed_company(&app).await;
    send(
        &app,
        "POST",
        &format!("/companies/{company_id}/accesses"),
        Some(open_access(&host_id, "RECEPTION", json!({"auto_approval": false}))),
    )
    .await;

    let (status, redemption) = send(
        &app,
        "POST",
        &format!("/companies/{company_id}/accesses/RECEPTION/redeem"),
        Some(json!({"email": "guest@x.test", "name": "Guest"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(redemption["outcome"], "pending_approval");
    let visit_id = redemption["visit"]["id"].as_str().unwrap();

    let (status, visits) = send(
        &app,
        "GET",
        &format!("/companies/{company_id}/visits?status=pending"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(visits.as_array().unwrap().len(), 1);

    let decision_uri = format!("/companies/{company_id}/visits/{visit_id}/decision");
    let (status, visit) = send(
        &app,
        "POST",
        &decision_uri,
        Some(json!({"decision": "deny", "decided_by": host_id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(visit["status"], "denied");

    let (status, err) =
        send(&app, "POST", &decision_uri, Some(json!({"decision": "approve"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["error"], "invalid_transition");
}

#[tokio::test]
async fn agenda_and_invites() {
    let app = app().await;
    let (company_id, host_id) = seed_company(&app).await;
    send(
        &app,
        "POST",
        &format!("/companies/{company_id}/accesses"),
        Some(open_access(
            &host_id,
            "BOARDROOM",
            json!({"invited_emails": ["auditor@x.test"], "allow_guests": false}),
        )),
    )
    .await;

    let (status, agenda) = send(
        &app,
        "GET",
        &format!(
            "/companies/{company_id}/agenda?from={}&to={}",
            civil_date(0),
            civil_date(7)
        ),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(agenda[0]["code"], "BOARDROOM");

    let (status, guest) = send(
        &app,
        "POST",
        &format!("/companies/{company_id}/accesses/BOARDROOM/invites/auditor@x.test/opened"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(guest["status"], "opened");

    let (status, err) = send(
        &app,
        "POST",
        &format!("/companies/{company_id}/accesses/BOARDROOM/redeem"),
        Some(json!({"email": "walk-in@x.test"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(err["error"], "not_invited");

    let (status, _) = send(
        &app,
        "GET",
        &format!("/companies/{company_id}/agenda?from=bogus"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
