//! HTTP routes.
//!
//! Every tenant resource lives under `/companies/{company_id}`. Handlers read
//! the civil clock once and pass that instant down to the services.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::error;
use visitgate_core::CivilClock;
use visitgate_core::config::LifecycleConfig;

use crate::error::AccessError;
use crate::lifecycle::Lifecycle;
use crate::notifications::Notifier;
use crate::services::{
    AccessService, AccessView, AdminService, NewAccess, NewBlacklistEntry, NewCompany, NewUser,
    RedeemRequest, Redemption, RedemptionService, VisitDecision, VisitFilter,
};
use crate::storage::{Access, AccessDatabase, BlacklistEntry, Company, InvitedGuest, User, Visit};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub admin: Arc<AdminService>,
    pub accesses: Arc<AccessService>,
    pub redemptions: Arc<RedemptionService>,
    pub clock: CivilClock,
}

impl AppState {
    /// Wire the services around one database handle and one lifecycle gate.
    pub fn new(
        db: AccessDatabase,
        notifier: Notifier,
        clock: CivilClock,
        lifecycle: &LifecycleConfig,
    ) -> Self {
        let lifecycle = Arc::new(Lifecycle::new(db.clone(), notifier, lifecycle));
        Self {
            admin: Arc::new(AdminService::new(db.clone())),
            accesses: Arc::new(AccessService::new(db.clone(), Arc::clone(&lifecycle))),
            redemptions: Arc::new(RedemptionService::new(db, lifecycle)),
            clock,
        }
    }
}

/// Error body: `{"error": "<kind>", "message": "<text>"}`.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

/// An [`AccessError`] on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub AccessError);

impl ApiError {
    pub const fn status(&self) -> StatusCode {
        match &self.0 {
            AccessError::NotFound(_) => StatusCode::NOT_FOUND,
            AccessError::WindowClosed
            | AccessError::UsageExhausted
            | AccessError::InvalidTransition(_)
            | AccessError::Conflict(_) => StatusCode::CONFLICT,
            AccessError::Blacklisted | AccessError::NotInvited => StatusCode::FORBIDDEN,
            AccessError::InvalidSchedule(_) | AccessError::InvalidInput(_) => {
                StatusCode::BAD_REQUEST
            }
            AccessError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AccessError> for ApiError {
    fn from(e: AccessError) -> Self {
        Self(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self(AccessError::InvalidInput(e.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        Self(AccessError::InvalidInput(e.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if let AccessError::Storage(e) = &self.0 {
            error!(error = %e, "Storage failure while handling request");
            "internal storage error".to_string()
        } else {
            self.0.to_string()
        };
        let body = ErrorBody {
            error: self.0.kind(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/companies", post(create_company).get(list_companies))
        .route("/companies/{company_id}", get(get_company))
        .route(
            "/companies/{company_id}/users",
            post(create_user).get(list_users),
        )
        .route(
            "/companies/{company_id}/blacklist",
            post(add_blacklist_entry).get(list_blacklist),
        )
        .route(
            "/companies/{company_id}/blacklist/{email}",
            delete(remove_blacklist_entry),
        )
        .route("/companies/{company_id}/accesses", post(create_access))
        .route("/companies/{company_id}/accesses/{code}", get(get_access))
        .route(
            "/companies/{company_id}/accesses/{code}/redeem",
            post(redeem_access),
        )
        .route(
            "/companies/{company_id}/accesses/{code}/cancel",
            post(cancel_access),
        )
        .route(
            "/companies/{company_id}/accesses/{code}/invites/{email}/opened",
            post(mark_invite_opened),
        )
        .route("/companies/{company_id}/agenda", get(agenda))
        .route("/companies/{company_id}/visits", get(list_visits))
        .route(
            "/companies/{company_id}/visits/{visit_id}/decision",
            post(decide_visit),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
}

/// `GET /health`
async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// =============================================================================
// Tenancy
// =============================================================================

/// `POST /companies`
async fn create_company(
    State(state): State<AppState>,
    payload: Result<Json<NewCompany>, JsonRejection>,
) -> Result<(StatusCode, Json<Company>), ApiError> {
    let Json(req) = payload?;
    let company = state.admin.create_company(&req).await?;
    Ok((StatusCode::CREATED, Json(company)))
}

/// `GET /companies`
async fn list_companies(State(state): State<AppState>) -> ApiResult<Vec<Company>> {
    Ok(Json(state.admin.list_companies().await?))
}

/// `GET /companies/{company_id}`
async fn get_company(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
) -> ApiResult<Company> {
    Ok(Json(state.admin.get_company(&company_id).await?))
}

/// `POST /companies/{company_id}/users`
async fn create_user(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let Json(req) = payload?;
    let user = state.admin.create_user(&company_id, &req).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// `GET /companies/{company_id}/users`
async fn list_users(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
) -> ApiResult<Vec<User>> {
    Ok(Json(state.admin.list_users(&company_id).await?))
}

/// `POST /companies/{company_id}/blacklist`
async fn add_blacklist_entry(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
    payload: Result<Json<NewBlacklistEntry>, JsonRejection>,
) -> Result<(StatusCode, Json<BlacklistEntry>), ApiError> {
    let Json(req) = payload?;
    let entry = state.admin.add_blacklist_entry(&company_id, &req).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// `GET /companies/{company_id}/blacklist`
async fn list_blacklist(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
) -> ApiResult<Vec<BlacklistEntry>> {
    Ok(Json(state.admin.list_blacklist(&company_id).await?))
}

/// `DELETE /companies/{company_id}/blacklist/{email}`
async fn remove_blacklist_entry(
    State(state): State<AppState>,
    Path((company_id, email)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state.admin.remove_blacklist_entry(&company_id, &email).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Accesses
// =============================================================================

/// `POST /companies/{company_id}/accesses`
async fn create_access(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
    payload: Result<Json<NewAccess>, JsonRejection>,
) -> Result<(StatusCode, Json<AccessView>), ApiError> {
    let Json(req) = payload?;
    let view = state
        .accesses
        .create(&company_id, &req, state.clock.now())
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// `GET /companies/{company_id}/accesses/{code}` — QR scan lookup.
async fn get_access(
    State(state): State<AppState>,
    Path((company_id, code)): Path<(String, String)>,
) -> ApiResult<AccessView> {
    let view = state
        .accesses
        .get_by_code(&company_id, &code, state.clock.now())
        .await?;
    Ok(Json(view))
}

/// `POST /companies/{company_id}/accesses/{code}/redeem`
async fn redeem_access(
    State(state): State<AppState>,
    Path((company_id, code)): Path<(String, String)>,
    payload: Result<Json<RedeemRequest>, JsonRejection>,
) -> ApiResult<Redemption> {
    let Json(req) = payload?;
    let redemption = state
        .redemptions
        .redeem(&company_id, &code, &req, state.clock.now())
        .await?;
    Ok(Json(redemption))
}

/// `POST /companies/{company_id}/accesses/{code}/cancel`
async fn cancel_access(
    State(state): State<AppState>,
    Path((company_id, code)): Path<(String, String)>,
) -> ApiResult<Access> {
    Ok(Json(state.accesses.cancel(&company_id, &code).await?))
}

/// `POST /companies/{company_id}/accesses/{code}/invites/{email}/opened`
async fn mark_invite_opened(
    State(state): State<AppState>,
    Path((company_id, code, email)): Path<(String, String, String)>,
) -> ApiResult<InvitedGuest> {
    let guest = state
        .accesses
        .mark_invite_opened(&company_id, &code, &email)
        .await?;
    Ok(Json(guest))
}

#[derive(Debug, Deserialize)]
struct AgendaQuery {
    from: String,
    to: String,
}

/// `GET /companies/{company_id}/agenda?from=YYYY-MM-DD&to=YYYY-MM-DD`
async fn agenda(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
    query: Result<Query<AgendaQuery>, QueryRejection>,
) -> ApiResult<Vec<Access>> {
    let Query(range) = query?;
    let accesses = state
        .accesses
        .agenda(&company_id, &range.from, &range.to, state.clock.now())
        .await?;
    Ok(Json(accesses))
}

// =============================================================================
// Visits
// =============================================================================

/// `GET /companies/{company_id}/visits?status=`
async fn list_visits(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
    query: Result<Query<VisitFilter>, QueryRejection>,
) -> ApiResult<Vec<Visit>> {
    let Query(filter) = query?;
    Ok(Json(state.admin.list_visits(&company_id, &filter).await?))
}

/// `POST /companies/{company_id}/visits/{visit_id}/decision`
async fn decide_visit(
    State(state): State<AppState>,
    Path((company_id, visit_id)): Path<(String, String)>,
    payload: Result<Json<VisitDecision>, JsonRejection>,
) -> ApiResult<Visit> {
    let Json(req) = payload?;
    let visit = state
        .admin
        .decide_visit(&company_id, &visit_id, &req)
        .await?;
    Ok(Json(visit))
}
