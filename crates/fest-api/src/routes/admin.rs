//! # Admin Console API
//!
//! Login is public. Everything else requires a session issued by login and
//! is wrapped in [`admin_auth_middleware`](crate::auth::admin_auth_middleware)
//! by [`crate::app`].

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use fest_core::RegistrationId;

use crate::auth::{self, AdminIdentity};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::lifecycle::{self, ReviewResult};
use crate::routes::registrations::RegistrationView;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), String> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err("email and password must not be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    /// RFC 3339 expiry of the session.
    pub expires_at: String,
}

/// Outcome of approve or reject.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReviewResponse {
    pub registration: RegistrationView,
    /// Whether the student was emailed.
    pub notification_sent: bool,
    /// False when a reject found the registration already rejected.
    pub changed: bool,
}

impl From<ReviewResult> for ReviewResponse {
    fn from(result: ReviewResult) -> Self {
        Self {
            registration: RegistrationView::from(&result.registration),
            notification_sent: result.notification_sent,
            changed: result.changed,
        }
    }
}

/// Public part of the admin surface.
pub fn login_router() -> Router<AppState> {
    Router::new().route("/v1/admin/login", post(login))
}

/// Session-protected part of the admin surface.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/registrations", get(list_registrations))
        .route("/v1/admin/registrations/:id", get(get_registration))
        .route("/v1/admin/registrations/:id/approve", put(approve_registration))
        .route("/v1/admin/registrations/:id/reject", put(reject_registration))
}

/// POST /v1/admin/login: Exchange admin credentials for a session token.
#[utoipa::path(
    post,
    path = "/v1/admin/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = LoginResponse),
        (status = 401, description = "Invalid email or password", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
pub(crate) async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let session = auth::authenticate(&state, &req.email, &req.password).await?;
    Ok(Json(LoginResponse {
        token: session.token,
        expires_at: session.expires_at.to_iso8601(),
    }))
}

/// GET /v1/admin/registrations: All registrations, newest first.
#[utoipa::path(
    get,
    path = "/v1/admin/registrations",
    responses(
        (status = 200, description = "Registrations", body = Vec<RegistrationView>),
        (status = 401, description = "Missing or invalid session", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub(crate) async fn list_registrations(
    State(state): State<AppState>,
    _admin: AdminIdentity,
) -> Result<Json<Vec<RegistrationView>>, AppError> {
    let all = state.repo.list().await?;
    Ok(Json(all.iter().map(RegistrationView::from).collect()))
}

/// GET /v1/admin/registrations/:id: One registration.
#[utoipa::path(
    get,
    path = "/v1/admin/registrations/{id}",
    params(("id" = Uuid, Path, description = "Registration ID")),
    responses(
        (status = 200, description = "Registration found", body = RegistrationView),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub(crate) async fn get_registration(
    State(state): State<AppState>,
    _admin: AdminIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<RegistrationView>, AppError> {
    let id = RegistrationId::from(id);
    state
        .repo
        .get(id)
        .await?
        .map(|reg| Json(RegistrationView::from(&reg)))
        .ok_or_else(|| AppError::NotFound(format!("{id} not found")))
}

/// PUT /v1/admin/registrations/:id/approve: Approve and issue a QR ticket.
#[utoipa::path(
    put,
    path = "/v1/admin/registrations/{id}/approve",
    params(("id" = Uuid, Path, description = "Registration ID")),
    responses(
        (status = 200, description = "Approved", body = ReviewResponse),
        (status = 400, description = "Already approved", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub(crate) async fn approve_registration(
    State(state): State<AppState>,
    admin: AdminIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<ReviewResponse>, AppError> {
    tracing::debug!(admin = %admin.email, registration = %id, "approve requested");
    let result = lifecycle::approve(&state, RegistrationId::from(id)).await?;
    Ok(Json(result.into()))
}

/// PUT /v1/admin/registrations/:id/reject: Reject; repeated rejects are no-ops.
#[utoipa::path(
    put,
    path = "/v1/admin/registrations/{id}/reject",
    params(("id" = Uuid, Path, description = "Registration ID")),
    responses(
        (status = 200, description = "Rejected", body = ReviewResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub(crate) async fn reject_registration(
    State(state): State<AppState>,
    admin: AdminIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<ReviewResponse>, AppError> {
    tracing::debug!(admin = %admin.email, registration = %id, "reject requested");
    let result = lifecycle::reject(&state, RegistrationId::from(id)).await?;
    Ok(Json(result.into()))
}
