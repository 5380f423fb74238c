//! # Registration API
//!
//! Self-service sign-up. The ID card image itself is stored elsewhere; the
//! request carries only an opaque reference to it.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use fest_state::{NewRegistration, Registration};

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::lifecycle;
use crate::state::AppState;

/// Registration submission.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct RegisterRequest {
    pub name: String,
    pub roll_number: String,
    pub branch: String,
    pub email: String,
    pub phone: String,
    /// Reference to the uploaded ID card image.
    pub id_card_reference: String,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), String> {
        let missing: Vec<&str> = [
            ("name", &self.name),
            ("roll_number", &self.roll_number),
            ("branch", &self.branch),
            ("email", &self.email),
            ("phone", &self.phone),
            ("id_card_reference", &self.id_card_reference),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!("missing required fields: {}", missing.join(", ")))
        }
    }
}

impl From<RegisterRequest> for NewRegistration {
    fn from(req: RegisterRequest) -> Self {
        NewRegistration {
            name: req.name,
            roll_number: req.roll_number,
            branch: req.branch,
            email: req.email,
            phone: req.phone,
            id_card_reference: req.id_card_reference,
        }
    }
}

/// A registration as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegistrationView {
    pub id: Uuid,
    pub name: String,
    pub roll_number: String,
    pub branch: String,
    pub email: String,
    pub phone: String,
    pub id_card_reference: String,
    /// `PENDING`, `APPROVED` or `REJECTED`.
    #[schema(value_type = String)]
    pub status: String,
    /// PNG data URL of the QR ticket; present only when approved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_entry_at: Option<String>,
    pub entry_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Registration> for RegistrationView {
    fn from(reg: &Registration) -> Self {
        Self {
            id: reg.id.0,
            name: reg.name.clone(),
            roll_number: reg.roll_number.to_string(),
            branch: reg.branch.clone(),
            email: reg.email.to_string(),
            phone: reg.phone.clone(),
            id_card_reference: reg.id_card_reference.clone(),
            status: reg.status.as_str().to_string(),
            credential: reg.credential.as_ref().map(|c| c.as_str().to_string()),
            last_entry_at: reg.last_entry_at.map(|t| t.to_iso8601()),
            entry_count: reg.entry_count,
            reviewed_at: reg.reviewed_at.map(|t| t.to_iso8601()),
            created_at: reg.created_at.to_iso8601(),
            updated_at: reg.updated_at.to_iso8601(),
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/registrations", post(register))
}

/// POST /v1/registrations: Submit a registration for review.
#[utoipa::path(
    post,
    path = "/v1/registrations",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registration submitted", body = RegistrationView),
        (status = 400, description = "Missing or invalid field", body = crate::error::ErrorBody),
        (status = 409, description = "Roll number or email already registered", body = crate::error::ErrorBody),
    ),
    tag = "registrations"
)]
pub(crate) async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegistrationView>), AppError> {
    let req = extract_validated_json(body)?;
    let stored = lifecycle::register(&state, req.into()).await?;
    Ok((StatusCode::CREATED, Json(RegistrationView::from(&stored))))
}
