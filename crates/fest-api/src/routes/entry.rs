//! # Entry Validation API
//!
//! Called by gate scanners with the raw text decoded from a ticket QR code.
//! Every decision, including refusals, comes back as an [`EntryResponse`];
//! the HTTP status mirrors it:
//!
//! | outcome        | status |
//! |----------------|--------|
//! | `accepted`     | 200    |
//! | `duplicate`    | 400    |
//! | `not_approved` | 400    |
//! | `not_found`    | 404    |
//!
//! An empty payload is a validation error and uses the error envelope.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use fest_state::EntryDecision;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::lifecycle;
use crate::middleware::metrics::ApiMetrics;
use crate::routes::registrations::RegistrationView;
use crate::state::AppState;
use crate::store::EntryOutcome;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidateEntryRequest {
    /// Text decoded from the QR code.
    #[serde(default)]
    pub payload: String,
}

impl Validate for ValidateEntryRequest {
    fn validate(&self) -> Result<(), String> {
        if self.payload.trim().is_empty() {
            return Err("payload must not be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EntryResponse {
    pub accepted: bool,
    /// `accepted`, `duplicate`, `not_approved` or `not_found`.
    pub outcome: String,
    pub message: String,
    pub roll_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entered_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_entry_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_cooldown_secs: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration: Option<RegistrationView>,
}

impl EntryResponse {
    fn from_outcome(roll_number: String, outcome: &EntryOutcome) -> (StatusCode, Self) {
        let mut response = Self {
            accepted: outcome.decision.is_accepted(),
            outcome: outcome.decision.outcome().to_string(),
            message: String::new(),
            roll_number,
            entered_at: None,
            last_entry_at: None,
            remaining_cooldown_secs: None,
            registration: outcome.registration.as_ref().map(RegistrationView::from),
        };
        let status = match &outcome.decision {
            EntryDecision::Accepted {
                entered_at,
                first_entry,
            } => {
                response.message = if *first_entry {
                    "QR Code verified successfully".to_string()
                } else {
                    "QR Code verified successfully; re-entry allowed".to_string()
                };
                response.entered_at = Some(entered_at.to_iso8601());
                StatusCode::OK
            }
            EntryDecision::Duplicate {
                last_entry_at,
                remaining,
            } => {
                response.message = "This QR Code is already SCANNED".to_string();
                response.last_entry_at = Some(last_entry_at.to_iso8601());
                response.remaining_cooldown_secs = Some(remaining.num_seconds().max(0));
                StatusCode::BAD_REQUEST
            }
            EntryDecision::NotApproved { status } => {
                response.message = format!("Student is not approved yet (status {status})");
                StatusCode::BAD_REQUEST
            }
            EntryDecision::NotFound { .. } => {
                response.message = "Student not found with this QR code".to_string();
                StatusCode::NOT_FOUND
            }
        };
        (status, response)
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/entry/validate", post(validate_entry))
}

/// POST /v1/entry/validate: Admit or refuse the holder of a scanned ticket.
#[utoipa::path(
    post,
    path = "/v1/entry/validate",
    request_body = ValidateEntryRequest,
    responses(
        (status = 200, description = "Entry accepted", body = EntryResponse),
        (status = 400, description = "Duplicate scan, not approved, or empty payload", body = EntryResponse),
        (status = 404, description = "No registration for this code", body = EntryResponse),
        (status = 429, description = "Scanner rate limit exceeded", body = crate::error::ErrorBody),
    ),
    tag = "entry"
)]
pub(crate) async fn validate_entry(
    State(state): State<AppState>,
    metrics: Option<Extension<ApiMetrics>>,
    body: Result<Json<ValidateEntryRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<EntryResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let outcome = lifecycle::validate_entry(&state, &req.payload).await?;
    if let Some(Extension(metrics)) = metrics {
        metrics.record_entry(&outcome.decision);
    }
    let (status, response) = EntryResponse::from_outcome(req.payload.trim().to_string(), &outcome);
    Ok((status, Json(response)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use fest_core::Timestamp;
    use fest_state::ApprovalStatus;

    fn outcome(decision: EntryDecision) -> EntryOutcome {
        EntryOutcome {
            decision,
            registration: None,
        }
    }

    #[test]
    fn duplicate_maps_to_400_with_remaining() {
        let last = Timestamp::parse("2025-03-14T09:00:00Z").unwrap();
        let (status, body) = EntryResponse::from_outcome(
            "CS101".into(),
            &outcome(EntryDecision::Duplicate {
                last_entry_at: last,
                remaining: Duration::hours(11) + Duration::minutes(59),
            }),
        );
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.accepted);
        assert_eq!(body.outcome, "duplicate");
        assert_eq!(body.remaining_cooldown_secs, Some(43_140));
        assert_eq!(body.last_entry_at.as_deref(), Some(last.to_iso8601().as_str()));
    }

    #[test]
    fn refusals_map_to_client_errors() {
        let (status, body) = EntryResponse::from_outcome(
            "CS101".into(),
            &outcome(EntryDecision::NotApproved {
                status: ApprovalStatus::Pending,
            }),
        );
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.outcome, "not_approved");

        let (status, body) = EntryResponse::from_outcome(
            "ZZ9".into(),
            &outcome(EntryDecision::NotFound { code: "ZZ9".into() }),
        );
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.outcome, "not_found");
        assert!(body.registration.is_none());
    }

    #[test]
    fn accepted_is_200() {
        let now = Timestamp::now();
        let (status, body) = EntryResponse::from_outcome(
            "CS101".into(),
            &outcome(EntryDecision::Accepted {
                entered_at: now,
                first_entry: true,
            }),
        );
        assert_eq!(status, StatusCode::OK);
        assert!(body.accepted);
        assert_eq!(body.message, "QR Code verified successfully");
        assert!(body.remaining_cooldown_secs.is_none());
    }
}
