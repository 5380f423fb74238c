//! # OpenAPI Specification Assembly
//!
//! Collects the utoipa-documented routes into one spec, served at
//! `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Fest Ticketing API",
        version = "0.1.0",
        description = "Self-service registration, admin review with QR ticket issuance, and venue entry validation.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        crate::routes::registrations::register,
        crate::routes::admin::login,
        crate::routes::admin::list_registrations,
        crate::routes::admin::get_registration,
        crate::routes::admin::approve_registration,
        crate::routes::admin::reject_registration,
        crate::routes::entry::validate_entry,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::registrations::RegisterRequest,
        crate::routes::registrations::RegistrationView,
        crate::routes::admin::LoginRequest,
        crate::routes::admin::LoginResponse,
        crate::routes::admin::ReviewResponse,
        crate::routes::entry::ValidateEntryRequest,
        crate::routes::entry::EntryResponse,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "registrations", description = "Student self-service registration"),
        (name = "admin", description = "Admin login and review console"),
        (name = "entry", description = "Gate scanning"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` scheme referenced by the admin routes.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
