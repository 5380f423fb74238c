//! # Admin Authentication
//!
//! There is exactly one administrator. Its record (normalized email plus an
//! argon2 PHC hash with embedded salt) is provisioned at startup from
//! configuration if absent, and is authoritative afterwards: changing
//! `ADMIN_PASSWORD` does not overwrite an existing record.
//!
//! ## Sessions
//!
//! Login yields an HS256 JWT whose `sub` is the admin email. Expiry is
//! checked against the application [`Clock`](fest_core::Clock) with zero
//! leeway, so a token is rejected from the second `exp` is reached.
//!
//! ```text
//! missing header / non-Bearer / bad signature / expired  → 401
//! valid token, subject is not the provisioned admin      → 403
//! ```

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::{Request, State};
use axum::http::header;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use thiserror::Error;
use zeroize::Zeroizing;

use fest_core::{EmailAddress, Timestamp};

use crate::error::AppError;
use crate::state::AppState;
use crate::store::AdminRecord;

/// Message returned for every login failure.
const LOGIN_FAILED: &str = "invalid email or password";

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("invalid session token: {0}")]
    Token(String),

    #[error("session expired")]
    Expired,
}

// ── Passwords ───────────────────────────────────────────────────────

/// Hash a password into a PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

/// Check a password against a PHC string. Malformed hashes never verify.
pub fn verify_password(password: &str, phc: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(phc) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        let _ = b.ct_eq(b);
        return false;
    }
    a.ct_eq(b).into()
}

// ── Session tokens ──────────────────────────────────────────────────

/// JWT claims of an admin session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// A freshly issued session.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: Timestamp,
}

pub fn issue_session(
    secret: &str,
    subject: &EmailAddress,
    now: Timestamp,
    ttl: chrono::Duration,
) -> Result<IssuedSession, AuthError> {
    let expires_at = now
        .checked_add(ttl)
        .ok_or_else(|| AuthError::Token("session expiry out of range".into()))?;
    let claims = SessionClaims {
        sub: subject.as_str().to_string(),
        iat: now.epoch_secs(),
        exp: expires_at.epoch_secs(),
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::Token(e.to_string()))?;
    Ok(IssuedSession { token, expires_at })
}

/// Verify signature and expiry of a session token.
pub fn verify_session(secret: &str, token: &str, now: Timestamp) -> Result<SessionClaims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    // Expiry is checked below against the application clock.
    validation.validate_exp = false;
    validation.set_required_spec_claims(&["exp", "sub"]);

    let data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| AuthError::Token(e.to_string()))?;

    if now.epoch_secs() >= data.claims.exp {
        return Err(AuthError::Expired);
    }
    Ok(data.claims)
}

// ── Admin record ────────────────────────────────────────────────────

/// Create the admin record from configuration unless one exists.
pub async fn provision_admin(state: &AppState) -> Result<bool, AppError> {
    if state.repo.admin().await?.is_some() {
        tracing::info!("admin record exists; provisioning skipped");
        return Ok(false);
    }
    let email = EmailAddress::new(&state.config.admin_email)?;
    let password = state.config.admin_password.clone();
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(format!("password hashing task failed: {e}")))?
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let created = state
        .repo
        .provision_admin(AdminRecord {
            email: email.clone(),
            password_hash,
            created_at: state.clock.now(),
        })
        .await?;
    if created {
        tracing::info!(admin = %email, "admin record provisioned");
    }
    Ok(created)
}

/// Check a login attempt and issue a session.
pub async fn authenticate(
    state: &AppState,
    email: &str,
    password: &str,
) -> Result<IssuedSession, AppError> {
    let Some(admin) = state.repo.admin().await? else {
        tracing::warn!("login attempted before an admin record was provisioned");
        return Err(AppError::Unauthorized(LOGIN_FAILED.into()));
    };

    let email_ok = EmailAddress::new(email)
        .map(|e| constant_time_eq(e.as_str(), admin.email.as_str()))
        .unwrap_or(false);
    // Verify even on email mismatch so both failures cost the same.
    let attempt = Zeroizing::new(password.to_string());
    let phc = admin.password_hash.clone();
    let password_ok = tokio::task::spawn_blocking(move || verify_password(&attempt, &phc))
        .await
        .map_err(|e| AppError::Internal(format!("password check task failed: {e}")))?;

    if !(email_ok && password_ok) {
        tracing::warn!("admin login failed");
        return Err(AppError::Unauthorized(LOGIN_FAILED.into()));
    }

    let session = issue_session(
        &state.config.jwt_secret,
        &admin.email,
        state.clock.now(),
        state.config.session_ttl,
    )
    .map_err(|e| AppError::Internal(e.to_string()))?;
    tracing::info!(admin = %admin.email, expires_at = %session.expires_at, "admin session issued");
    Ok(session)
}

// ── AdminIdentity ───────────────────────────────────────────────────

/// The authenticated administrator, injected by [`admin_auth_middleware`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminIdentity {
    pub email: EmailAddress,
}

#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for AdminIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AdminIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no admin identity in request context".into()))
    }
}

// ── Middleware ──────────────────────────────────────────────────────

/// Require a valid admin session on every request it wraps.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let token = match auth_header {
        Some(value) => match value.strip_prefix("Bearer ") {
            Some(token) => token.trim().to_string(),
            None => {
                tracing::warn!("authentication failed: non-Bearer authorization scheme");
                return AppError::Unauthorized("authorization header must use Bearer scheme".into())
                    .into_response();
            }
        },
        None => {
            tracing::warn!("authentication failed: missing authorization header");
            return AppError::Unauthorized("missing authorization header".into()).into_response();
        }
    };

    let claims = match verify_session(&state.config.jwt_secret, &token, state.clock.now()) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::warn!(reason = %e, "authentication failed");
            return AppError::Unauthorized("invalid or expired session".into()).into_response();
        }
    };

    let admin = match state.repo.admin().await {
        Ok(Some(admin)) => admin,
        Ok(None) => {
            return AppError::Forbidden("no administrator is provisioned".into()).into_response();
        }
        Err(e) => return AppError::from(e).into_response(),
    };

    if !constant_time_eq(&claims.sub, admin.email.as_str()) {
        tracing::warn!(subject = %claims.sub, "session subject is not the administrator");
        return AppError::Forbidden("session does not belong to the administrator".into())
            .into_response();
    }

    request.extensions_mut().insert(AdminIdentity { email: admin.email });
    next.run(request).await
}
