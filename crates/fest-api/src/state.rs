//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers via
//! the `State` extractor. Collaborators sit behind trait objects so tests
//! can swap in a manual clock or a recording notifier.

use std::sync::Arc;
use std::time::Duration;

use zeroize::Zeroizing;

use fest_core::{Clock, SystemClock};
use fest_state::CooldownPolicy;

use crate::middleware::rate_limit::RateLimitConfig;
use crate::notify::{LogNotifier, Notifier};
use crate::store::{MemoryRepository, RegistrationRepository};

/// Default event name used in notification copy.
pub const DEFAULT_EVENT_NAME: &str = "Dream Fest 2K25";

/// Application configuration.
///
/// Custom `Debug` redacts the signing secret and admin password.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// HMAC secret for admin session tokens.
    pub jwt_secret: Zeroizing<String>,
    /// Admin email used when provisioning the admin record.
    pub admin_email: String,
    /// Admin password used when provisioning the admin record.
    pub admin_password: Zeroizing<String>,
    /// Event name shown in notifications.
    pub event_name: String,
    /// Re-entry cooldown.
    pub cooldown: CooldownPolicy,
    /// Admin session lifetime.
    pub session_ttl: chrono::Duration,
    /// Upper bound on a single notification dispatch.
    pub notify_timeout: Duration,
    /// Limits for the public scanning endpoint.
    pub rate_limit: RateLimitConfig,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("jwt_secret", &"[REDACTED]")
            .field("admin_email", &self.admin_email)
            .field("admin_password", &"[REDACTED]")
            .field("event_name", &self.event_name)
            .field("cooldown", &self.cooldown)
            .field("session_ttl", &self.session_ttl)
            .field("notify_timeout", &self.notify_timeout)
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            jwt_secret: Zeroizing::new("insecure-development-secret".to_string()),
            admin_email: "admin@fest.local".to_string(),
            admin_password: Zeroizing::new("admin".to_string()),
            event_name: DEFAULT_EVENT_NAME.to_string(),
            cooldown: CooldownPolicy::default(),
            session_ttl: chrono::Duration::hours(2),
            notify_timeout: Duration::from_secs(10),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Shared application state. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repo: Arc<dyn RegistrationRepository>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// In-memory store, log-only notifier, system clock, default config.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
            repo: Arc::new(MemoryRepository::new()),
            notifier: Arc::new(LogNotifier),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_repository(mut self, repo: Arc<dyn RegistrationRepository>) -> Self {
        self.repo = repo;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_debug_redacts_secrets() {
        let mut config = AppConfig::default();
        config.jwt_secret = Zeroizing::new("super-signing-key".into());
        config.admin_password = Zeroizing::new("hunter22".into());
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-signing-key"));
        assert!(!rendered.contains("hunter22"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn default_session_is_two_hours() {
        assert_eq!(AppConfig::default().session_ttl, chrono::Duration::hours(2));
    }
}
