//! Mail relay client configuration.
//!
//! The relay is any HTTP service accepting `POST /v1/messages`. Override
//! via environment variables or explicit construction for tests.

use url::Url;
use zeroize::Zeroizing;

/// Default sender when `MAIL_FROM` is unset.
pub const DEFAULT_FROM: &str = "tickets@localhost";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Configuration for connecting to the mail relay.
///
/// Custom `Debug` implementation redacts the `api_token` field
/// to prevent credential leakage in log output.
#[derive(Clone)]
pub struct MailerConfig {
    /// Base URL of the relay.
    pub relay_url: Url,
    /// Optional bearer token sent on every request.
    pub api_token: Option<Zeroizing<String>>,
    /// Sender address placed in the `from` field.
    pub from: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for MailerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailerConfig")
            .field("relay_url", &self.relay_url)
            .field(
                "api_token",
                &self.api_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("from", &self.from)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl MailerConfig {
    /// Configuration for a relay at `relay_url` with defaults elsewhere.
    pub fn new(relay_url: Url) -> Self {
        Self {
            relay_url,
            api_token: None,
            from: DEFAULT_FROM.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `MAIL_RELAY_URL` (required)
    /// - `MAIL_RELAY_TOKEN` (optional)
    /// - `MAIL_FROM` (default: `tickets@localhost`)
    /// - `MAIL_TIMEOUT_SECS` (default: 10)
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = std::env::var("MAIL_RELAY_URL").map_err(|_| ConfigError::MissingRelayUrl)?;
        let relay_url = Url::parse(&raw)
            .map_err(|e| ConfigError::InvalidUrl("MAIL_RELAY_URL".to_string(), e.to_string()))?;

        Ok(Self {
            relay_url,
            api_token: std::env::var("MAIL_RELAY_TOKEN")
                .ok()
                .filter(|t| !t.is_empty())
                .map(Zeroizing::new),
            from: std::env::var("MAIL_FROM").unwrap_or_else(|_| DEFAULT_FROM.to_string()),
            timeout_secs: std::env::var("MAIL_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("MAIL_RELAY_URL environment variable is required")]
    MissingRelayUrl,
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("relay token contains characters not allowed in a header")]
    InvalidToken,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_token() {
        let mut config = MailerConfig::new("http://127.0.0.1:9".parse().unwrap());
        config.api_token = Some(Zeroizing::new("relay-secret".to_string()));
        let rendered = format!("{config:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("relay-secret"));
    }

    #[test]
    fn defaults() {
        let config = MailerConfig::new("http://127.0.0.1:9".parse().unwrap());
        assert_eq!(config.from, DEFAULT_FROM);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(config.api_token.is_none());
    }
}
