//! Mail relay client error types.

/// Errors from mail relay calls.
#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    /// HTTP transport error, after retries.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Relay returned a non-2xx status.
    #[error("mail relay {endpoint} returned {status}: {body}")]
    Relay {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),
}
