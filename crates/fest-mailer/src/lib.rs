//! # fest-mailer: Mail Relay Client
//!
//! Typed client for the HTTP mail relay that delivers approval and
//! rejection notices. The ticketing service never speaks SMTP itself; it
//! hands a fully rendered [`OutboundEmail`] to the relay and gets back a
//! `Result`.
//!
//! ## Delivery Semantics
//!
//! - Transport failures are retried three times with backoff, then
//!   surfaced. There is no unbounded retry.
//! - Any HTTP answer from the relay is final. Non-2xx maps to
//!   [`MailerError::Relay`].

pub mod config;
pub mod error;
pub(crate) mod retry;
pub mod templates;

pub use config::{ConfigError, MailerConfig};
pub use error::MailerError;
pub use templates::{approval_email, rejection_email, Attachment, OutboundEmail};

use std::time::Duration;

use serde::Deserialize;

/// Relay acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SentMessage {
    /// Relay-assigned message id, if the relay reports one.
    #[serde(default)]
    pub id: Option<String>,
}

/// Client for the mail relay.
#[derive(Debug, Clone)]
pub struct MailerClient {
    http: reqwest::Client,
    base_url: url::Url,
    from: String,
}

impl MailerClient {
    /// Create a client from configuration.
    pub fn new(config: MailerConfig) -> Result<Self, MailerError> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = &config.api_token {
            let value = reqwest::header::HeaderValue::from_str(&format!("Bearer {}", token.as_str()))
                .map_err(|_| MailerError::Config(ConfigError::InvalidToken))?;
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| MailerError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        Ok(Self {
            http,
            base_url: config.relay_url,
            from: config.from,
        })
    }

    /// Sender address used for outgoing messages.
    pub fn from_address(&self) -> &str {
        &self.from
    }

    /// Hand a message to the relay.
    ///
    /// Calls `POST {relay}/v1/messages`.
    pub async fn send(&self, message: &OutboundEmail) -> Result<SentMessage, MailerError> {
        let endpoint = "POST /v1/messages";
        let url = format!("{}/v1/messages", self.base_url.as_str().trim_end_matches('/'));

        let resp = retry::retry_send(|| self.http.post(&url).json(message).send())
            .await
            .map_err(|e| MailerError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(MailerError::Relay {
                endpoint: endpoint.into(),
                status,
                body,
            });
        }

        let sent: SentMessage = resp.json().await.map_err(|e| MailerError::Deserialization {
            endpoint: endpoint.into(),
            source: e,
        })?;
        tracing::debug!(to = %message.to, message_id = ?sent.id, "mail relay accepted message");
        Ok(sent)
    }
}
