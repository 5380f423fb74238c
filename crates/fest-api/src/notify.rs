//! # Notification Dispatcher
//!
//! Tells a student the outcome of their review. Delivery is an external
//! collaborator behind [`Notifier`]; the lifecycle controller only sees a
//! `Result`. Dispatch happens after the status change is committed and
//! never while a record is locked. A failed or slow dispatch is logged and
//! reported as `notification_sent: false`; it never undoes the decision.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;

use fest_core::{Credential, EmailAddress};
use fest_mailer::{approval_email, rejection_email, MailerClient};

/// What the student is being told.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationKind {
    /// Ticket issued; carries the credential to attach.
    Approval { credential: Credential },
    /// Application rejected.
    Rejection,
}

/// One message to one student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient: EmailAddress,
    pub student_name: String,
    pub event_name: String,
    pub kind: NotificationKind,
}

impl Notification {
    pub fn is_approval(&self) -> bool {
        matches!(self.kind, NotificationKind::Approval { .. })
    }
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("credential could not be attached: {0}")]
    Attachment(String),

    #[error("dispatch timed out after {0:?}")]
    Timeout(Duration),
}

/// Delivery channel for review outcomes.
#[async_trait]
pub trait Notifier: Send + Sync + std::fmt::Debug {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Dispatch with a deadline. Returns whether delivery succeeded.
pub async fn dispatch(notifier: &dyn Notifier, notification: &Notification, timeout: Duration) -> bool {
    let result = match tokio::time::timeout(timeout, notifier.notify(notification)).await {
        Ok(result) => result,
        Err(_) => Err(NotifyError::Timeout(timeout)),
    };
    match result {
        Ok(()) => {
            tracing::info!(
                recipient = %notification.recipient,
                approval = notification.is_approval(),
                "notification sent"
            );
            true
        }
        Err(e) => {
            tracing::warn!(
                recipient = %notification.recipient,
                approval = notification.is_approval(),
                error = %e,
                "notification failed; review decision stands"
            );
            false
        }
    }
}

// ── Mail relay ──────────────────────────────────────────────────────

/// Delivers through the HTTP mail relay.
#[derive(Debug, Clone)]
pub struct MailRelayNotifier {
    client: MailerClient,
}

impl MailRelayNotifier {
    pub fn new(client: MailerClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Notifier for MailRelayNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let from = self.client.from_address();
        let to = notification.recipient.as_str();
        let message = match &notification.kind {
            NotificationKind::Approval { credential } => {
                let png = fest_credential::base64_body(credential)
                    .map_err(|e| NotifyError::Attachment(e.to_string()))?;
                approval_email(
                    from,
                    to,
                    &notification.student_name,
                    &notification.event_name,
                    png,
                )
            }
            NotificationKind::Rejection => rejection_email(
                from,
                to,
                &notification.student_name,
                &notification.event_name,
            ),
        };
        self.client
            .send(&message)
            .await
            .map(|_| ())
            .map_err(|e| NotifyError::Delivery(e.to_string()))
    }
}

// ── Log only ────────────────────────────────────────────────────────

/// Used when no relay is configured. Logs and reports success.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            recipient = %notification.recipient,
            approval = notification.is_approval(),
            "mail relay not configured; notification logged only"
        );
        Ok(())
    }
}

// ── Recording ───────────────────────────────────────────────────────

/// Keeps every notification in memory. Can be told to fail.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
    failing: Arc<Mutex<bool>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent deliveries fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    /// Notifications delivered so far.
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        if *self.failing.lock() {
            return Err(NotifyError::Delivery("recording notifier set to fail".into()));
        }
        self.sent.lock().push(notification.clone());
        Ok(())
    }
}
