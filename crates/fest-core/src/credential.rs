//! # Credential Payload
//!
//! The scannable ticket a student receives once approved. The content is
//! produced by `fest-credential` (a QR image data URL); this crate only
//! guarantees it is non-empty and offers a short fingerprint for logs, so
//! that multi-kilobyte image payloads never end up in log lines.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ValidationError;

/// Encoded credential payload. Never empty.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Credential(String);

impl Credential {
    /// Wrap an encoded payload.
    pub fn new(payload: impl Into<String>) -> Result<Self, ValidationError> {
        let payload = payload.into();
        if payload.trim().is_empty() {
            return Err(ValidationError::EmptyCredential);
        }
        Ok(Self(payload))
    }

    /// The encoded payload.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters of the SHA-256 of the payload.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        digest.iter().take(6).map(|b| format!("{b:02x}")).collect()
    }
}

impl TryFrom<String> for Credential {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Credential> for String {
    fn from(value: Credential) -> Self {
        value.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Credential").field(&self.fingerprint()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_payload_rejected() {
        assert_eq!(Credential::new(""), Err(ValidationError::EmptyCredential));
        assert_eq!(Credential::new("  "), Err(ValidationError::EmptyCredential));
    }

    #[test]
    fn fingerprint_is_stable_and_short() {
        let c = Credential::new("data:image/png;base64,AAAA").unwrap();
        assert_eq!(c.fingerprint().len(), 12);
        assert_eq!(c.fingerprint(), c.clone().fingerprint());
    }

    #[test]
    fn debug_does_not_print_payload() {
        let c = Credential::new("data:image/png;base64,SECRETPAYLOAD").unwrap();
        assert!(!format!("{c:?}").contains("SECRETPAYLOAD"));
    }
}
