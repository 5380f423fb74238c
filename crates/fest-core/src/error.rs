//! # Error Types
//!
//! All errors use `thiserror` for derive-based `Display` and `Error`
//! implementations. Validation errors name the offending field so the API
//! layer can return them to the client verbatim.

use thiserror::Error;

/// Top-level error type for the foundational crate.
#[derive(Error, Debug)]
pub enum FestError {
    /// Input failed validation.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A timestamp string could not be parsed.
    #[error("invalid timestamp: {0}")]
    Timestamp(String),
}

/// Field-level validation failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was absent or blank.
    #[error("{field} is required")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },

    /// A field exceeded its length limit.
    #[error("{field} must not exceed {max} characters")]
    TooLong {
        /// Name of the field.
        field: &'static str,
        /// Maximum permitted length.
        max: usize,
    },

    /// Roll number contained characters that cannot be scanned back verbatim.
    #[error("invalid roll number: {0}")]
    InvalidRollNumber(String),

    /// Email address is not well-formed.
    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    /// Phone number contains something other than digits and separators.
    #[error("invalid phone number: {0}")]
    InvalidPhone(String),

    /// Credential payload was empty.
    #[error("credential payload must not be empty")]
    EmptyCredential,
}
