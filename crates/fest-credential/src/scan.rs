//! Scanner output decoding.

use fest_core::RollNumber;

use crate::error::EncodingError;

/// What a gate scanner read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScannedCode {
    /// A well-formed roll number, ready for lookup.
    Roll(RollNumber),
    /// Text no registration can carry (over-long, control characters).
    Unrecognized(String),
}

impl ScannedCode {
    /// The trimmed scanner text.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Roll(roll) => roll.as_str(),
            Self::Unrecognized(text) => text,
        }
    }
}

/// Classify raw scanner output.
///
/// Handheld scanners commonly append a newline; surrounding whitespace is
/// dropped. Only an empty payload is an error: any other text is either a
/// roll number or a code that matches nobody.
pub fn decode_scan(raw: &str) -> Result<ScannedCode, EncodingError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EncodingError::EmptyPayload);
    }
    Ok(match RollNumber::new(trimmed) {
        Ok(roll) => ScannedCode::Roll(roll),
        Err(_) => ScannedCode::Unrecognized(trimmed.to_string()),
    })
}
