//! # Credential Encoding Errors

use thiserror::Error;

/// Errors from credential generation and scan decoding.
#[derive(Error, Debug)]
pub enum EncodingError {
    /// The identifier to encode was empty.
    #[error("cannot encode an empty identifier")]
    EmptyIdentifier,

    /// The scanner produced no data.
    #[error("scanned payload is empty")]
    EmptyPayload,

    /// QR symbol construction failed (e.g. data too long).
    #[error("QR encoding failed: {0}")]
    Qr(#[from] qrcode::types::QrError),

    /// PNG rendering failed.
    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    /// A stored credential is not a PNG data URL.
    #[error("malformed credential data URL: {0}")]
    MalformedDataUrl(String),
}
