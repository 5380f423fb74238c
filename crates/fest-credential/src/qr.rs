//! # QR Rendering
//!
//! Renders an identifier as a QR symbol (error-correction level M) into a
//! PNG and wraps it as a `data:image/png;base64,` URL. The symbol carries the
//! identifier verbatim, so a scanner reads back exactly the roll number.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};

use fest_core::{Credential, RollNumber};

use crate::error::EncodingError;

/// Prefix of every generated credential.
pub const DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Minimum rendered edge in pixels, quiet zone included.
const MIN_EDGE_PX: u32 = 200;

/// Encode a roll number as a credential.
pub fn generate(roll_number: &RollNumber) -> Result<Credential, EncodingError> {
    generate_text(roll_number.as_str())
}

/// Encode arbitrary identifier text as a credential.
///
/// The same input always yields the same image.
pub fn generate_text(text: &str) -> Result<Credential, EncodingError> {
    if text.is_empty() {
        return Err(EncodingError::EmptyIdentifier);
    }
    let png = render_png(text)?;
    let url = format!("{DATA_URL_PREFIX}{}", STANDARD.encode(png));
    // Non-empty by construction.
    Credential::new(url).map_err(|_| EncodingError::EmptyIdentifier)
}

/// The base64 body of a generated credential without the data URL prefix.
pub fn base64_body(credential: &Credential) -> Result<&str, EncodingError> {
    credential
        .as_str()
        .strip_prefix(DATA_URL_PREFIX)
        .ok_or_else(|| EncodingError::MalformedDataUrl("missing PNG data URL prefix".into()))
}

/// Decode the PNG bytes from a generated credential.
#[cfg(test)]
pub(crate) fn png_bytes(credential: &Credential) -> Result<Vec<u8>, EncodingError> {
    STANDARD
        .decode(base64_body(credential)?)
        .map_err(|e| EncodingError::MalformedDataUrl(e.to_string()))
}

fn render_png(text: &str) -> Result<Vec<u8>, EncodingError> {
    let code = QrCode::with_error_correction_level(text.as_bytes(), EcLevel::M)?;
    let image = code
        .render::<Luma<u8>>()
        .min_dimensions(MIN_EDGE_PX, MIN_EDGE_PX)
        .build();
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}
