//! # fest-credential: Ticket Credential Generator
//!
//! Turns a roll number into the scannable ticket an approved student
//! receives, and turns scanner output back into a roll number at the gate.
//!
//! The credential is a QR symbol rendered to PNG and carried as a
//! `data:image/png;base64,...` URL. It embeds the roll number verbatim, so
//! validation is a lookup rather than a signature check. Callers must not
//! persist anything when [`generate`] fails.
//!
//! ## Crate Policy
//!
//! - Depends only on `fest-core` internally.
//! - No I/O; rendering happens in memory.

pub mod error;
pub mod qr;
pub mod scan;

pub use error::EncodingError;
pub use qr::{base64_body, generate, generate_text, DATA_URL_PREFIX};
pub use scan::{decode_scan, ScannedCode};
