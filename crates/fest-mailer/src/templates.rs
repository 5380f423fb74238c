//! # Notification Templates
//!
//! The two messages a student can receive: the ticket (with the QR code
//! attached inline and referenced from the HTML body as `cid:qrcode`) and
//! the rejection notice. Interpolated values are HTML-escaped in the HTML
//! body.

use serde::{Deserialize, Serialize};

/// Content id the approval HTML references.
pub const QR_CONTENT_ID: &str = "qrcode";

/// Subject line of the approval message.
pub const APPROVAL_SUBJECT: &str = "Your Ticket is Successfully Created!";

/// Subject line of the rejection message.
pub const REJECTION_SUBJECT: &str = "Your Ticket Application is Rejected";

/// A message as accepted by the relay's `POST /v1/messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

/// Inline or regular attachment, base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub content_base64: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
}

/// Ticket message carrying the QR code.
///
/// `qr_png_base64` is the PNG body without any data URL prefix.
pub fn approval_email(
    from: &str,
    to: &str,
    student_name: &str,
    event_name: &str,
    qr_png_base64: &str,
) -> OutboundEmail {
    let text = format!(
        "Hello {student_name},\n\nYour ticket for \"{event_name}\" has been successfully created. \
         Please present the QR code below at the entry point.\n\nThank you!"
    );
    let html = format!(
        "<p>Hello <strong>{name}</strong>,</p>\n\
         <p>Your ticket for <strong>{event}</strong> has been successfully created!</p>\n\
         <p>Please show the QR code below at the entry point for verification.</p>\n\
         <img src=\"cid:{QR_CONTENT_ID}\" alt=\"QR Code\" />\n\
         <p>Thank you!</p>",
        name = escape_html(student_name),
        event = escape_html(event_name),
    );
    OutboundEmail {
        from: from.to_string(),
        to: to.to_string(),
        subject: APPROVAL_SUBJECT.to_string(),
        text,
        html,
        attachments: vec![Attachment {
            filename: "qrcode.png".to_string(),
            content_type: "image/png".to_string(),
            content_base64: qr_png_base64.to_string(),
            content_id: Some(QR_CONTENT_ID.to_string()),
        }],
    }
}

/// Rejection notice. No attachment.
pub fn rejection_email(from: &str, to: &str, student_name: &str, event_name: &str) -> OutboundEmail {
    let text = format!(
        "Hello {student_name},\n\nUnfortunately, your details do not match the college database. \
         As a result, your ticket application for \"{event_name}\" has been rejected.\n\n\
         Thank you for your understanding."
    );
    let html = format!(
        "<p>Hello <strong>{name}</strong>,</p>\n\
         <p>Unfortunately, your details do not match the college database. As a result, your \
         ticket application for <strong>{event}</strong> has been rejected.</p>\n\
         <p>Thank you for your understanding.</p>",
        name = escape_html(student_name),
        event = escape_html(event_name),
    );
    OutboundEmail {
        from: from.to_string(),
        to: to.to_string(),
        subject: REJECTION_SUBJECT.to_string(),
        text,
        html,
        attachments: Vec::new(),
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approval_references_inline_qr() {
        let mail = approval_email("t@fest.in", "asha@college.edu", "Asha", "DreamFest", "iVBOR");
        assert_eq!(mail.subject, APPROVAL_SUBJECT);
        assert!(mail.html.contains("cid:qrcode"));
        assert!(mail.text.contains("\"DreamFest\""));
        assert_eq!(mail.attachments.len(), 1);
        assert_eq!(mail.attachments[0].content_id.as_deref(), Some("qrcode"));
        assert_eq!(mail.attachments[0].content_base64, "iVBOR");
    }

    #[test]
    fn rejection_has_no_attachment() {
        let mail = rejection_email("t@fest.in", "asha@college.edu", "Asha", "DreamFest");
        assert_eq!(mail.subject, REJECTION_SUBJECT);
        assert!(mail.attachments.is_empty());
        assert!(mail.text.contains("do not match the college database"));
        let json = serde_json::to_value(&mail).unwrap();
        assert!(json.get("attachments").is_none());
    }

    #[test]
    fn html_is_escaped() {
        let mail = rejection_email("t@fest.in", "x@y.in", "<script>", "A & B");
        assert!(mail.html.contains("&lt;script&gt;"));
        assert!(mail.html.contains("A &amp; B"));
        assert!(mail.text.contains("<script>"));
    }
}
