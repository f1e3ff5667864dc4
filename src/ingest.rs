//! RFC 822 ingestion adapter shared by mail feed implementations.
//!
//! Parses a raw message into an [`InboundMail`]. Attachment bytes come
//! back inline; callers store them wherever they like and insert the
//! resulting records through the store.

use chrono::{DateTime, Utc};
use mail_parser::{MessageParser, MimeHeaders};

use crate::error::{Error, Result};

/// A parsed inbound mail, not yet persisted.
#[derive(Debug, Clone)]
pub struct InboundMail {
    pub subject: String,
    pub from_name: String,
    pub from_email: String,
    pub date: DateTime<Utc>,
    pub text: String,
    pub html: String,
    pub attachments: Vec<InboundAttachment>,
}

/// Attachment metadata plus its decoded bytes.
#[derive(Debug, Clone)]
pub struct InboundAttachment {
    pub filename: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Parse a raw RFC 822 message.
///
/// Missing headers degrade to empty fields; a missing date falls back
/// to the receive time. Only input that yields no message at all is an
/// error.
pub fn parse_inbound(raw: &[u8]) -> Result<InboundMail> {
    let Some(parsed) = MessageParser::default().parse(raw) else {
        return Err(Error::Validation("not a parsable mail message".into()));
    };

    let (from_name, from_email) = sender_identity(&parsed);
    let date = parsed
        .date()
        .and_then(|d| DateTime::from_timestamp(d.to_timestamp(), 0))
        .unwrap_or_else(Utc::now);

    let attachments = parsed
        .attachments()
        .map(|part| InboundAttachment {
            filename: part.attachment_name().unwrap_or("attachment").to_string(),
            mime_type: mime_type(part),
            data: part.contents().to_vec(),
        })
        .collect();

    Ok(InboundMail {
        subject: parsed.subject().unwrap_or_default().to_string(),
        from_name,
        from_email,
        date,
        text: parsed
            .body_text(0)
            .map(|s| s.to_string())
            .unwrap_or_default(),
        html: parsed
            .body_html(0)
            .map(|s| s.to_string())
            .unwrap_or_default(),
        attachments,
    })
}

fn sender_identity(parsed: &mail_parser::Message) -> (String, String) {
    let from = parsed.from().and_then(|addr| addr.first());
    let name = from
        .and_then(|a| a.name())
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    let email = from
        .and_then(|a| a.address())
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    (name, email)
}

fn mime_type(part: &mail_parser::MessagePart) -> String {
    match part.content_type() {
        Some(ct) => match ct.subtype() {
            Some(sub) => format!("{}/{}", ct.ctype(), sub),
            None => ct.ctype().to_string(),
        },
        None => "application/octet-stream".to_string(),
    }
}
