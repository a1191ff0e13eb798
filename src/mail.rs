/// RFC 822 intake: turn raw message bytes into [`RawMessage`] records
use mail_parser::{HeaderName, Message, MessageParser, MessagePart, MimeHeaders, PartType};

use crate::error::{Error, Result};
use crate::message::{Attachment, RawMessage};

/// Parse one raw email.
///
/// The body is the last HTML part that is not an attachment, else the last
/// plain-text part. `Date` and `Message-ID` are kept as the sender wrote them;
/// `fallback_id` stands in for a missing `Message-ID`.
pub fn parse_raw_message(raw: &[u8], fallback_id: &str) -> Result<RawMessage> {
    let message = MessageParser::default()
        .parse(raw)
        .ok_or_else(|| Error::MailParse(format!("{fallback_id}: not an RFC 822 message")))?;

    let mut html = String::new();
    let mut text_plain = String::new();
    let mut attachments = Vec::new();

    for part in &message.parts {
        if let Some(filename) = part.attachment_name() {
            attachments.push(Attachment {
                filename: filename.to_string(),
                content_type: content_type(part),
                content: part.contents().to_vec(),
            });
            continue;
        }
        match &part.body {
            PartType::Html(body) => html = body.to_string(),
            PartType::Text(body) => text_plain = body.to_string(),
            _ => {}
        }
    }

    Ok(RawMessage {
        html: if html.is_empty() { text_plain } else { html },
        subject: message.subject().unwrap_or_default().to_string(),
        date: raw_header(&message, HeaderName::Date)
            .or_else(|| message.date().map(|d| d.to_rfc822()))
            .unwrap_or_default(),
        from_address: format_sender(&message),
        message_id: raw_header(&message, HeaderName::MessageId)
            .unwrap_or_else(|| fallback_id.to_string()),
        attachments,
    })
}

/// Whether the From header contains one of the allowed addresses
pub fn sender_allowed(from: &str, allowed: &[String]) -> bool {
    let from = from.to_lowercase();
    allowed
        .iter()
        .any(|addr| from.contains(&addr.to_lowercase()))
}

/// Unfolded header text, or None when absent or blank
fn raw_header<'x>(message: &Message<'x>, name: HeaderName<'x>) -> Option<String> {
    let value = message.header_raw(name)?.replace("\r\n", "").replace('\n', "");
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn format_sender(message: &Message) -> String {
    let Some(addr) = message.from().and_then(|from| from.first()) else {
        return String::new();
    };
    match (addr.name(), addr.address()) {
        (Some(name), Some(address)) => format!("{} <{}>", name, address),
        (None, Some(address)) => address.to_string(),
        (Some(name), None) => name.to_string(),
        (None, None) => String::new(),
    }
}

fn content_type(part: &MessagePart) -> String {
    match part.content_type() {
        Some(ct) => match ct.subtype() {
            Some(subtype) => format!("{}/{}", ct.ctype(), subtype),
            None => ct.ctype().to_string(),
        },
        None => "application/octet-stream".to_string(),
    }
}
