/// Republish inbound email notifications as Slack messages
pub mod blocks;
pub mod config;
pub mod converter;
pub mod deliver;
pub mod error;
pub mod fetch;
pub mod mail;
pub mod message;
pub mod routing;
pub mod slack;

use converter::{convert_links, decode_entities, normalize, strip_tags, translate_tags};
use message::{ConvertedMessage, RawMessage};

pub use error::{Error, Result};

/// Convert an HTML email body to Slack mrkdwn
pub fn html_to_mrkdwn(html: &str) -> String {
    let text = convert_links(html);
    let text = translate_tags(&text);
    let text = strip_tags(&text);
    let text = decode_entities(&text);
    normalize(&text).trim().to_string()
}

/// Convert the body of `raw`, carrying its metadata over unchanged
pub fn convert_message(raw: &RawMessage) -> ConvertedMessage {
    ConvertedMessage {
        text_content: html_to_mrkdwn(&raw.html),
        subject: raw.subject.clone(),
        date: raw.date.clone(),
        from_address: raw.from_address.clone(),
        message_id: raw.message_id.clone(),
    }
}
