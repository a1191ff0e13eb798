/// Email records flowing into and out of the converter
use serde::{Deserialize, Serialize};

/// An inbound email as handed over by the mail intake.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    /// HTML body, or the plain-text body when the email has no HTML part
    pub html: String,
    pub subject: String,
    pub date: String,
    pub from_address: String,
    pub message_id: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// A named MIME part carried alongside the message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    #[serde(skip)]
    pub content: Vec<u8>,
}

/// Converted email, ready to be laid out as Slack blocks.
///
/// Only `text_content` is produced by the converter; the other fields are
/// copied from the [`RawMessage`] untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertedMessage {
    pub text_content: String,
    pub subject: String,
    pub date: String,
    pub from_address: String,
    pub message_id: String,
}

impl RawMessage {
    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }
}
