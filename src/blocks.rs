/// Slack Block Kit layout for converted emails
use serde_json::{Value, json};

use crate::message::ConvertedMessage;

pub struct BlockRenderer;

impl BlockRenderer {
    pub fn new() -> Self {
        BlockRenderer
    }

    pub fn render(&self, message: &ConvertedMessage, has_attachments: bool) -> Vec<Value> {
        build_blocks(
            &message.subject,
            &message.date,
            &message.text_content,
            has_attachments,
        )
    }
}

impl Default for BlockRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Subject, date and body sections, plus an attachments footer when the
/// email carried files (they are uploaded as follow-up messages).
pub fn build_blocks(
    subject: &str,
    date: &str,
    text_content: &str,
    has_attachments: bool,
) -> Vec<Value> {
    let mut blocks = vec![
        mrkdwn_section(&format!("*{}*", subject)),
        mrkdwn_section(&format!("_Date: {}_", date)),
        mrkdwn_section(text_content),
    ];

    if has_attachments {
        blocks.push(json!({ "type": "divider" }));
        blocks.push(mrkdwn_section("*📎 Attachments*"));
    }

    blocks
}

fn mrkdwn_section(text: &str) -> Value {
    json!({
        "type": "section",
        "text": { "type": "mrkdwn", "text": text },
    })
}
