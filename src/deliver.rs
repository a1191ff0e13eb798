/// Delivery of parsed emails to Slack
use log::{error, info, warn};

use crate::blocks::BlockRenderer;
use crate::config::Config;
use crate::convert_message;
use crate::error::{Error, Result};
use crate::mail::sender_allowed;
use crate::message::RawMessage;
use crate::routing::{Destination, Router};
use crate::slack::MessageSink;

/// Outcome counts of a [`Dispatcher::deliver_all`] run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub delivered: usize,
    /// Rejected by the sender allow-list
    pub skipped: usize,
    pub failed: usize,
}

pub struct Dispatcher<S> {
    router: Router,
    allowed_from: Vec<String>,
    prefix: String,
    renderer: BlockRenderer,
    sink: S,
}

impl<S: MessageSink> Dispatcher<S> {
    pub fn new(config: &Config, sink: S) -> Self {
        Dispatcher {
            router: config.router(),
            allowed_from: config.allowed_from.clone(),
            prefix: config.notification_prefix.clone(),
            renderer: BlockRenderer::new(),
            sink,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Convert, route and post one message, then upload its attachments.
    ///
    /// Attachments go out after the blocks so they show up below the
    /// message in the conversation.
    pub async fn deliver(&self, raw: &RawMessage) -> Result<Destination> {
        let destination = self
            .router
            .destination(&raw.subject)
            .ok_or_else(|| Error::NoDestination(raw.subject.clone()))?;

        let converted = convert_message(raw);
        let blocks = self.renderer.render(&converted, raw.has_attachments());
        let text = format!("{}: {}", self.prefix, converted.subject);
        self.sink
            .post_blocks(destination.id(), &text, &blocks)
            .await?;

        if raw.has_attachments() {
            info!(
                "Uploading {} attachment(s) for email: {}",
                raw.attachments.len(),
                raw.subject
            );
            for attachment in &raw.attachments {
                self.sink
                    .upload_file(destination.id(), &attachment.filename, &attachment.content)
                    .await?;
            }
        }

        Ok(destination)
    }

    /// Deliver messages in order. A failure is logged and does not stop the
    /// remaining messages.
    pub async fn deliver_all(&self, messages: &[RawMessage]) -> Summary {
        let mut summary = Summary::default();

        for raw in messages {
            if !sender_allowed(&raw.from_address, &self.allowed_from) {
                warn!(
                    "Skipping {} from disallowed sender {}",
                    raw.message_id, raw.from_address
                );
                summary.skipped += 1;
                continue;
            }

            match self.deliver(raw).await {
                Ok(destination) => {
                    info!("Delivered {} to {}", raw.message_id, destination.id());
                    summary.delivered += 1;
                }
                Err(Error::NoDestination(subject)) => {
                    warn!("No route matched for email subject: {}", subject);
                    summary.failed += 1;
                }
                Err(e) => {
                    error!("Failed to deliver {}: {}", raw.message_id, e);
                    summary.failed += 1;
                }
            }
        }

        summary
    }
}
