/// Slack Web API client
use std::sync::Mutex;

use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::config::DEFAULT_SLACK_API_BASE;
use crate::error::{Error, Result};

/// Where converted messages are sent.
#[allow(async_fn_in_trait)]
pub trait MessageSink {
    /// Post a Block Kit message; `text` is the notification fallback.
    async fn post_blocks(&self, channel: &str, text: &str, blocks: &[Value]) -> Result<()>;

    /// Share a file into the conversation.
    async fn upload_file(&self, channel: &str, filename: &str, content: &[u8]) -> Result<()>;
}

/// Fields present on every Web API response.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadUrlResponse {
    ok: bool,
    error: Option<String>,
    upload_url: Option<String>,
    file_id: Option<String>,
}

/// HTTP client for the Slack Web API.
///
/// Covers what republishing an email needs: `chat.postMessage` for the
/// blocks, and the external upload (`files.getUploadURLExternal`, then the
/// upload itself, then `files.completeUploadExternal`) for attachments.
pub struct SlackClient {
    http: Client,
    bot_token: String,
    base_url: String,
}

impl SlackClient {
    pub fn new(bot_token: String) -> Self {
        Self::with_base_url(bot_token, DEFAULT_SLACK_API_BASE.to_string())
    }

    /// Client pointing at a custom API base URL.
    pub fn with_base_url(bot_token: String, base_url: String) -> Self {
        Self {
            http: Client::new(),
            bot_token,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    /// POST a JSON body to a Web API method and decode the reply.
    async fn call_json<T: DeserializeOwned>(&self, method: &str, body: &Value) -> Result<T> {
        debug!("calling {}", method);
        let resp = self
            .http
            .post(self.url(method))
            .bearer_auth(&self.bot_token)
            .json(body)
            .send()
            .await?;
        Ok(resp.json().await?)
    }
}

fn check(method: &str, ok: bool, error: Option<String>) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(Error::SlackApi {
            method: method.to_string(),
            error: error.unwrap_or_else(|| "unknown error".into()),
        })
    }
}

impl MessageSink for SlackClient {
    async fn post_blocks(&self, channel: &str, text: &str, blocks: &[Value]) -> Result<()> {
        let body = json!({
            "channel": channel,
            "text": text,
            "blocks": blocks,
        });
        let resp: ApiResponse = self.call_json("chat.postMessage", &body).await?;
        check("chat.postMessage", resp.ok, resp.error)
    }

    async fn upload_file(&self, channel: &str, filename: &str, content: &[u8]) -> Result<()> {
        let method = "files.getUploadURLExternal";
        debug!("calling {}", method);
        let length = content.len().to_string();
        let resp: UploadUrlResponse = self
            .http
            .post(self.url(method))
            .bearer_auth(&self.bot_token)
            .form(&[("filename", filename), ("length", length.as_str())])
            .send()
            .await?
            .json()
            .await?;
        check(method, resp.ok, resp.error)?;

        let (Some(upload_url), Some(file_id)) = (resp.upload_url, resp.file_id) else {
            return Err(Error::SlackApi {
                method: method.to_string(),
                error: "response has no upload_url or file_id".into(),
            });
        };

        self.http
            .post(&upload_url)
            .body(content.to_vec())
            .send()
            .await?
            .error_for_status()?;

        let body = json!({
            "files": [{ "id": file_id, "title": filename }],
            "channel_id": channel,
        });
        let resp: ApiResponse = self
            .call_json("files.completeUploadExternal", &body)
            .await?;
        check("files.completeUploadExternal", resp.ok, resp.error)
    }
}

/// Sink that records the `chat.postMessage` payloads it would have sent.
#[derive(Debug, Default)]
pub struct DryRun {
    payloads: Mutex<Vec<Value>>,
}

impl DryRun {
    /// Payloads collected so far, oldest first.
    pub fn take_payloads(&self) -> Vec<Value> {
        match self.payloads.lock() {
            Ok(mut payloads) => std::mem::take(&mut *payloads),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl MessageSink for DryRun {
    async fn post_blocks(&self, channel: &str, text: &str, blocks: &[Value]) -> Result<()> {
        info!("dry run: would post {:?} to {}", text, channel);
        let payload = json!({ "channel": channel, "text": text, "blocks": blocks });
        match self.payloads.lock() {
            Ok(mut payloads) => payloads.push(payload),
            Err(poisoned) => poisoned.into_inner().push(payload),
        }
        Ok(())
    }

    async fn upload_file(&self, channel: &str, filename: &str, content: &[u8]) -> Result<()> {
        info!(
            "dry run: would upload {} ({} bytes) to {}",
            filename,
            content.len(),
            channel
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_base_url() {
        let client = SlackClient::new("xoxb-test".into());
        assert_eq!(client.base_url(), "https://slack.com/api");
    }

    #[test]
    fn test_custom_base_url_drops_trailing_slash() {
        let client =
            SlackClient::with_base_url("xoxb-test".into(), "http://localhost:9999/".into());
        assert_eq!(client.base_url(), "http://localhost:9999");
        assert_eq!(
            client.url("chat.postMessage"),
            "http://localhost:9999/chat.postMessage"
        );
    }

    #[test]
    fn test_failed_response_maps_to_slack_error() {
        let err = check("chat.postMessage", false, Some("channel_not_found".into())).unwrap_err();
        assert_eq!(err.to_string(), "chat.postMessage failed: channel_not_found");
        assert!(check("chat.postMessage", true, None).is_ok());
    }

    #[tokio::test]
    async fn test_dry_run_collects_payloads() {
        let sink = DryRun::default();
        let blocks = vec![json!({"type": "divider"})];
        sink.post_blocks("C1", "Prefix: One", &blocks).await.unwrap();
        sink.upload_file("C1", "a.pdf", b"%PDF").await.unwrap();
        sink.post_blocks("U2", "Prefix: Two", &[]).await.unwrap();

        let payloads = sink.take_payloads();
        assert_eq!(payloads.len(), 2);
        assert_eq!(payloads[0]["channel"], "C1");
        assert_eq!(payloads[0]["blocks"][0]["type"], "divider");
        assert_eq!(payloads[1]["text"], "Prefix: Two");
        assert!(sink.take_payloads().is_empty());
    }

    #[test]
    fn test_upload_url_response_deserializes() {
        let resp: UploadUrlResponse = serde_json::from_str(
            r#"{"ok":true,"upload_url":"https://files.slack.com/upload/v1/abc","file_id":"F123"}"#,
        )
        .unwrap();
        assert!(resp.ok);
        assert_eq!(resp.file_id.as_deref(), Some("F123"));
        assert!(resp.error.is_none());
    }
}
