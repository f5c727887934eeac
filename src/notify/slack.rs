use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{ChannelError, NotificationChannel};
use crate::models::SnapshotMetrics;

const POST_MESSAGE_URL: &str = "https://slack.com/api/chat.postMessage";

/// Slack bot channel using `chat.postMessage`.
#[derive(Debug, Clone)]
pub struct SlackChannel {
    http: reqwest::Client,
    bot_token: Option<String>,
    channel: String,
}

/// Slack answers 200 even on failure; the outcome is in the body.
#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

impl SlackChannel {
    pub fn new(http: reqwest::Client, bot_token: Option<String>, channel: String) -> Self {
        Self {
            http,
            bot_token,
            channel,
        }
    }
}

#[async_trait]
impl NotificationChannel for SlackChannel {
    fn name(&self) -> &str {
        "slack"
    }

    fn is_configured(&self) -> bool {
        self.bot_token.is_some()
    }

    async fn send(&self, message: &str, context: &SnapshotMetrics) -> Result<(), ChannelError> {
        let Some(token) = &self.bot_token else {
            return Ok(());
        };

        let mut text = message.to_string();
        if let Some(price) = context.price {
            text.push_str(&format!("\nPrice: ${}", price.normalize()));
        }

        let body = json!({
            "channel": self.channel,
            "text": text,
        });

        let resp = self
            .http
            .post(POST_MESSAGE_URL)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ChannelError::Rejected(resp.status().to_string()));
        }

        let parsed: SlackResponse = resp
            .json()
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;
        if !parsed.ok {
            return Err(ChannelError::Rejected(
                parsed.error.unwrap_or_else(|| "unknown slack error".into()),
            ));
        }
        Ok(())
    }
}
