use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use super::{check_status, ChannelError, NotificationChannel};
use crate::models::SnapshotMetrics;

/// Generic JSON POST for integrations without a dedicated channel.
#[derive(Debug, Clone)]
pub struct WebhookChannel {
    http: reqwest::Client,
    url: Option<String>,
}

impl WebhookChannel {
    pub fn new(http: reqwest::Client, url: Option<String>) -> Self {
        Self { http, url }
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    fn name(&self) -> &str {
        "webhook"
    }

    fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    async fn send(&self, message: &str, context: &SnapshotMetrics) -> Result<(), ChannelError> {
        let Some(url) = &self.url else {
            return Ok(());
        };

        let body = json!({
            "message": message,
            "context": context,
            "sent_at": Utc::now(),
        });

        let resp = self.http.post(url).json(&body).send().await?;
        check_status(resp).await
    }
}
