use async_trait::async_trait;
use serde_json::json;

use super::{check_status, ChannelError, NotificationChannel};
use crate::models::SnapshotMetrics;

/// Telegram Bot API channel. Needs both a bot token and a chat id.
#[derive(Debug, Clone)]
pub struct TelegramChannel {
    http: reqwest::Client,
    bot_token: Option<String>,
    chat_id: Option<String>,
}

impl TelegramChannel {
    pub fn new(http: reqwest::Client, bot_token: Option<String>, chat_id: Option<String>) -> Self {
        Self {
            http,
            bot_token,
            chat_id,
        }
    }
}

pub fn format_message(message: &str, context: &SnapshotMetrics) -> String {
    let mut text = format!("*Whale Alert*\n{message}");
    if let Some(price) = context.price {
        text.push_str(&format!("\nPrice: ${}", price.normalize()));
    }
    text.push_str(&format!(
        "\n24h Volume: ${}",
        context.volume_24h.round_dp(2).normalize()
    ));
    text
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn is_configured(&self) -> bool {
        self.bot_token.is_some() && self.chat_id.is_some()
    }

    async fn send(&self, message: &str, context: &SnapshotMetrics) -> Result<(), ChannelError> {
        let (Some(token), Some(chat_id)) = (&self.bot_token, &self.chat_id) else {
            return Ok(());
        };

        let url = format!("https://api.telegram.org/bot{token}/sendMessage");
        let body = json!({
            "chat_id": chat_id,
            "text": format_message(message, context),
            "parse_mode": "Markdown",
        });

        let resp = self.http.post(&url).json(&body).send().await?;
        check_status(resp).await
    }
}
