use async_trait::async_trait;
use serde_json::json;

use super::{check_status, ChannelError, NotificationChannel};
use crate::models::SnapshotMetrics;

const EMBED_COLOR: u32 = 0xFF6B35;

/// Discord incoming-webhook channel. Posts a single embed per alert.
#[derive(Debug, Clone)]
pub struct DiscordChannel {
    http: reqwest::Client,
    webhook_url: Option<String>,
    token_symbol: String,
}

impl DiscordChannel {
    pub fn new(http: reqwest::Client, webhook_url: Option<String>, token_symbol: String) -> Self {
        Self {
            http,
            webhook_url,
            token_symbol,
        }
    }

    fn payload(&self, message: &str, context: &SnapshotMetrics) -> serde_json::Value {
        let mut fields = Vec::new();
        if let Some(price) = context.price {
            fields.push(json!({
                "name": "Current Price",
                "value": format!("${}", price.normalize()),
                "inline": true,
            }));
        }
        fields.push(json!({
            "name": "24h Volume",
            "value": format!("${}", context.volume_24h.round_dp(2).normalize()),
            "inline": true,
        }));

        json!({
            "embeds": [{
                "title": format!("{} Whale Alert", self.token_symbol),
                "description": message,
                "color": EMBED_COLOR,
                "fields": fields,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }]
        })
    }
}

#[async_trait]
impl NotificationChannel for DiscordChannel {
    fn name(&self) -> &str {
        "discord"
    }

    fn is_configured(&self) -> bool {
        self.webhook_url.is_some()
    }

    async fn send(&self, message: &str, context: &SnapshotMetrics) -> Result<(), ChannelError> {
        let Some(url) = &self.webhook_url else {
            return Ok(());
        };

        let resp = self
            .http
            .post(url)
            .json(&self.payload(message, context))
            .send()
            .await?;

        check_status(resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_embed_fields() {
        let channel = DiscordChannel::new(reqwest::Client::new(), None, "CHONK9K".into());
        let ctx = SnapshotMetrics {
            price: Some(Decimal::new(8, 2)),
            volume_24h: Decimal::from(650_000),
            ..Default::default()
        };

        let body = channel.payload("Volume spike", &ctx);
        let embed = &body["embeds"][0];

        assert_eq!(embed["title"], "CHONK9K Whale Alert");
        assert_eq!(embed["color"], 0xFF6B35);
        assert_eq!(embed["fields"][0]["name"], "Current Price");
        assert_eq!(embed["fields"][0]["value"], "$0.08");
        assert_eq!(embed["fields"][1]["value"], "$650000");
    }

    #[test]
    fn test_price_field_omitted_without_quote() {
        let channel = DiscordChannel::new(reqwest::Client::new(), None, "CHONK9K".into());
        let body = channel.payload("x", &SnapshotMetrics::default());
        let fields = body["embeds"][0]["fields"].as_array().unwrap();

        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0]["name"], "24h Volume");
        assert!(!channel.is_configured());
    }
}
