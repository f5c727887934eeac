pub mod discord;
pub mod slack;
pub mod telegram;
pub mod webhook;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use metrics::counter;
use serde::Serialize;
use thiserror::Error;

use crate::config::AppConfig;
use crate::models::SnapshotMetrics;

pub use discord::DiscordChannel;
pub use slack::SlackChannel;
pub use telegram::TelegramChannel;
pub use webhook::WebhookChannel;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("rejected by remote: {0}")]
    Rejected(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Client-side timeouts land here too; `Timeout` is reserved for the
/// dispatcher's own per-channel bound, which knows its duration.
impl From<reqwest::Error> for ChannelError {
    fn from(e: reqwest::Error) -> Self {
        ChannelError::Transport(e.to_string())
    }
}

/// A named notification sink.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn name(&self) -> &str;

    /// False when credentials are missing; the dispatcher then skips the
    /// channel without counting it as a failure.
    fn is_configured(&self) -> bool;

    async fn send(&self, message: &str, context: &SnapshotMetrics) -> Result<(), ChannelError>;
}

/// Reject a non-2xx response, keeping the status and a short body excerpt.
pub(crate) async fn check_status(resp: reqwest::Response) -> Result<(), ChannelError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let body = resp.text().await.unwrap_or_default();
    let excerpt: String = body.chars().take(200).collect();
    Err(ChannelError::Rejected(format!("{status}: {excerpt}")))
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchReport {
    pub delivered: Vec<String>,
    /// Known channels without credentials.
    pub skipped: Vec<String>,
    /// (action, reason) for unknown actions and failed sends.
    pub failed: Vec<(String, String)>,
}

impl DispatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

enum Outcome {
    Delivered,
    Skipped,
    Failed(String),
}

/// Routes an alert's actions to the registered channels. Sends run
/// concurrently, each bounded by `timeout`; one channel's failure never
/// affects another.
#[derive(Clone)]
pub struct Dispatcher {
    channels: HashMap<String, Arc<dyn NotificationChannel>>,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            channels: HashMap::new(),
            timeout,
        }
    }

    /// Register every built-in channel. Unconfigured ones stay registered so
    /// their actions resolve to a silent skip rather than an unknown name.
    pub fn from_config(config: &AppConfig, http: reqwest::Client) -> Self {
        let mut dispatcher = Self::new(config.notification_timeout());
        dispatcher.register(Arc::new(DiscordChannel::new(
            http.clone(),
            config.discord_webhook_url.clone(),
            config.token_symbol.clone(),
        )));
        dispatcher.register(Arc::new(SlackChannel::new(
            http.clone(),
            config.slack_bot_token.clone(),
            config.slack_channel.clone(),
        )));
        dispatcher.register(Arc::new(TelegramChannel::new(
            http.clone(),
            config.telegram_bot_token.clone(),
            config.telegram_chat_id.clone(),
        )));
        dispatcher.register(Arc::new(WebhookChannel::new(
            http,
            config.alert_webhook_url.clone(),
        )));
        dispatcher
    }

    pub fn register(&mut self, channel: Arc<dyn NotificationChannel>) {
        self.channels
            .insert(channel.name().to_lowercase(), channel);
    }

    pub fn configured_channels(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .channels
            .iter()
            .filter(|(_, c)| c.is_configured())
            .map(|(n, _)| n.clone())
            .collect();
        names.sort();
        names
    }

    pub async fn dispatch(
        &self,
        actions: &[String],
        message: &str,
        context: &SnapshotMetrics,
    ) -> DispatchReport {
        let mut unique: Vec<String> = Vec::with_capacity(actions.len());
        for action in actions {
            let action = action.trim().to_lowercase();
            if !unique.contains(&action) {
                unique.push(action);
            }
        }

        let sends = unique.iter().map(|action| async move {
            let outcome = self.send_one(action, message, context).await;
            (action.clone(), outcome)
        });

        let mut report = DispatchReport::default();
        for (action, outcome) in join_all(sends).await {
            match outcome {
                Outcome::Delivered => {
                    counter!("notifications_sent_total", "channel" => action.clone()).increment(1);
                    report.delivered.push(action);
                }
                Outcome::Skipped => report.skipped.push(action),
                Outcome::Failed(reason) => {
                    counter!("notifications_failed_total", "channel" => action.clone())
                        .increment(1);
                    tracing::warn!(channel = %action, error = %reason, "Notification failed");
                    report.failed.push((action, reason));
                }
            }
        }
        report
    }

    async fn send_one(&self, action: &str, message: &str, context: &SnapshotMetrics) -> Outcome {
        let Some(channel) = self.channels.get(action) else {
            return Outcome::Failed("unknown channel".into());
        };
        if !channel.is_configured() {
            tracing::debug!(channel = action, "Channel not configured, skipping");
            return Outcome::Skipped;
        }

        match tokio::time::timeout(self.timeout, channel.send(message, context)).await {
            Ok(Ok(())) => Outcome::Delivered,
            Ok(Err(e)) => Outcome::Failed(e.to_string()),
            Err(_) => Outcome::Failed(ChannelError::Timeout(self.timeout).to_string()),
        }
    }
}
