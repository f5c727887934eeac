use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::ingestion::discovery::DiscoverySummary;
use crate::models::{TransactionRecord, WhaleAccount, WhaleMetrics};

/// Messages broadcast to all connected WebSocket clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum WsMessage {
    #[serde(rename = "new_whale_discovered")]
    WhaleDiscovered(WhaleAccount),

    #[serde(rename = "whale_discovery_complete")]
    DiscoveryComplete(DiscoverySummary),

    #[serde(rename = "new_transaction")]
    NewTransaction(TransactionRecord),

    #[serde(rename = "alert_triggered")]
    AlertTriggered(AlertTriggeredData),

    #[serde(rename = "whale_metrics_update")]
    WhaleMetricsUpdate(WhaleMetrics),
}

impl WsMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            WsMessage::WhaleDiscovered(_) => "new_whale_discovered",
            WsMessage::DiscoveryComplete(_) => "whale_discovery_complete",
            WsMessage::NewTransaction(_) => "new_transaction",
            WsMessage::AlertTriggered(_) => "alert_triggered",
            WsMessage::WhaleMetricsUpdate(_) => "whale_metrics_update",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertTriggeredData {
    pub alert_id: Uuid,
    pub alert_name: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// False when at least one notification channel failed.
    pub success: bool,
}
