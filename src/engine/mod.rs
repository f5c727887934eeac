pub mod alert_engine;
pub mod rules;
pub mod snapshot;

pub use alert_engine::{AlertEngine, CycleSummary};
pub use snapshot::{MarketAggregator, PriceCache};

use crate::api::ws_types::WsMessage;
use crate::bus::EventBus;

/// Push the current whale concentration metrics to live subscribers.
pub async fn publish_whale_metrics(
    aggregator: &MarketAggregator,
    bus: &EventBus,
) -> anyhow::Result<()> {
    let metrics = aggregator.whale_metrics().await?;
    tracing::debug!(
        total_whales = metrics.total_whales,
        distribution_score = %metrics.distribution_score,
        "Whale metrics update"
    );
    bus.publish(WsMessage::WhaleMetricsUpdate(metrics));
    Ok(())
}
