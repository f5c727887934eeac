use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use metrics::{counter, gauge};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

use crate::db::Store;
use crate::models::{
    ActivityStats, MarketSnapshot, SnapshotMetrics, Timeframe, WhaleMetrics, WhaleStats,
};
use crate::solana::MarketDataSource;

// ---------------------------------------------------------------------------
// PriceCache
// ---------------------------------------------------------------------------

/// Current token price with a short TTL. Concurrent callers share one
/// in-flight refresh; a failed refresh falls back to the last known price.
pub struct PriceCache {
    source: Arc<dyn MarketDataSource>,
    ttl: Duration,
    cached: Mutex<Option<(Decimal, Instant)>>,
}

impl PriceCache {
    pub fn new(source: Arc<dyn MarketDataSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            cached: Mutex::new(None),
        }
    }

    /// Cached price if fresh, otherwise a refreshed one. `None` only when no
    /// price has ever been fetched successfully.
    pub async fn current(&self) -> Option<Decimal> {
        let mut cached = self.cached.lock().await;
        if let Some((price, fetched_at)) = *cached {
            if fetched_at.elapsed() < self.ttl {
                return Some(price);
            }
        }
        self.fetch_into(&mut cached).await
    }

    /// Force a refresh regardless of age.
    pub async fn refresh(&self) -> Option<Decimal> {
        let mut cached = self.cached.lock().await;
        self.fetch_into(&mut cached).await
    }

    async fn fetch_into(&self, cached: &mut Option<(Decimal, Instant)>) -> Option<Decimal> {
        match self.source.get_current_price().await {
            Ok(price) => {
                *cached = Some((price, Instant::now()));
                gauge!("token_price_usd").set(price.to_f64().unwrap_or(0.0));
                Some(price)
            }
            Err(e) => {
                counter!("source_errors_total", "op" => "price").increment(1);
                let stale = cached.map(|(p, _)| p);
                tracing::warn!(error = %e, stale = ?stale, "Price refresh failed");
                stale
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Pure metric helpers
// ---------------------------------------------------------------------------

/// `100 - top/total*100`, clamped to [0, 100]. Zero when nothing is held.
pub fn distribution_score(total_balance: Decimal, top_balance: Decimal) -> Decimal {
    if total_balance <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let score = Decimal::ONE_HUNDRED - top_balance / total_balance * Decimal::ONE_HUNDRED;
    score.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED).round_dp(2)
}

pub fn whale_metrics_from_stats(stats: &WhaleStats) -> WhaleMetrics {
    WhaleMetrics {
        total_balance: stats.total_balance,
        total_whales: stats.whale_count,
        avg_balance: stats.avg_balance().round_dp(2),
        top_whale_balance: stats.top_balance,
        distribution_score: distribution_score(stats.total_balance, stats.top_balance),
    }
}

// ---------------------------------------------------------------------------
// MarketAggregator
// ---------------------------------------------------------------------------

/// Read-only view over the registry and transaction history. Holds no state
/// besides the shared price cache.
#[derive(Clone)]
pub struct MarketAggregator {
    store: Arc<dyn Store>,
    prices: Arc<PriceCache>,
    whale_limit: i64,
}

impl MarketAggregator {
    pub fn new(store: Arc<dyn Store>, prices: Arc<PriceCache>, whale_limit: i64) -> Self {
        Self {
            store,
            prices,
            whale_limit,
        }
    }

    pub fn prices(&self) -> &Arc<PriceCache> {
        &self.prices
    }

    pub async fn snapshot(&self, now: DateTime<Utc>) -> anyhow::Result<MarketSnapshot> {
        let whales = self.store.top_whales(self.whale_limit, 0).await?;
        let transactions = self
            .store
            .transactions_since(now - ChronoDuration::hours(24))
            .await?;
        let stats = self.store.whale_stats().await?;
        let price = self.prices.current().await;

        let activity = ActivityStats::from_records(&transactions);
        let metrics = SnapshotMetrics {
            price,
            volume_24h: activity.total_volume,
            avg_transaction_size: activity.avg_transaction_size,
            whale_count: stats.whale_count,
            transaction_count: activity.total_transactions,
            buy_count: activity.buy_transactions,
            sell_count: activity.sell_transactions,
            distribution_score: distribution_score(stats.total_balance, stats.top_balance),
        };

        gauge!("active_whales").set(stats.whale_count as f64);
        gauge!("volume_24h_usd").set(metrics.volume_24h.to_f64().unwrap_or(0.0));

        Ok(MarketSnapshot {
            taken_at: now,
            whales,
            transactions,
            metrics,
        })
    }

    pub async fn whale_metrics(&self) -> anyhow::Result<WhaleMetrics> {
        let stats = self.store.whale_stats().await?;
        Ok(whale_metrics_from_stats(&stats))
    }

    pub async fn activity_stats(
        &self,
        timeframe: Timeframe,
        now: DateTime<Utc>,
    ) -> anyhow::Result<ActivityStats> {
        let records = self.store.transactions_since(now - timeframe.duration()).await?;
        Ok(ActivityStats::from_records(&records))
    }
}
