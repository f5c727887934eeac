use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::time::sleep;

use crate::api::ws_types::WsMessage;
use crate::bus::EventBus;
use crate::config::DiscoveryConfig;
use crate::db::{Store, WhaleUpsert};
use crate::engine::PriceCache;
use crate::models::{HolderAccount, WhaleAccount};
use crate::solana::MarketDataSource;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiscoverySummary {
    pub new_whales: usize,
    pub updated_whales: usize,
    pub deactivated_whales: u64,
    pub failed: usize,
    pub total_processed: usize,
}

enum Upserted {
    New(WhaleAccount),
    Updated,
}

/// Percent change from `old` to `new`. A zero prior balance yields zero.
pub fn balance_change_pct(old: Decimal, new: Decimal) -> Decimal {
    if old.is_zero() {
        return Decimal::ZERO;
    }
    ((new - old) / old * Decimal::ONE_HUNDRED).round_dp(4)
}

/// Keeps the whale registry in sync with on-chain holder balances.
///
/// Flow per cycle:
/// 1. List holders at or above the threshold
/// 2. Upsert each in rate-limited batches (per-holder failures are logged)
/// 3. Deactivate registry whales missing from the listing
/// 4. Publish per-whale and summary events
pub struct WhaleDiscovery {
    source: Arc<dyn MarketDataSource>,
    store: Arc<dyn Store>,
    prices: Arc<PriceCache>,
    bus: EventBus,
    config: DiscoveryConfig,
}

impl WhaleDiscovery {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        store: Arc<dyn Store>,
        prices: Arc<PriceCache>,
        bus: EventBus,
        config: DiscoveryConfig,
    ) -> Self {
        Self {
            source,
            store,
            prices,
            bus,
            config,
        }
    }

    pub async fn run_cycle(&self) -> anyhow::Result<DiscoverySummary> {
        let started = Instant::now();

        let holders = self
            .source
            .list_holder_accounts(&self.config.mint, self.config.threshold)
            .await
            .inspect_err(|_| counter!("source_errors_total", "op" => "holders").increment(1))?;

        // The source filter is advisory; enforce the inclusive threshold here.
        let qualifying: Vec<HolderAccount> = holders
            .into_iter()
            .filter(|h| h.balance >= self.config.threshold)
            .collect();

        let price = self.prices.current().await;
        let now = Utc::now();
        let mut summary = DiscoverySummary {
            total_processed: qualifying.len(),
            ..Default::default()
        };

        for (i, batch) in qualifying.chunks(self.config.batch_size).enumerate() {
            if i > 0 && !self.config.batch_delay.is_zero() {
                sleep(self.config.batch_delay).await;
            }

            for holder in batch {
                match self.upsert_holder(holder, price, now).await {
                    Ok(Upserted::New(whale)) => {
                        summary.new_whales += 1;
                        counter!("whales_discovered_total").increment(1);
                        tracing::info!(
                            address = %whale.address,
                            balance = %whale.balance,
                            "New whale discovered"
                        );
                        self.bus.publish(WsMessage::WhaleDiscovered(whale));
                    }
                    Ok(Upserted::Updated) => summary.updated_whales += 1,
                    Err(e) => {
                        summary.failed += 1;
                        tracing::warn!(
                            error = %e,
                            address = %holder.address,
                            "Failed to upsert whale"
                        );
                    }
                }
            }
        }

        if qualifying.is_empty() {
            tracing::warn!("Holder listing returned no qualifying accounts, keeping registry as is");
        } else {
            let keep: Vec<String> = qualifying.iter().map(|h| h.address.clone()).collect();
            summary.deactivated_whales = self.store.deactivate_whales_except(&keep).await?;
            if summary.deactivated_whales > 0 {
                counter!("whales_deactivated_total").increment(summary.deactivated_whales);
            }
        }

        histogram!("discovery_cycle_seconds").record(started.elapsed().as_secs_f64());
        tracing::info!(
            new = summary.new_whales,
            updated = summary.updated_whales,
            deactivated = summary.deactivated_whales,
            failed = summary.failed,
            total = summary.total_processed,
            "Whale discovery complete"
        );
        self.bus.publish(WsMessage::DiscoveryComplete(summary.clone()));

        Ok(summary)
    }

    async fn upsert_holder(
        &self,
        holder: &HolderAccount,
        price: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Upserted> {
        let upsert = WhaleUpsert {
            address: holder.address.clone(),
            balance: holder.balance,
            balance_usd: price.map(|p| (holder.balance * p).round_dp(2)),
            seen_at: now,
        };

        match self.store.get_whale(&holder.address).await? {
            Some(existing) => {
                let change = balance_change_pct(existing.balance, holder.balance);
                self.store.update_whale(&upsert, change).await?;
                Ok(Upserted::Updated)
            }
            None => {
                let whale = self.store.insert_whale(&upsert).await?;
                Ok(Upserted::New(whale))
            }
        }
    }
}
