use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use rust_decimal::Decimal;
use serde::Serialize;

use super::classifier::{classify_transfers, select_whale_transfer};
use crate::api::ws_types::WsMessage;
use crate::bus::EventBus;
use crate::config::MonitorConfig;
use crate::db::Store;
use crate::engine::PriceCache;
use crate::models::{InsertOutcome, NewTransaction, ParsedTransaction};
use crate::solana::MarketDataSource;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonitorSummary {
    pub whales_checked: usize,
    pub new_transactions: usize,
    pub duplicates: usize,
    /// Signatures dropped as absent, failed, or below the significance bar.
    pub skipped: usize,
    pub whale_errors: usize,
}

/// Build the record for one whale transaction, or `None` when it should be
/// skipped: failed on-chain, no block time, no movement of `mint`, or a
/// movement not strictly above `min_amount`.
pub fn record_from_transaction(
    whale_address: &str,
    tx: &ParsedTransaction,
    mint: &str,
    min_amount: Decimal,
    price: Option<Decimal>,
) -> Option<NewTransaction> {
    if tx.failed {
        return None;
    }
    let block_time = tx.block_time?;

    let transfers = classify_transfers(&tx.pre_token_balances, &tx.post_token_balances, mint);
    let transfer = select_whale_transfer(&transfers, whale_address)?;
    if transfer.amount <= min_amount {
        return None;
    }

    Some(NewTransaction {
        signature: tx.signature.clone(),
        whale_address: whale_address.to_string(),
        kind: transfer.kind,
        amount: transfer.amount,
        price,
        block_time,
        slot: i64::try_from(tx.slot).ok()?,
        fee_lamports: tx.fee_lamports.and_then(|f| i64::try_from(f).ok()),
    })
}

/// Watches the largest whales for new transactions.
///
/// Each persisted record is published immediately. One whale's failure never
/// stops the others.
pub struct TransactionMonitor {
    source: Arc<dyn MarketDataSource>,
    store: Arc<dyn Store>,
    prices: Arc<PriceCache>,
    bus: EventBus,
    config: MonitorConfig,
}

impl TransactionMonitor {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        store: Arc<dyn Store>,
        prices: Arc<PriceCache>,
        bus: EventBus,
        config: MonitorConfig,
    ) -> Self {
        Self {
            source,
            store,
            prices,
            bus,
            config,
        }
    }

    pub async fn run_cycle(&self) -> anyhow::Result<MonitorSummary> {
        let started = Instant::now();
        let whales = self.store.top_whales(self.config.top_n, 0).await?;
        let price = self.prices.current().await;

        let mut summary = MonitorSummary {
            whales_checked: whales.len(),
            ..Default::default()
        };

        for whale in &whales {
            if let Err(e) = self.process_whale(&whale.address, price, &mut summary).await {
                summary.whale_errors += 1;
                tracing::warn!(
                    error = %e,
                    address = %whale.address,
                    "Transaction monitor: whale failed"
                );
            }
        }

        histogram!("monitor_cycle_seconds").record(started.elapsed().as_secs_f64());
        if summary.new_transactions > 0 || summary.whale_errors > 0 {
            tracing::info!(
                whales = summary.whales_checked,
                new = summary.new_transactions,
                duplicates = summary.duplicates,
                skipped = summary.skipped,
                errors = summary.whale_errors,
                "Transaction monitor cycle complete"
            );
        }

        Ok(summary)
    }

    async fn process_whale(
        &self,
        address: &str,
        price: Option<Decimal>,
        summary: &mut MonitorSummary,
    ) -> anyhow::Result<()> {
        let signatures = self
            .source
            .list_recent_signatures(address, self.config.signature_limit)
            .await
            .inspect_err(|_| counter!("source_errors_total", "op" => "signatures").increment(1))?;
        if signatures.is_empty() {
            return Ok(());
        }

        let known = self.store.known_signatures(&signatures).await?;

        for signature in signatures.iter().filter(|s| !known.contains(*s)) {
            let tx = match self.source.get_transaction(signature).await {
                Ok(Some(tx)) => tx,
                Ok(None) => {
                    summary.skipped += 1;
                    continue;
                }
                Err(e) => {
                    counter!("source_errors_total", "op" => "transaction").increment(1);
                    tracing::debug!(error = %e, signature = %signature, "Failed to fetch transaction");
                    summary.skipped += 1;
                    continue;
                }
            };

            let Some(record) = record_from_transaction(
                address,
                &tx,
                &self.config.mint,
                self.config.min_transfer_amount,
                price,
            ) else {
                summary.skipped += 1;
                continue;
            };

            match self.store.insert_transaction(&record).await? {
                InsertOutcome::Inserted(row) => {
                    summary.new_transactions += 1;
                    counter!("whale_transactions_total", "kind" => row.kind.as_str())
                        .increment(1);
                    tracing::info!(
                        address = %address,
                        signature = %row.signature,
                        kind = %row.kind,
                        amount = %row.amount,
                        "Whale transaction recorded"
                    );
                    let block_time = row.block_time;
                    self.bus.publish(WsMessage::NewTransaction(row));

                    // Bookkeeping only; the record and its event already stand.
                    if let Err(e) = self.store.record_whale_activity(address, block_time).await {
                        tracing::warn!(
                            error = %e,
                            address = %address,
                            "Failed to update whale activity"
                        );
                    }
                }
                InsertOutcome::Duplicate => {
                    summary.duplicates += 1;
                    counter!("duplicate_transactions_total").increment(1);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TokenBalance, TransferKind};
    use chrono::Utc;

    const MINT: &str = "MintTracked";

    fn bal(index: u32, owner: &str, amount: i64) -> TokenBalance {
        TokenBalance {
            account_index: index,
            mint: MINT.into(),
            owner: Some(owner.into()),
            amount: Decimal::from(amount),
        }
    }

    fn parsed(pre: i64, post: i64) -> ParsedTransaction {
        ParsedTransaction {
            signature: "sig".into(),
            slot: 42,
            block_time: Some(Utc::now()),
            fee_lamports: Some(5_000),
            failed: false,
            pre_token_balances: vec![bal(1, "whale", pre)],
            post_token_balances: vec![bal(1, "whale", post)],
        }
    }

    #[test]
    fn test_significant_transfer_becomes_record() {
        let rec = record_from_transaction(
            "whale",
            &parsed(100_000, 150_000),
            MINT,
            Decimal::from(10_000),
            Some(Decimal::new(2, 1)),
        )
        .unwrap();

        assert_eq!(rec.kind, TransferKind::Buy);
        assert_eq!(rec.amount, Decimal::from(50_000));
        assert_eq!(rec.value_usd(), Some(Decimal::from(10_000)));
        assert_eq!(rec.fee_lamports, Some(5_000));
        assert_eq!(rec.slot, 42);
    }

    #[test]
    fn test_threshold_is_strict() {
        let min = Decimal::from(10_000);
        assert!(record_from_transaction("whale", &parsed(0, 10_000), MINT, min, None).is_none());
        assert!(record_from_transaction("whale", &parsed(0, 10_001), MINT, min, None).is_some());
    }

    #[test]
    fn test_failed_or_undated_transactions_skip() {
        let min = Decimal::from(10);

        let mut failed = parsed(0, 50_000);
        failed.failed = true;
        assert!(record_from_transaction("whale", &failed, MINT, min, None).is_none());

        let mut undated = parsed(0, 50_000);
        undated.block_time = None;
        assert!(record_from_transaction("whale", &undated, MINT, min, None).is_none());
    }
}
