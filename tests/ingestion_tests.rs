mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;

use common::{test_config, FakeSource, FlakyStore};
use whalewatch::api::ws_types::WsMessage;
use whalewatch::bus::EventBus;
use whalewatch::db::{MemoryStore, Store, TransactionFilter};
use whalewatch::engine::PriceCache;
use whalewatch::ingestion::{TransactionMonitor, WhaleDiscovery};
use whalewatch::models::TransferKind;

struct Harness {
    memory: Arc<MemoryStore>,
    store: Arc<dyn Store>,
    source: Arc<FakeSource>,
    bus: EventBus,
    discovery: WhaleDiscovery,
    monitor: TransactionMonitor,
}

fn harness() -> Harness {
    let memory = Arc::new(MemoryStore::new());
    harness_on(memory.clone(), memory)
}

fn harness_on(memory: Arc<MemoryStore>, store: Arc<dyn Store>) -> Harness {
    let source = FakeSource::new();
    source.set_price(Decimal::new(5, 1));
    let prices = Arc::new(PriceCache::new(source.clone(), Duration::from_secs(60)));
    let bus = EventBus::new(64);
    let config = test_config();

    let discovery = WhaleDiscovery::new(
        source.clone(),
        store.clone(),
        prices.clone(),
        bus.clone(),
        config.discovery(),
    );
    let monitor = TransactionMonitor::new(
        source.clone(),
        store.clone(),
        prices,
        bus.clone(),
        config.monitor(),
    );

    Harness {
        memory,
        store,
        source,
        bus,
        discovery,
        monitor,
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_threshold_is_inclusive() {
    let h = harness();
    h.source.set_holders(&[
        ("whale_at_threshold", Decimal::from(100_000)),
        ("just_below", Decimal::new(99_999_999_999, 6)),
        ("big", Decimal::from(2_500_000)),
    ]);

    let summary = h.discovery.run_cycle().await.unwrap();

    assert_eq!(summary.new_whales, 2);
    assert_eq!(summary.total_processed, 2);
    assert!(h.store.get_whale("whale_at_threshold").await.unwrap().is_some());
    assert!(h.store.get_whale("just_below").await.unwrap().is_none());

    let whale = h.store.get_whale("big").await.unwrap().unwrap();
    assert_eq!(whale.balance_usd, Some(Decimal::from(1_250_000)));
    assert_eq!(whale.change_24h, Decimal::ZERO);
}

#[tokio::test]
async fn test_rediscovery_updates_balance_and_change() {
    let h = harness();
    h.source.set_holders(&[("w1", Decimal::from(200_000))]);
    h.discovery.run_cycle().await.unwrap();

    h.source.set_holders(&[("w1", Decimal::from(150_000))]);
    let summary = h.discovery.run_cycle().await.unwrap();

    assert_eq!(summary.new_whales, 0);
    assert_eq!(summary.updated_whales, 1);

    let whale = h.store.get_whale("w1").await.unwrap().unwrap();
    assert_eq!(whale.balance, Decimal::from(150_000));
    assert_eq!(whale.change_24h, Decimal::from(-25));
}

#[tokio::test]
async fn test_absent_whales_are_deactivated_then_revived() {
    let h = harness();
    h.source.set_holders(&[
        ("stays", Decimal::from(500_000)),
        ("leaves", Decimal::from(300_000)),
    ]);
    h.discovery.run_cycle().await.unwrap();

    h.source.set_holders(&[("stays", Decimal::from(500_000))]);
    let summary = h.discovery.run_cycle().await.unwrap();
    assert_eq!(summary.deactivated_whales, 1);

    let leaver = h.store.get_whale("leaves").await.unwrap().unwrap();
    assert!(!leaver.is_active);
    let top = h.store.top_whales(10, 0).await.unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].address, "stays");

    h.source.set_holders(&[
        ("stays", Decimal::from(500_000)),
        ("leaves", Decimal::from(400_000)),
    ]);
    h.discovery.run_cycle().await.unwrap();
    assert!(h.store.get_whale("leaves").await.unwrap().unwrap().is_active);
}

#[tokio::test]
async fn test_empty_listing_keeps_registry() {
    let h = harness();
    h.source.set_holders(&[("w1", Decimal::from(500_000))]);
    h.discovery.run_cycle().await.unwrap();

    h.source.set_holders(&[]);
    let summary = h.discovery.run_cycle().await.unwrap();

    assert_eq!(summary.deactivated_whales, 0);
    assert!(h.store.get_whale("w1").await.unwrap().unwrap().is_active);
}

#[tokio::test]
async fn test_source_outage_fails_cycle_without_writes() {
    let h = harness();
    h.source.set_holders(&[("w1", Decimal::from(500_000))]);
    h.source.holders_down.store(true, Ordering::SeqCst);

    assert!(h.discovery.run_cycle().await.is_err());
    assert!(h.store.get_whale("w1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_discovery_publishes_events() {
    let h = harness();
    let mut rx = h.bus.subscribe();
    h.source.set_holders(&[("w1", Decimal::from(500_000))]);

    h.discovery.run_cycle().await.unwrap();

    match rx.recv().await.unwrap() {
        WsMessage::WhaleDiscovered(whale) => assert_eq!(whale.address, "w1"),
        other => panic!("expected new whale event, got {}", other.kind()),
    }
    match rx.recv().await.unwrap() {
        WsMessage::DiscoveryComplete(summary) => assert_eq!(summary.new_whales, 1),
        other => panic!("expected discovery summary, got {}", other.kind()),
    }
}

// ---------------------------------------------------------------------------
// Transaction monitor
// ---------------------------------------------------------------------------

async fn discover(h: &Harness, whales: &[(&str, i64)]) {
    let holders: Vec<(&str, Decimal)> = whales
        .iter()
        .map(|(a, b)| (*a, Decimal::from(*b)))
        .collect();
    h.source.set_holders(&holders);
    h.discovery.run_cycle().await.unwrap();
}

#[tokio::test]
async fn test_same_signature_is_recorded_once() {
    let h = harness();
    discover(&h, &[("w1", 1_000_000)]).await;
    h.source.add_transfer("w1", "sig-1", 1_000_000, 1_050_000);

    let first = h.monitor.run_cycle().await.unwrap();
    let second = h.monitor.run_cycle().await.unwrap();

    assert_eq!(first.new_transactions, 1);
    assert_eq!(second.new_transactions, 0);
    assert_eq!(h.memory.transaction_count().await, 1);
    // Known signatures are filtered before any fetch on the second pass.
    assert_eq!(h.source.transaction_fetches.load(Ordering::SeqCst), 1);

    let whale = h.store.get_whale("w1").await.unwrap().unwrap();
    assert_eq!(whale.transaction_count_24h, 1);
    assert!(whale.last_activity.is_some());
}

#[tokio::test]
async fn test_recorded_transfer_is_classified_and_priced() {
    let h = harness();
    discover(&h, &[("w1", 1_000_000)]).await;
    h.source.add_transfer("w1", "sell-1", 1_000_000, 900_000);

    h.monitor.run_cycle().await.unwrap();

    let rows = h
        .store
        .recent_transactions(&TransactionFilter {
            whale_address: Some("w1".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].kind, TransferKind::Sell);
    assert_eq!(rows[0].amount, Decimal::from(100_000));
    assert_eq!(rows[0].value_usd, Some(Decimal::from(50_000)));
}

#[tokio::test]
async fn test_small_transfers_are_skipped() {
    let h = harness();
    discover(&h, &[("w1", 1_000_000)]).await;
    h.source.add_transfer("w1", "dust", 1_000_000, 1_000_500);

    let summary = h.monitor.run_cycle().await.unwrap();

    assert_eq!(summary.new_transactions, 0);
    assert_eq!(summary.skipped, 1);
    assert_eq!(h.memory.transaction_count().await, 0);
}

#[tokio::test]
async fn test_one_whale_failure_does_not_stop_others() {
    let h = harness();
    discover(&h, &[("broken", 2_000_000), ("healthy", 1_000_000)]).await;
    h.source.fail_for("broken");
    h.source.add_transfer("healthy", "sig-ok", 1_000_000, 1_200_000);

    let summary = h.monitor.run_cycle().await.unwrap();

    assert_eq!(summary.whales_checked, 2);
    assert_eq!(summary.whale_errors, 1);
    assert_eq!(summary.new_transactions, 1);
}

#[tokio::test]
async fn test_new_transaction_is_published() {
    let h = harness();
    discover(&h, &[("w1", 1_000_000)]).await;
    let mut rx = h.bus.subscribe();
    h.source.add_transfer("w1", "sig-live", 1_000_000, 1_100_000);

    h.monitor.run_cycle().await.unwrap();

    match rx.recv().await.unwrap() {
        WsMessage::NewTransaction(tx) => {
            assert_eq!(tx.signature, "sig-live");
            assert_eq!(tx.kind, TransferKind::Buy);
        }
        other => panic!("expected new transaction event, got {}", other.kind()),
    }
}

#[tokio::test]
async fn test_activity_bookkeeping_failure_keeps_transaction() {
    let flaky = FlakyStore::new();
    let h = harness_on(flaky.inner.clone(), flaky.clone());
    discover(&h, &[("w1", 1_000_000)]).await;
    let mut rx = h.bus.subscribe();
    h.source.add_transfer("w1", "sig-kept", 1_000_000, 1_100_000);
    flaky.fail_activity.store(true, Ordering::SeqCst);

    let summary = h.monitor.run_cycle().await.unwrap();

    assert_eq!(summary.new_transactions, 1);
    assert_eq!(summary.whale_errors, 0);
    assert_eq!(h.memory.transaction_count().await, 1);
    match rx.recv().await.unwrap() {
        WsMessage::NewTransaction(tx) => assert_eq!(tx.signature, "sig-kept"),
        other => panic!("expected new transaction event, got {}", other.kind()),
    }

    // The record already stands, so the next pass sees it as known.
    flaky.fail_activity.store(false, Ordering::SeqCst);
    let again = h.monitor.run_cycle().await.unwrap();
    assert_eq!(again.new_transactions, 0);
    assert_eq!(h.memory.transaction_count().await, 1);
}
