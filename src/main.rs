use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use whalewatch::api::router::create_router;
use whalewatch::bus::EventBus;
use whalewatch::config::AppConfig;
use whalewatch::db::{self, MemoryStore, PgStore, Store};
use whalewatch::engine::{self, AlertEngine, MarketAggregator, PriceCache};
use whalewatch::ingestion::{TransactionMonitor, WhaleDiscovery};
use whalewatch::notify::Dispatcher;
use whalewatch::scheduler::run_periodic;
use whalewatch::solana::{MarketDataSource, SolanaRpcClient};
use whalewatch::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    init_tracing(&config.log_format);
    let metrics_handle = whalewatch::metrics::init_metrics()?;
    let addr = format!("{}:{}", config.host, config.port);

    // --- Persistence ---
    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let pool = db::init_pool(url).await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            tracing::info!("Database connected, migrations applied");
            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store (state is lost on restart)");
            Arc::new(MemoryStore::new())
        }
    };

    // --- Data source ---
    let rpc_http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.rpc_timeout_secs))
        .build()?;
    let rpc = SolanaRpcClient::new(
        rpc_http,
        config.solana_rpc_url.clone(),
        config.price_api_url.clone(),
        config.token_mint.clone(),
    );
    match rpc.get_slot().await {
        Ok(slot) => tracing::info!(slot, rpc = %config.solana_rpc_url, "Solana RPC reachable"),
        Err(e) => tracing::warn!(error = %e, "Solana RPC not reachable at startup, loops will retry"),
    }
    let source: Arc<dyn MarketDataSource> = Arc::new(rpc);

    // --- Engine wiring ---
    let bus = EventBus::default();
    let prices = Arc::new(PriceCache::new(source.clone(), config.price_ttl()));
    let engine_config = config.engine();
    let aggregator = MarketAggregator::new(
        store.clone(),
        prices.clone(),
        engine_config.snapshot_whale_limit,
    );

    let notify_http = reqwest::Client::builder()
        .timeout(config.notification_timeout())
        .build()?;
    let dispatcher = Arc::new(Dispatcher::from_config(&config, notify_http));
    tracing::info!(
        channels = ?dispatcher.configured_channels(),
        "Notification channels configured"
    );

    let discovery = Arc::new(WhaleDiscovery::new(
        source.clone(),
        store.clone(),
        prices.clone(),
        bus.clone(),
        config.discovery(),
    ));
    let monitor = Arc::new(TransactionMonitor::new(
        source.clone(),
        store.clone(),
        prices.clone(),
        bus.clone(),
        config.monitor(),
    ));
    let alert_engine = Arc::new(AlertEngine::new(
        store.clone(),
        aggregator.clone(),
        dispatcher,
        bus.clone(),
        engine_config,
    ));

    // --- Periodic tasks ---
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks = Vec::new();

    tasks.push(tokio::spawn(run_periodic(
        "discovery",
        Duration::from_secs(config.discovery_interval_secs),
        shutdown_rx.clone(),
        move || {
            let discovery = discovery.clone();
            async move { discovery.run_cycle().await.map(|_| ()) }
        },
    )));

    tasks.push(tokio::spawn(run_periodic(
        "tx_monitor",
        Duration::from_secs(config.monitor_interval_secs),
        shutdown_rx.clone(),
        move || {
            let monitor = monitor.clone();
            async move { monitor.run_cycle().await.map(|_| ()) }
        },
    )));

    tasks.push(tokio::spawn(run_periodic(
        "alert_engine",
        Duration::from_secs(config.alert_interval_secs),
        shutdown_rx.clone(),
        move || {
            let alert_engine = alert_engine.clone();
            async move { alert_engine.run_cycle().await.map(|_| ()) }
        },
    )));

    tasks.push(tokio::spawn(run_periodic(
        "price_refresh",
        config.price_ttl(),
        shutdown_rx.clone(),
        move || {
            let prices = prices.clone();
            async move {
                prices.refresh().await;
                Ok::<(), anyhow::Error>(())
            }
        },
    )));

    {
        let aggregator = aggregator.clone();
        let bus = bus.clone();
        tasks.push(tokio::spawn(run_periodic(
            "whale_metrics",
            Duration::from_secs(config.metrics_broadcast_secs),
            shutdown_rx.clone(),
            move || {
                let aggregator = aggregator.clone();
                let bus = bus.clone();
                async move { engine::publish_whale_metrics(&aggregator, &bus).await }
            },
        )));
    }

    // --- HTTP server ---
    let state = AppState {
        store,
        config,
        bus,
        aggregator,
        metrics_handle,
    };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await?;

    for task in tasks {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "Periodic task panicked");
        }
    }
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Resolves on Ctrl-C and tells every periodic task to stop.
async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping periodic tasks");
    let _ = shutdown_tx.send(true);
}

fn init_tracing(format: &str) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if format.eq_ignore_ascii_case("json") {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
