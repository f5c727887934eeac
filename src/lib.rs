pub mod api;
pub mod bus;
pub mod config;
pub mod db;
pub mod engine;
pub mod errors;
pub mod ingestion;
pub mod metrics;
pub mod models;
pub mod notify;
pub mod scheduler;
pub mod solana;

use std::sync::Arc;

use crate::bus::EventBus;
use crate::config::AppConfig;
use crate::db::Store;
use crate::engine::MarketAggregator;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: AppConfig,
    pub bus: EventBus,
    pub aggregator: MarketAggregator,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}
