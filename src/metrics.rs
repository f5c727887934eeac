use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus exporter and register all application metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus recorder: {e}"))?;

    // Pre-register counters so they appear even before the first increment.
    counter!("whales_discovered_total").absolute(0);
    counter!("whales_deactivated_total").absolute(0);
    counter!("whale_transactions_total").absolute(0);
    counter!("duplicate_transactions_total").absolute(0);
    counter!("alerts_triggered_total").absolute(0);
    counter!("notifications_sent_total").absolute(0);
    counter!("notifications_failed_total").absolute(0);
    counter!("source_errors_total").absolute(0);
    counter!("cycles_skipped_total").absolute(0);

    gauge!("active_whales").set(0.0);
    gauge!("token_price_usd").set(0.0);
    gauge!("volume_24h_usd").set(0.0);

    // Histograms are lazily created on first record; force creation.
    histogram!("cycle_duration_seconds").record(0.0);
    histogram!("alert_cycle_seconds").record(0.0);
    histogram!("discovery_cycle_seconds").record(0.0);
    histogram!("monitor_cycle_seconds").record(0.0);

    Ok(handle)
}
