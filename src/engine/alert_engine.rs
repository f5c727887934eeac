use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use metrics::{counter, histogram};
use serde::Serialize;
use serde_json::json;

use super::rules::{alert_message, conditions_match};
use super::snapshot::MarketAggregator;
use crate::api::ws_types::{AlertTriggeredData, WsMessage};
use crate::bus::EventBus;
use crate::config::EngineConfig;
use crate::db::Store;
use crate::models::{AlertDefinition, AlertTrigger, MarketSnapshot, NewTrigger};
use crate::notify::Dispatcher;

#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleSummary {
    pub evaluated: usize,
    pub triggered: usize,
    /// Triggers recorded with `success = false`.
    pub degraded: usize,
}

/// Evaluates every active alert against one snapshot per cycle.
///
/// The engine only reads the registry; its writes are limited to trigger
/// records and the alert counters they bump.
pub struct AlertEngine {
    store: Arc<dyn Store>,
    aggregator: MarketAggregator,
    dispatcher: Arc<Dispatcher>,
    bus: EventBus,
    config: EngineConfig,
}

impl AlertEngine {
    pub fn new(
        store: Arc<dyn Store>,
        aggregator: MarketAggregator,
        dispatcher: Arc<Dispatcher>,
        bus: EventBus,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            aggregator,
            dispatcher,
            bus,
            config,
        }
    }

    pub async fn run_cycle(&self) -> anyhow::Result<CycleSummary> {
        let started = Instant::now();
        let alerts = self.store.active_alerts().await?;
        let mut summary = CycleSummary {
            evaluated: alerts.len(),
            ..Default::default()
        };
        if alerts.is_empty() {
            return Ok(summary);
        }

        let snapshot = self.aggregator.snapshot(Utc::now()).await?;

        for alert in &alerts {
            if !conditions_match(&alert.conditions, &snapshot) {
                continue;
            }

            match self.trigger(alert, &snapshot).await {
                Ok(trigger) => {
                    summary.triggered += 1;
                    if !trigger.success {
                        summary.degraded += 1;
                    }
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        alert_id = %alert.id,
                        "Failed to record alert trigger"
                    );
                }
            }
        }

        histogram!("alert_cycle_seconds").record(started.elapsed().as_secs_f64());
        tracing::debug!(
            evaluated = summary.evaluated,
            triggered = summary.triggered,
            degraded = summary.degraded,
            "Alert cycle complete"
        );

        Ok(summary)
    }

    async fn trigger(
        &self,
        alert: &AlertDefinition,
        snapshot: &MarketSnapshot,
    ) -> anyhow::Result<AlertTrigger> {
        let message = alert_message(
            &alert.name,
            &alert.conditions,
            snapshot,
            &self.config.token_symbol,
        );

        // Recorded before sending; a failed write sends nothing.
        let mut trigger = self
            .store
            .record_trigger(&NewTrigger {
                alert_id: alert.id,
                triggered_at: Utc::now(),
                conditions: alert.conditions.0.clone(),
                data: json!({ "metrics": snapshot.metrics }),
                message: message.clone(),
                success: true,
            })
            .await?;
        counter!("alerts_triggered_total").increment(1);

        let report = self
            .dispatcher
            .dispatch(&alert.actions, &message, &snapshot.metrics)
            .await;
        let success = report.is_success();
        let delivery = json!(report);

        if let Err(e) = self
            .store
            .finalize_trigger(trigger.id, success, &delivery)
            .await
        {
            tracing::warn!(
                error = %e,
                trigger_id = %trigger.id,
                "Failed to record delivery outcome"
            );
        }
        trigger.success = success;
        if let Some(data) = trigger.data.0.as_object_mut() {
            data.insert("delivery".into(), delivery);
        }

        tracing::info!(
            alert_id = %alert.id,
            alert = %alert.name,
            success,
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            "Alert triggered"
        );

        self.bus.publish(WsMessage::AlertTriggered(AlertTriggeredData {
            alert_id: alert.id,
            alert_name: alert.name.clone(),
            message,
            timestamp: trigger.triggered_at,
            success,
        }));

        Ok(trigger)
    }
}
