use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, TransactionFilter, WhaleUpsert};
use crate::models::{
    AlertDefinition, AlertTrigger, AlertUpdate, InsertOutcome, NewAlert, NewTransaction,
    NewTrigger, TransactionRecord, WhaleAccount, WhaleStats,
};

/// Process-local store used when no DATABASE_URL is configured, and by tests.
/// Mirrors the Postgres constraints: unique signatures, transactions must
/// reference a known whale, trigger writes bump the alert atomically.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<State>,
}

#[derive(Default)]
struct State {
    whales: HashMap<String, WhaleAccount>,
    transactions: HashMap<String, TransactionRecord>,
    alerts: HashMap<Uuid, AlertDefinition>,
    triggers: Vec<AlertTrigger>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn transaction_count(&self) -> usize {
        self.inner.read().await.transactions.len()
    }

    pub async fn trigger_count(&self) -> usize {
        self.inner.read().await.triggers.len()
    }
}

fn by_balance_desc(a: &WhaleAccount, b: &WhaleAccount) -> std::cmp::Ordering {
    b.balance.cmp(&a.balance).then_with(|| a.address.cmp(&b.address))
}

fn page<T>(items: Vec<T>, limit: i64, offset: i64) -> Vec<T> {
    items
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn get_whale(&self, address: &str) -> anyhow::Result<Option<WhaleAccount>> {
        Ok(self.inner.read().await.whales.get(address).cloned())
    }

    async fn insert_whale(&self, whale: &WhaleUpsert) -> anyhow::Result<WhaleAccount> {
        let mut state = self.inner.write().await;
        let now = Utc::now();

        let row = state
            .whales
            .entry(whale.address.clone())
            .and_modify(|w| {
                w.balance = whale.balance;
                w.balance_usd = whale.balance_usd;
                w.is_active = true;
                w.updated_at = now;
            })
            .or_insert_with(|| WhaleAccount {
                id: Uuid::new_v4(),
                address: whale.address.clone(),
                balance: whale.balance,
                balance_usd: whale.balance_usd,
                change_24h: Decimal::ZERO,
                transaction_count_24h: 0,
                last_activity: Some(whale.seen_at),
                first_seen: whale.seen_at,
                is_active: true,
                updated_at: now,
            });

        Ok(row.clone())
    }

    async fn update_whale(
        &self,
        whale: &WhaleUpsert,
        change_24h: Decimal,
    ) -> anyhow::Result<WhaleAccount> {
        let mut state = self.inner.write().await;
        let row = state
            .whales
            .get_mut(&whale.address)
            .ok_or_else(|| anyhow::anyhow!("whale {} not found", whale.address))?;

        row.balance = whale.balance;
        row.balance_usd = whale.balance_usd;
        row.change_24h = change_24h;
        row.is_active = true;
        row.updated_at = Utc::now();

        Ok(row.clone())
    }

    async fn deactivate_whales_except(&self, keep: &[String]) -> anyhow::Result<u64> {
        let keep: HashSet<&str> = keep.iter().map(String::as_str).collect();
        let mut state = self.inner.write().await;
        let now = Utc::now();
        let mut count = 0;

        for whale in state.whales.values_mut() {
            if whale.is_active && !keep.contains(whale.address.as_str()) {
                whale.is_active = false;
                whale.updated_at = now;
                count += 1;
            }
        }

        Ok(count)
    }

    async fn record_whale_activity(
        &self,
        address: &str,
        at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut state = self.inner.write().await;
        if let Some(whale) = state.whales.get_mut(address) {
            whale.transaction_count_24h += 1;
            whale.last_activity = Some(whale.last_activity.map_or(at, |prev| prev.max(at)));
            whale.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn top_whales(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<WhaleAccount>> {
        let state = self.inner.read().await;
        let mut whales: Vec<WhaleAccount> =
            state.whales.values().filter(|w| w.is_active).cloned().collect();
        whales.sort_by(by_balance_desc);
        Ok(page(whales, limit, offset))
    }

    async fn whale_stats(&self) -> anyhow::Result<WhaleStats> {
        let state = self.inner.read().await;
        let active = state.whales.values().filter(|w| w.is_active);

        let mut stats = WhaleStats::default();
        for whale in active {
            stats.whale_count += 1;
            stats.total_balance += whale.balance;
            stats.top_balance = stats.top_balance.max(whale.balance);
        }
        Ok(stats)
    }

    async fn known_signatures(&self, signatures: &[String]) -> anyhow::Result<HashSet<String>> {
        let state = self.inner.read().await;
        Ok(signatures
            .iter()
            .filter(|s| state.transactions.contains_key(s.as_str()))
            .cloned()
            .collect())
    }

    async fn insert_transaction(
        &self,
        tx: &NewTransaction,
    ) -> anyhow::Result<InsertOutcome<TransactionRecord>> {
        let mut state = self.inner.write().await;

        if state.transactions.contains_key(&tx.signature) {
            return Ok(InsertOutcome::Duplicate);
        }
        if !state.whales.contains_key(&tx.whale_address) {
            anyhow::bail!("transaction references unknown whale {}", tx.whale_address);
        }

        let record = TransactionRecord {
            id: Uuid::new_v4(),
            signature: tx.signature.clone(),
            whale_address: tx.whale_address.clone(),
            kind: tx.kind,
            amount: tx.amount,
            price: tx.price,
            value_usd: tx.value_usd(),
            block_time: tx.block_time,
            slot: tx.slot,
            fee_lamports: tx.fee_lamports,
            created_at: Utc::now(),
        };
        state
            .transactions
            .insert(record.signature.clone(), record.clone());

        Ok(InsertOutcome::Inserted(record))
    }

    async fn transactions_since(
        &self,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<TransactionRecord>> {
        let state = self.inner.read().await;
        let mut rows: Vec<TransactionRecord> = state
            .transactions
            .values()
            .filter(|t| t.block_time >= since)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.block_time.cmp(&a.block_time));
        Ok(rows)
    }

    async fn recent_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> anyhow::Result<Vec<TransactionRecord>> {
        let state = self.inner.read().await;
        let mut rows: Vec<TransactionRecord> = state
            .transactions
            .values()
            .filter(|t| {
                filter
                    .whale_address
                    .as_deref()
                    .map_or(true, |a| t.whale_address == a)
            })
            .filter(|t| filter.kind.map_or(true, |k| t.kind == k))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.block_time.cmp(&a.block_time));
        Ok(page(rows, filter.limit, filter.offset))
    }

    async fn list_alerts(&self) -> anyhow::Result<Vec<AlertDefinition>> {
        let state = self.inner.read().await;
        let mut alerts: Vec<AlertDefinition> = state.alerts.values().cloned().collect();
        alerts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(alerts)
    }

    async fn active_alerts(&self) -> anyhow::Result<Vec<AlertDefinition>> {
        let mut alerts = self.list_alerts().await?;
        alerts.retain(|a| a.is_active);
        Ok(alerts)
    }

    async fn get_alert(&self, id: Uuid) -> anyhow::Result<Option<AlertDefinition>> {
        Ok(self.inner.read().await.alerts.get(&id).cloned())
    }

    async fn create_alert(&self, alert: &NewAlert) -> anyhow::Result<AlertDefinition> {
        let now = Utc::now();
        let row = AlertDefinition {
            id: Uuid::new_v4(),
            name: alert.name.trim().to_string(),
            description: alert.description.clone(),
            conditions: Json(alert.conditions.clone()),
            actions: Json(alert.actions.clone()),
            is_active: alert.is_active,
            triggered_count: 0,
            last_triggered: None,
            created_at: now,
            updated_at: now,
        };

        self.inner.write().await.alerts.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_alert(
        &self,
        id: Uuid,
        update: &AlertUpdate,
    ) -> anyhow::Result<Option<AlertDefinition>> {
        let mut state = self.inner.write().await;
        let Some(alert) = state.alerts.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(name) = &update.name {
            alert.name = name.trim().to_string();
        }
        if let Some(description) = &update.description {
            alert.description = Some(description.clone());
        }
        if let Some(conditions) = &update.conditions {
            alert.conditions = Json(conditions.clone());
        }
        if let Some(actions) = &update.actions {
            alert.actions = Json(actions.clone());
        }
        if let Some(is_active) = update.is_active {
            alert.is_active = is_active;
        }
        alert.updated_at = Utc::now();

        Ok(Some(alert.clone()))
    }

    async fn record_trigger(&self, trigger: &NewTrigger) -> anyhow::Result<AlertTrigger> {
        let mut state = self.inner.write().await;
        let alert = state
            .alerts
            .get_mut(&trigger.alert_id)
            .ok_or_else(|| anyhow::anyhow!("alert {} not found", trigger.alert_id))?;

        alert.triggered_count += 1;
        alert.last_triggered = Some(trigger.triggered_at);

        let row = AlertTrigger {
            id: Uuid::new_v4(),
            alert_id: trigger.alert_id,
            triggered_at: trigger.triggered_at,
            conditions: Json(trigger.conditions.clone()),
            data: Json(trigger.data.clone()),
            message: trigger.message.clone(),
            success: trigger.success,
        };
        state.triggers.push(row.clone());

        Ok(row)
    }

    async fn finalize_trigger(
        &self,
        id: Uuid,
        success: bool,
        delivery: &serde_json::Value,
    ) -> anyhow::Result<bool> {
        let mut state = self.inner.write().await;
        let row = state
            .triggers
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| anyhow::anyhow!("trigger {id} not found"))?;

        let Some(data) = row.data.0.as_object_mut() else {
            anyhow::bail!("trigger {id} data is not an object");
        };
        if data.contains_key("delivery") {
            return Ok(false);
        }
        data.insert("delivery".into(), delivery.clone());
        row.success = success;

        Ok(true)
    }

    async fn triggers_for_alert(
        &self,
        alert_id: Uuid,
        limit: i64,
    ) -> anyhow::Result<Vec<AlertTrigger>> {
        let state = self.inner.read().await;
        let mut rows: Vec<AlertTrigger> = state
            .triggers
            .iter()
            .filter(|t| t.alert_id == alert_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.triggered_at.cmp(&a.triggered_at));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertCondition, ConditionKind, Operator, TransferKind};

    fn upsert(address: &str, balance: i64) -> WhaleUpsert {
        WhaleUpsert {
            address: address.to_string(),
            balance: Decimal::from(balance),
            balance_usd: None,
            seen_at: Utc::now(),
        }
    }

    fn new_tx(signature: &str, whale: &str) -> NewTransaction {
        NewTransaction {
            signature: signature.to_string(),
            whale_address: whale.to_string(),
            kind: TransferKind::Buy,
            amount: Decimal::from(20_000),
            price: Some(Decimal::new(5, 1)),
            block_time: Utc::now(),
            slot: 1,
            fee_lamports: Some(5_000),
        }
    }

    #[tokio::test]
    async fn test_duplicate_signature_is_not_an_error() {
        let store = MemoryStore::new();
        store.insert_whale(&upsert("w1", 200_000)).await.unwrap();

        let first = store.insert_transaction(&new_tx("sig1", "w1")).await.unwrap();
        let second = store.insert_transaction(&new_tx("sig1", "w1")).await.unwrap();

        assert!(matches!(first, InsertOutcome::Inserted(_)));
        assert!(matches!(second, InsertOutcome::Duplicate));
        assert_eq!(store.transaction_count().await, 1);
    }

    #[tokio::test]
    async fn test_transaction_requires_known_whale() {
        let store = MemoryStore::new();
        assert!(store.insert_transaction(&new_tx("sig1", "ghost")).await.is_err());
    }

    #[tokio::test]
    async fn test_deactivate_and_reactivate() {
        let store = MemoryStore::new();
        store.insert_whale(&upsert("w1", 200_000)).await.unwrap();
        store.insert_whale(&upsert("w2", 300_000)).await.unwrap();

        let n = store.deactivate_whales_except(&["w2".to_string()]).await.unwrap();
        assert_eq!(n, 1);
        assert_eq!(store.top_whales(10, 0).await.unwrap().len(), 1);

        store.update_whale(&upsert("w1", 250_000), Decimal::from(25)).await.unwrap();
        let top = store.top_whales(10, 0).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].address, "w2");
    }

    #[tokio::test]
    async fn test_record_trigger_bumps_alert() {
        let store = MemoryStore::new();
        let alert = store
            .create_alert(&NewAlert {
                name: "Volume spike".into(),
                description: None,
                conditions: vec![AlertCondition::new(
                    ConditionKind::Volume,
                    Operator::Gt,
                    Decimal::from(500_000),
                )],
                actions: vec!["discord".into()],
                is_active: true,
            })
            .await
            .unwrap();

        let at = Utc::now();
        store
            .record_trigger(&NewTrigger {
                alert_id: alert.id,
                triggered_at: at,
                conditions: alert.conditions.0.clone(),
                data: serde_json::json!({}),
                message: "fired".into(),
                success: true,
            })
            .await
            .unwrap();

        let reloaded = store.get_alert(alert.id).await.unwrap().unwrap();
        assert_eq!(reloaded.triggered_count, 1);
        assert_eq!(reloaded.last_triggered, Some(at));
        assert_eq!(store.triggers_for_alert(alert.id, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_finalize_trigger_applies_once() {
        let store = MemoryStore::new();
        let trigger = store
            .record_trigger(&NewTrigger {
                alert_id: Uuid::new_v4(),
                triggered_at: Utc::now(),
                conditions: vec![],
                data: serde_json::json!({ "metrics": {} }),
                message: "fired".into(),
                success: true,
            })
            .await
            .unwrap();

        let first = serde_json::json!({ "failed": ["discord"] });
        assert!(store.finalize_trigger(trigger.id, false, &first).await.unwrap());
        let second = serde_json::json!({ "delivered": ["discord"] });
        assert!(!store.finalize_trigger(trigger.id, true, &second).await.unwrap());

        let stored = &store.triggers_for_alert(trigger.alert_id, 10).await.unwrap()[0];
        assert!(!stored.success);
        assert_eq!(stored.data.0["delivery"], first);
        assert!(stored.data.0.get("metrics").is_some());

        assert!(store
            .finalize_trigger(Uuid::new_v4(), true, &first)
            .await
            .is_err());
    }
}
