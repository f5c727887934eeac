pub mod alert_repo;
pub mod memory;
pub mod transaction_repo;
pub mod whale_repo;

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    AlertDefinition, AlertTrigger, AlertUpdate, InsertOutcome, NewAlert, NewTransaction,
    NewTrigger, TransactionRecord, TransferKind, WhaleAccount, WhaleStats,
};

pub use memory::MemoryStore;

pub async fn init_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    // Verify connectivity
    sqlx::query("SELECT 1").execute(&pool).await?;

    Ok(pool)
}

// ---------------------------------------------------------------------------
// Write/query payloads
// ---------------------------------------------------------------------------

/// Balance observation for one holder, as produced by a discovery cycle.
#[derive(Debug, Clone)]
pub struct WhaleUpsert {
    pub address: String,
    pub balance: Decimal,
    pub balance_usd: Option<Decimal>,
    pub seen_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TransactionFilter {
    pub whale_address: Option<String>,
    pub kind: Option<TransferKind>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for TransactionFilter {
    fn default() -> Self {
        Self {
            whale_address: None,
            kind: None,
            limit: 50,
            offset: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Persistence boundary shared by the background loops and the HTTP API.
#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> anyhow::Result<()>;

    async fn get_whale(&self, address: &str) -> anyhow::Result<Option<WhaleAccount>>;
    async fn insert_whale(&self, whale: &WhaleUpsert) -> anyhow::Result<WhaleAccount>;
    async fn update_whale(
        &self,
        whale: &WhaleUpsert,
        change_24h: Decimal,
    ) -> anyhow::Result<WhaleAccount>;
    async fn deactivate_whales_except(&self, keep: &[String]) -> anyhow::Result<u64>;
    async fn record_whale_activity(&self, address: &str, at: DateTime<Utc>)
        -> anyhow::Result<()>;
    async fn top_whales(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<WhaleAccount>>;
    async fn whale_stats(&self) -> anyhow::Result<WhaleStats>;

    async fn known_signatures(&self, signatures: &[String]) -> anyhow::Result<HashSet<String>>;
    async fn insert_transaction(
        &self,
        tx: &NewTransaction,
    ) -> anyhow::Result<InsertOutcome<TransactionRecord>>;
    async fn transactions_since(
        &self,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<TransactionRecord>>;
    async fn recent_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> anyhow::Result<Vec<TransactionRecord>>;

    async fn list_alerts(&self) -> anyhow::Result<Vec<AlertDefinition>>;
    async fn active_alerts(&self) -> anyhow::Result<Vec<AlertDefinition>>;
    async fn get_alert(&self, id: Uuid) -> anyhow::Result<Option<AlertDefinition>>;
    async fn create_alert(&self, alert: &NewAlert) -> anyhow::Result<AlertDefinition>;
    async fn update_alert(
        &self,
        id: Uuid,
        update: &AlertUpdate,
    ) -> anyhow::Result<Option<AlertDefinition>>;
    /// Append a trigger and bump the alert's `triggered_count`/`last_triggered`
    /// atomically.
    async fn record_trigger(&self, trigger: &NewTrigger) -> anyhow::Result<AlertTrigger>;
    /// One-time follow-up on a trigger: store the delivery report under
    /// `data.delivery` and set `success`. Returns false when the trigger was
    /// already finalized.
    async fn finalize_trigger(
        &self,
        id: Uuid,
        success: bool,
        delivery: &serde_json::Value,
    ) -> anyhow::Result<bool>;
    async fn triggers_for_alert(
        &self,
        alert_id: Uuid,
        limit: i64,
    ) -> anyhow::Result<Vec<AlertTrigger>>;
}

// ---------------------------------------------------------------------------
// PgStore
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn get_whale(&self, address: &str) -> anyhow::Result<Option<WhaleAccount>> {
        whale_repo::get_whale_by_address(&self.pool, address).await
    }

    async fn insert_whale(&self, whale: &WhaleUpsert) -> anyhow::Result<WhaleAccount> {
        whale_repo::insert_whale(&self.pool, whale).await
    }

    async fn update_whale(
        &self,
        whale: &WhaleUpsert,
        change_24h: Decimal,
    ) -> anyhow::Result<WhaleAccount> {
        whale_repo::update_whale_balance(&self.pool, whale, change_24h).await
    }

    async fn deactivate_whales_except(&self, keep: &[String]) -> anyhow::Result<u64> {
        whale_repo::deactivate_whales_except(&self.pool, keep).await
    }

    async fn record_whale_activity(
        &self,
        address: &str,
        at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        whale_repo::record_whale_activity(&self.pool, address, at).await
    }

    async fn top_whales(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<WhaleAccount>> {
        whale_repo::get_top_whales(&self.pool, limit, offset).await
    }

    async fn whale_stats(&self) -> anyhow::Result<WhaleStats> {
        whale_repo::get_whale_stats(&self.pool).await
    }

    async fn known_signatures(&self, signatures: &[String]) -> anyhow::Result<HashSet<String>> {
        transaction_repo::get_known_signatures(&self.pool, signatures).await
    }

    async fn insert_transaction(
        &self,
        tx: &NewTransaction,
    ) -> anyhow::Result<InsertOutcome<TransactionRecord>> {
        transaction_repo::insert_transaction(&self.pool, tx).await
    }

    async fn transactions_since(
        &self,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<TransactionRecord>> {
        transaction_repo::get_transactions_since(&self.pool, since).await
    }

    async fn recent_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> anyhow::Result<Vec<TransactionRecord>> {
        transaction_repo::get_recent_transactions(&self.pool, filter).await
    }

    async fn list_alerts(&self) -> anyhow::Result<Vec<AlertDefinition>> {
        alert_repo::get_all_alerts(&self.pool).await
    }

    async fn active_alerts(&self) -> anyhow::Result<Vec<AlertDefinition>> {
        alert_repo::get_active_alerts(&self.pool).await
    }

    async fn get_alert(&self, id: Uuid) -> anyhow::Result<Option<AlertDefinition>> {
        alert_repo::get_alert(&self.pool, id).await
    }

    async fn create_alert(&self, alert: &NewAlert) -> anyhow::Result<AlertDefinition> {
        alert_repo::create_alert(&self.pool, alert).await
    }

    async fn update_alert(
        &self,
        id: Uuid,
        update: &AlertUpdate,
    ) -> anyhow::Result<Option<AlertDefinition>> {
        alert_repo::update_alert(&self.pool, id, update).await
    }

    async fn record_trigger(&self, trigger: &NewTrigger) -> anyhow::Result<AlertTrigger> {
        alert_repo::record_trigger(&self.pool, trigger).await
    }

    async fn finalize_trigger(
        &self,
        id: Uuid,
        success: bool,
        delivery: &serde_json::Value,
    ) -> anyhow::Result<bool> {
        alert_repo::finalize_trigger(&self.pool, id, success, delivery).await
    }

    async fn triggers_for_alert(
        &self,
        alert_id: Uuid,
        limit: i64,
    ) -> anyhow::Result<Vec<AlertTrigger>> {
        alert_repo::get_triggers_for_alert(&self.pool, alert_id, limit).await
    }
}
