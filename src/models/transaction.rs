use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::TransferKind;

/// Database row for the transactions table. Write-once: a record is never
/// re-classified or updated after insert.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub signature: String,
    pub whale_address: String,
    #[serde(rename = "type")]
    pub kind: TransferKind,
    pub amount: Decimal,
    pub price: Option<Decimal>,
    pub value_usd: Option<Decimal>,
    pub block_time: DateTime<Utc>,
    pub slot: i64,
    pub fee_lamports: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a classified transfer.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub signature: String,
    pub whale_address: String,
    pub kind: TransferKind,
    pub amount: Decimal,
    pub price: Option<Decimal>,
    pub block_time: DateTime<Utc>,
    pub slot: i64,
    pub fee_lamports: Option<i64>,
}

impl NewTransaction {
    pub fn value_usd(&self) -> Option<Decimal> {
        self.price.map(|p| self.amount * p)
    }
}

/// Result of a dedup-guarded insert. A uniqueness violation is an expected
/// outcome ("already processed"), not an error.
#[derive(Debug, Clone)]
pub enum InsertOutcome<T> {
    Inserted(T),
    Duplicate,
}

impl<T> InsertOutcome<T> {
    pub fn inserted(self) -> Option<T> {
        match self {
            InsertOutcome::Inserted(v) => Some(v),
            InsertOutcome::Duplicate => None,
        }
    }
}

/// Aggregated activity over a trailing window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityStats {
    pub total_transactions: i64,
    pub total_volume: Decimal,
    pub buy_transactions: i64,
    pub sell_transactions: i64,
    pub avg_transaction_size: Decimal,
}

impl ActivityStats {
    pub fn from_records(records: &[TransactionRecord]) -> Self {
        let total_volume: Decimal = records.iter().filter_map(|t| t.value_usd).sum();
        let total_amount: Decimal = records.iter().map(|t| t.amount).sum();
        let avg_transaction_size = if records.is_empty() {
            Decimal::ZERO
        } else {
            total_amount / Decimal::from(records.len() as i64)
        };

        Self {
            total_transactions: records.len() as i64,
            total_volume,
            buy_transactions: records.iter().filter(|t| t.kind == TransferKind::Buy).count() as i64,
            sell_transactions: records.iter().filter(|t| t.kind == TransferKind::Sell).count() as i64,
            avg_transaction_size,
        }
    }
}
