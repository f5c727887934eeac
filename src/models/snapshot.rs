use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{TransactionRecord, WhaleAccount};

/// Point-in-time view of market state for one evaluation cycle. Built fresh
/// each cycle and never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct MarketSnapshot {
    pub taken_at: DateTime<Utc>,
    /// Top active whales by balance.
    pub whales: Vec<WhaleAccount>,
    /// Every transaction with `block_time` inside the trailing 24h window.
    pub transactions: Vec<TransactionRecord>,
    pub metrics: SnapshotMetrics,
}

/// The scalar part of a snapshot. This is what trigger records and
/// notification channels receive as context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetrics {
    /// `None` when no price could be obtained; price conditions then fail.
    pub price: Option<Decimal>,
    pub volume_24h: Decimal,
    pub avg_transaction_size: Decimal,
    pub whale_count: i64,
    pub transaction_count: i64,
    pub buy_count: i64,
    pub sell_count: i64,
    pub distribution_score: Decimal,
}

/// Whale concentration metrics broadcast to live subscribers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WhaleMetrics {
    pub total_balance: Decimal,
    pub total_whales: i64,
    pub avg_balance: Decimal,
    pub top_whale_balance: Decimal,
    pub distribution_score: Decimal,
}
