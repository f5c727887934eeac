use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row for the whales table. Whales are never hard-deleted;
/// `is_active = false` marks an address that fell below the threshold.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WhaleAccount {
    pub id: Uuid,
    pub address: String,
    pub balance: Decimal,
    pub balance_usd: Option<Decimal>,
    pub change_24h: Decimal,
    pub transaction_count_24h: i32,
    pub last_activity: Option<DateTime<Utc>>,
    pub first_seen: DateTime<Utc>,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate balance figures over the active whale set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct WhaleStats {
    pub whale_count: i64,
    pub total_balance: Decimal,
    pub top_balance: Decimal,
}

impl WhaleStats {
    pub fn avg_balance(&self) -> Decimal {
        if self.whale_count == 0 {
            return Decimal::ZERO;
        }
        self.total_balance / Decimal::from(self.whale_count)
    }
}
