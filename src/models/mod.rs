pub mod alert;
pub mod chain;
pub mod snapshot;
pub mod transaction;
pub mod whale;

pub use alert::{
    AlertCondition, AlertDefinition, AlertTrigger, AlertUpdate, ConditionKind, NewAlert,
    NewTrigger, Operator,
};
pub use chain::{HolderAccount, ParsedTransaction, TokenBalance};
pub use snapshot::{MarketSnapshot, SnapshotMetrics, WhaleMetrics};
pub use transaction::{ActivityStats, InsertOutcome, NewTransaction, TransactionRecord};
pub use whale::{WhaleAccount, WhaleStats};

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// TransferKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum TransferKind {
    Buy,
    Sell,
    Transfer,
}

impl TransferKind {
    pub fn from_api_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "buy" => Some(TransferKind::Buy),
            "sell" => Some(TransferKind::Sell),
            "transfer" => Some(TransferKind::Transfer),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferKind::Buy => "buy",
            TransferKind::Sell => "sell",
            TransferKind::Transfer => "transfer",
        }
    }
}

impl fmt::Display for TransferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Timeframe: trailing windows accepted by the stats endpoints
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "24h")]
    OneDay,
    #[serde(rename = "7d")]
    SevenDays,
}

impl Timeframe {
    /// Unrecognized values fall back to 24h.
    pub fn parse(s: &str) -> Self {
        match s {
            "1h" => Timeframe::OneHour,
            "7d" => Timeframe::SevenDays,
            _ => Timeframe::OneDay,
        }
    }

    pub fn duration(&self) -> chrono::Duration {
        match self {
            Timeframe::OneHour => chrono::Duration::hours(1),
            Timeframe::OneDay => chrono::Duration::hours(24),
            Timeframe::SevenDays => chrono::Duration::days(7),
        }
    }
}
