use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A token holder as reported by the data source, balances of all the
/// owner's token accounts for the mint summed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolderAccount {
    pub address: String,
    pub balance: Decimal,
}

/// One entry of a transaction's pre- or post-token-balance list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenBalance {
    pub account_index: u32,
    pub mint: String,
    pub owner: Option<String>,
    /// UI amount (already scaled by the mint's decimals).
    pub amount: Decimal,
}

/// The subset of a parsed on-chain transaction the classifier needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedTransaction {
    pub signature: String,
    pub slot: u64,
    pub block_time: Option<DateTime<Utc>>,
    pub fee_lamports: Option<u64>,
    /// True when the transaction landed but its execution failed.
    pub failed: bool,
    pub pre_token_balances: Vec<TokenBalance>,
    pub post_token_balances: Vec<TokenBalance>,
}
