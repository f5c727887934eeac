pub mod rpc_client;
pub mod types;

pub use rpc_client::SolanaRpcClient;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{HolderAccount, ParsedTransaction};

/// SPL Token program that owns every classic token account.
pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

#[derive(Debug, Error)]
pub enum SourceError {
    /// Network failure or timeout. Retried on the next cycle.
    #[error("data source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            SourceError::Malformed(e.to_string())
        } else {
            SourceError::SourceUnavailable(e.to_string())
        }
    }
}

/// Read-only view of the chain and the price feed. Implementations bound
/// every call by a timeout; retry policy belongs to the caller.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Holders of `mint` whose balance is at least `min_balance`.
    async fn list_holder_accounts(
        &self,
        mint: &str,
        min_balance: Decimal,
    ) -> Result<Vec<HolderAccount>, SourceError>;

    /// Most recent signatures involving `address`, newest first.
    async fn list_recent_signatures(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<String>, SourceError>;

    /// `Ok(None)` when the source has no (parsed) record of the signature.
    async fn get_transaction(
        &self,
        signature: &str,
    ) -> Result<Option<ParsedTransaction>, SourceError>;

    async fn get_current_price(&self) -> Result<Decimal, SourceError>;
}
