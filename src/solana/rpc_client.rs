use std::collections::HashMap;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::{Client, Url};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::json;

use super::types::{
    AccountData, PriceResponse, ProgramAccount, RpcResponse, RpcTokenBalance, RpcTransaction,
    SignatureInfo,
};
use super::{MarketDataSource, SourceError, TOKEN_PROGRAM_ID};
use crate::models::{HolderAccount, ParsedTransaction, TokenBalance};

/// Size in bytes of an SPL token account.
const TOKEN_ACCOUNT_SIZE: u64 = 165;

/// JSON-RPC client for a Solana node plus an HTTP price feed.
///
/// The timeout bound lives on the `reqwest::Client` handed in by the caller.
#[derive(Debug, Clone)]
pub struct SolanaRpcClient {
    http: Client,
    rpc_url: String,
    price_url: String,
    mint: String,
}

impl SolanaRpcClient {
    pub fn new(http: Client, rpc_url: String, price_url: String, mint: String) -> Self {
        Self {
            http,
            rpc_url,
            price_url,
            mint,
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<Option<T>, SourceError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let resp: RpcResponse<T> = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = resp.error {
            return Err(SourceError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        Ok(resp.result)
    }

    /// `<price_url>?ids=<mint>`
    fn price_request_url(&self) -> Result<Url, SourceError> {
        Url::parse_with_params(&self.price_url, &[("ids", self.mint.as_str())])
            .map_err(|e| SourceError::Malformed(format!("invalid price url {}: {e}", self.price_url)))
    }

    /// Cheap connectivity check, run once at startup.
    pub async fn get_slot(&self) -> Result<u64, SourceError> {
        self.call::<u64>("getSlot", json!([]))
            .await?
            .ok_or_else(|| SourceError::Malformed("getSlot returned no result".into()))
    }
}

#[async_trait]
impl MarketDataSource for SolanaRpcClient {
    async fn list_holder_accounts(
        &self,
        mint: &str,
        min_balance: Decimal,
    ) -> Result<Vec<HolderAccount>, SourceError> {
        let params = json!([
            TOKEN_PROGRAM_ID,
            {
                "encoding": "jsonParsed",
                "commitment": "confirmed",
                "filters": [
                    { "dataSize": TOKEN_ACCOUNT_SIZE },
                    { "memcmp": { "offset": 0, "bytes": mint } }
                ]
            }
        ]);

        let accounts: Vec<ProgramAccount> = self
            .call("getProgramAccounts", params)
            .await?
            .unwrap_or_default();

        let total_accounts = accounts.len();
        let holders = aggregate_holders(accounts, mint, min_balance);

        tracing::debug!(
            total_accounts,
            qualifying = holders.len(),
            "Fetched token holder accounts"
        );

        Ok(holders)
    }

    async fn list_recent_signatures(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<String>, SourceError> {
        let sigs: Vec<SignatureInfo> = self
            .call(
                "getSignaturesForAddress",
                json!([address, { "limit": limit, "commitment": "confirmed" }]),
            )
            .await?
            .unwrap_or_default();

        Ok(sigs.into_iter().map(|s| s.signature).collect())
    }

    async fn get_transaction(
        &self,
        signature: &str,
    ) -> Result<Option<ParsedTransaction>, SourceError> {
        let tx: Option<RpcTransaction> = self
            .call(
                "getTransaction",
                json!([
                    signature,
                    {
                        "encoding": "jsonParsed",
                        "commitment": "confirmed",
                        "maxSupportedTransactionVersion": 0
                    }
                ]),
            )
            .await?;

        Ok(tx.map(|tx| into_parsed_transaction(signature, tx)))
    }

    async fn get_current_price(&self) -> Result<Decimal, SourceError> {
        let resp: PriceResponse = self
            .http
            .get(self.price_request_url()?)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        resp.data
            .get(&self.mint)
            .and_then(|entry| entry.as_ref())
            .map(|entry| entry.price)
            .ok_or_else(|| SourceError::Malformed(format!("no price for mint {}", self.mint)))
    }
}

/// Sum token-account balances per owner and keep owners at or above
/// `min_balance`. Accounts without parsed data are skipped.
fn aggregate_holders(
    accounts: Vec<ProgramAccount>,
    mint: &str,
    min_balance: Decimal,
) -> Vec<HolderAccount> {
    let mut by_owner: HashMap<String, Decimal> = HashMap::new();

    for account in accounts {
        let info = match account.account.data {
            AccountData::Parsed(parsed) => parsed.parsed.info,
            AccountData::Raw(_) => {
                tracing::debug!(pubkey = %account.pubkey, "Skipping unparsed token account");
                continue;
            }
        };

        if info.mint != mint {
            continue;
        }

        let Some(balance) = info.token_amount.to_decimal() else {
            tracing::debug!(pubkey = %account.pubkey, "Skipping token account with unreadable amount");
            continue;
        };

        *by_owner.entry(info.owner).or_insert(Decimal::ZERO) += balance;
    }

    let mut holders: Vec<HolderAccount> = by_owner
        .into_iter()
        .filter(|(_, balance)| *balance >= min_balance)
        .map(|(address, balance)| HolderAccount { address, balance })
        .collect();

    holders.sort_by(|a, b| b.balance.cmp(&a.balance));
    holders
}

fn into_parsed_transaction(signature: &str, tx: RpcTransaction) -> ParsedTransaction {
    let (failed, fee, pre, post) = match tx.meta {
        Some(meta) => (
            meta.err.map(|e| !e.is_null()).unwrap_or(false),
            meta.fee,
            meta.pre_token_balances.unwrap_or_default(),
            meta.post_token_balances.unwrap_or_default(),
        ),
        None => (false, None, Vec::new(), Vec::new()),
    };

    ParsedTransaction {
        signature: signature.to_string(),
        slot: tx.slot,
        block_time: tx.block_time.and_then(|secs| DateTime::from_timestamp(secs, 0)),
        fee_lamports: fee,
        failed,
        pre_token_balances: convert_balances(pre),
        post_token_balances: convert_balances(post),
    }
}

fn convert_balances(balances: Vec<RpcTokenBalance>) -> Vec<TokenBalance> {
    balances
        .into_iter()
        .filter_map(|b| {
            let amount = b.ui_token_amount.to_decimal()?;
            Some(TokenBalance {
                account_index: b.account_index,
                mint: b.mint,
                owner: b.owner,
                amount,
            })
        })
        .collect()
}
