use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// JSON-RPC envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RpcResponse<T> {
    pub result: Option<T>,
    #[serde(default)]
    pub error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
pub struct RpcErrorBody {
    pub code: i64,
    pub message: String,
}

// ---------------------------------------------------------------------------
// getProgramAccounts (jsonParsed)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ProgramAccount {
    pub pubkey: String,
    pub account: AccountInfo,
}

#[derive(Debug, Deserialize)]
pub struct AccountInfo {
    pub data: AccountData,
}

/// Accounts the node could not parse come back as `[base64, encoding]`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AccountData {
    Parsed(ParsedAccountData),
    Raw(serde_json::Value),
}

#[derive(Debug, Deserialize)]
pub struct ParsedAccountData {
    pub parsed: ParsedTokenAccount,
}

#[derive(Debug, Deserialize)]
pub struct ParsedTokenAccount {
    pub info: TokenAccountInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAccountInfo {
    pub owner: String,
    pub mint: String,
    pub token_amount: UiTokenAmount,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiTokenAmount {
    pub amount: String,
    pub decimals: u8,
    #[serde(default)]
    pub ui_amount_string: Option<String>,
}

impl UiTokenAmount {
    /// Scale the raw integer amount by the mint decimals. Falls back to the
    /// pre-formatted UI string when the raw amount does not parse.
    pub fn to_decimal(&self) -> Option<Decimal> {
        if let Ok(raw) = self.amount.parse::<i128>() {
            if let Ok(d) = Decimal::try_from_i128_with_scale(raw, self.decimals as u32) {
                return Some(d.normalize());
            }
        }
        self.ui_amount_string
            .as_deref()
            .and_then(|s| s.parse::<Decimal>().ok())
    }
}

// ---------------------------------------------------------------------------
// getSignaturesForAddress
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureInfo {
    pub signature: String,
    #[serde(default)]
    pub slot: Option<u64>,
    #[serde(default)]
    pub block_time: Option<i64>,
}

// ---------------------------------------------------------------------------
// getTransaction (jsonParsed)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransaction {
    pub slot: u64,
    #[serde(default)]
    pub block_time: Option<i64>,
    #[serde(default)]
    pub meta: Option<RpcTransactionMeta>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransactionMeta {
    #[serde(default)]
    pub err: Option<serde_json::Value>,
    #[serde(default)]
    pub fee: Option<u64>,
    #[serde(default)]
    pub pre_token_balances: Option<Vec<RpcTokenBalance>>,
    #[serde(default)]
    pub post_token_balances: Option<Vec<RpcTokenBalance>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTokenBalance {
    pub account_index: u32,
    pub mint: String,
    #[serde(default)]
    pub owner: Option<String>,
    pub ui_token_amount: UiTokenAmount,
}

// ---------------------------------------------------------------------------
// Price API (`GET <base>?ids=<mint>`)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct PriceResponse {
    #[serde(default)]
    pub data: HashMap<String, Option<PriceEntry>>,
}

#[derive(Debug, Deserialize)]
pub struct PriceEntry {
    pub price: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ui_token_amount_scales_raw_amount() {
        let amount = UiTokenAmount {
            amount: "123456789".into(),
            decimals: 6,
            ui_amount_string: None,
        };
        assert_eq!(amount.to_decimal(), Some(Decimal::new(123_456_789, 6)));
    }

    #[test]
    fn test_parsed_and_raw_account_data() {
        let parsed = r#"{"parsed":{"info":{"owner":"Own1","mint":"Mint1",
            "tokenAmount":{"amount":"5000000","decimals":6,"uiAmountString":"5"}}}}"#;
        let raw = r#"["AAAA", "base64"]"#;

        assert!(matches!(
            serde_json::from_str::<AccountData>(parsed).unwrap(),
            AccountData::Parsed(_)
        ));
        assert!(matches!(
            serde_json::from_str::<AccountData>(raw).unwrap(),
            AccountData::Raw(_)
        ));
    }

    #[test]
    fn test_transaction_with_null_result() {
        let body = r#"{"jsonrpc":"2.0","id":1,"result":null}"#;
        let resp: RpcResponse<RpcTransaction> = serde_json::from_str(body).unwrap();
        assert!(resp.result.is_none());
        assert!(resp.error.is_none());
    }
}
