use serde::Deserialize;
use serde_json::Value;

/// JSON-RPC level error body.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorBody {
    pub code: i64,
    pub message: String,
}

/// Envelope shared by every JSON-RPC response. The result stays untyped until
/// the caller knows what it asked for.
#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    pub result: Option<Value>,
    pub error: Option<RpcErrorBody>,
}

/// One entry from `getSignaturesForAddress`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureInfo {
    pub signature: String,
    #[serde(default)]
    pub slot: u64,
    /// Non-null for failed transactions; those are skipped by the poller.
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(default)]
    pub block_time: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TokenAmount {
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub decimals: u8,
    #[serde(default)]
    pub ui_amount: Option<f64>,
    #[serde(default)]
    pub ui_amount_string: String,
}

impl TokenAmount {
    /// Decimal-normalised amount. Prefers the node-computed float, falls back
    /// to the string form, and finally to raw amount / 10^decimals.
    pub fn ui(&self) -> Option<f64> {
        if let Some(amount) = self.ui_amount {
            return Some(amount);
        }
        if let Ok(amount) = self.ui_amount_string.parse::<f64>() {
            return Some(amount);
        }
        if self.decimals > 18 {
            return None;
        }
        let raw = self.amount.parse::<f64>().ok()?;
        Some(raw / 10f64.powi(i32::from(self.decimals)))
    }
}

/// SPL token balance entry keyed by account index.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub account_index: u32,
    pub mint: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub ui_token_amount: TokenAmount,
}

/// The `meta` portion of a parsed transaction; everything the decoder needs.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMeta {
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(default)]
    pub pre_balances: Vec<u64>,
    #[serde(default)]
    pub post_balances: Vec<u64>,
    #[serde(default)]
    pub pre_token_balances: Vec<TokenBalance>,
    #[serde(default)]
    pub post_token_balances: Vec<TokenBalance>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResult {
    #[serde(default)]
    pub meta: Option<TransactionMeta>,
    #[serde(default)]
    pub block_time: Option<i64>,
}
