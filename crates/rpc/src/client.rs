use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::types::{RpcResponse, SignatureInfo, TransactionResult};

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("rate limited (429)")]
    RateLimited,
    #[error("unexpected status code: {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("max retries exceeded: {0}")]
    MaxRetriesExceeded(#[source] Box<RpcError>),
    #[error("call cancelled")]
    Cancelled,
}

impl RpcError {
    /// Transport-class failures retry; everything else is terminal for the call.
    fn is_retryable(&self) -> bool {
        match self {
            RpcError::Transport(_) | RpcError::RateLimited => true,
            RpcError::Status(code) => *code >= 500,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

/// JSON-RPC over HTTPS with idle-connection reuse and per-call retry.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    max_retries: u32,
    retry_backoff: Duration,
}

impl Client {
    pub fn new(cfg: ClientConfig) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build()?;
        Ok(Self {
            http,
            base_url: cfg.base_url,
            max_retries: cfg.max_retries,
            retry_backoff: cfg.retry_backoff,
        })
    }

    /// One JSON-RPC call. Retries transport errors, 429 and 5xx with doubling
    /// backoff; the cancellation token short-circuits the backoff sleep.
    pub async fn call<P, T>(
        &self,
        cancel: &CancellationToken,
        method: &str,
        params: P,
    ) -> Result<T, RpcError>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let mut backoff = self.retry_backoff;
        let mut last_err: Option<RpcError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                debug!(attempt, backoff_ms = backoff.as_millis() as u64, method, "retrying rpc call");
                tokio::select! {
                    _ = cancel.cancelled() => return Err(RpcError::Cancelled),
                    _ = tokio::time::sleep(backoff) => {}
                }
                backoff = backoff.saturating_mul(2);
            }

            match self.do_request(&body).await {
                Ok(response) => {
                    if let Some(error) = response.error {
                        return Err(RpcError::Rpc {
                            code: error.code,
                            message: error.message,
                        });
                    }
                    // `result: null` is a valid answer (e.g. unknown
                    // transaction); let T = Option<_> absorb it.
                    let result = response.result.unwrap_or(serde_json::Value::Null);
                    return serde_json::from_value(result).map_err(RpcError::Decode);
                }
                Err(err) if err.is_retryable() => last_err = Some(err),
                Err(err) => return Err(err),
            }
        }

        Err(RpcError::MaxRetriesExceeded(Box::new(
            last_err.unwrap_or(RpcError::Cancelled),
        )))
    }

    async fn do_request(&self, body: &serde_json::Value) -> Result<RpcResponse, RpcError> {
        let response = self
            .http
            .post(&self.base_url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(RpcError::RateLimited);
        }
        if status != reqwest::StatusCode::OK {
            return Err(RpcError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(RpcError::Decode)
    }

    /// `getSignaturesForAddress` limited to `limit`; `until` excludes every
    /// signature at or older than the given one (i.e. "newer than").
    pub async fn get_signatures_for_address(
        &self,
        cancel: &CancellationToken,
        address: &str,
        limit: usize,
        until: Option<&str>,
    ) -> Result<Vec<SignatureInfo>, RpcError> {
        let mut opts = json!({ "limit": limit });
        if let Some(until) = until {
            opts["until"] = json!(until);
        }
        let result: Option<Vec<SignatureInfo>> =
            self.call(cancel, "getSignaturesForAddress", json!([address, opts])).await?;
        Ok(result.unwrap_or_default())
    }

    /// `getTransaction` in jsonParsed encoding; `None` when the node does not
    /// know the signature.
    pub async fn get_transaction(
        &self,
        cancel: &CancellationToken,
        signature: &str,
    ) -> Result<Option<TransactionResult>, RpcError> {
        let params = json!([
            signature,
            {
                "encoding": "jsonParsed",
                "maxSupportedTransactionVersion": 0,
            }
        ]);
        self.call(cancel, "getTransaction", params).await
    }
}
