use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// A single on-chain swap reconstructed from token-balance deltas.
///
/// Immutable once decoded. `price` is always `amount_out / amount_in`; events
/// that would make that undefined never leave the decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapEvent {
    pub signature: String,
    pub timestamp: DateTime<Utc>,
    /// Derived `TOKEN_IN/TOKEN_OUT`, never stored independently of its legs.
    pub pair: String,
    pub token_in: String,
    pub token_out: String,
    pub amount_in: f64,
    pub amount_out: f64,
    pub price: f64,
    /// Nominal per-DEX fee rate, not a realised per-transaction fee.
    pub fee: f64,
    pub pool: String,
    pub dex: String,
}

impl SwapEvent {
    /// `TOKEN_IN/TOKEN_OUT` as displayed in the API and stored in the pair column.
    pub fn derive_pair(token_in: &str, token_out: &str) -> String {
        format!("{}/{}", token_in, token_out)
    }
}

/// Hot-cache surface shared by the indexer and the API handlers.
#[async_trait]
pub trait SwapCache: Send + Sync {
    /// Prepend to the recent-swaps ring and truncate it, atomically.
    async fn add_recent_swap(&self, swap: &SwapEvent) -> Result<()>;

    /// Newest-first read of up to `limit` recent swaps. Malformed cache
    /// entries are skipped, never fail the whole read.
    async fn get_recent_swaps(&self, limit: i64) -> Result<Vec<SwapEvent>>;

    /// Overwrite the last observed price for `token`.
    async fn update_price(&self, token: &str, price: f64) -> Result<()>;

    /// Last observed price for `token`; `0.0` when the token was never priced.
    async fn get_price(&self, token: &str) -> Result<f64>;

    /// Publish to the live channel; returns the number of receivers.
    async fn publish_swap(&self, swap: &SwapEvent) -> Result<i64>;

    /// Bounded live subscription. When the consumer falls behind, events are
    /// dropped rather than back-pressuring the publisher.
    async fn subscribe_swaps(&self) -> Result<mpsc::Receiver<SwapEvent>>;

    async fn ping(&self) -> Result<()>;
}

/// Append-only long-term swap log.
#[async_trait]
pub trait SwapStore: Send + Sync {
    async fn insert_swap(&self, swap: &SwapEvent) -> Result<()>;

    async fn ping(&self) -> Result<()>;
}

/// Consumer of decoded swaps; the poller drives one of these sequentially.
#[async_trait]
pub trait SwapHandler: Send + Sync {
    async fn handle(&self, swap: SwapEvent);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_event_serializes_with_wire_field_names() {
        let swap = SwapEvent {
            signature: "5sig".to_string(),
            timestamp: Utc::now(),
            pair: SwapEvent::derive_pair("SOL", "USDC"),
            token_in: "SOL".to_string(),
            token_out: "USDC".to_string(),
            amount_in: 2.0,
            amount_out: 397.0,
            price: 198.5,
            fee: 0.0025,
            pool: "JupiterAggregator".to_string(),
            dex: "Jupiter".to_string(),
        };

        let value = serde_json::to_value(&swap).unwrap();
        for field in [
            "signature",
            "timestamp",
            "pair",
            "token_in",
            "token_out",
            "amount_in",
            "amount_out",
            "price",
            "fee",
            "pool",
            "dex",
        ] {
            assert!(value.get(field).is_some(), "missing field {}", field);
        }
        assert_eq!(value["pair"], "SOL/USDC");
    }

    #[test]
    fn swap_event_round_trips_through_json() {
        let swap = SwapEvent {
            signature: "abc".to_string(),
            timestamp: "2024-05-01T12:00:00Z".parse().unwrap(),
            pair: "SOL/USDC".to_string(),
            token_in: "SOL".to_string(),
            token_out: "USDC".to_string(),
            amount_in: 1.5,
            amount_out: 297.75,
            price: 198.5,
            fee: 0.003,
            pool: "OrcaLegacy".to_string(),
            dex: "Orca".to_string(),
        };

        let encoded = serde_json::to_string(&swap).unwrap();
        let decoded: SwapEvent = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, swap);
    }
}
