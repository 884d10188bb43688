use anyhow::{Context, Result};
use async_trait::async_trait;
use deadpool_redis::{Pool, Runtime};
use futures_util::StreamExt;
use redis::AsyncCommands;
use solswap_core_types::{SwapCache, SwapEvent};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Redis keys and channels shared with every consumer of the hot cache.
pub const REDIS_KEY_RECENT_SWAPS: &str = "swaps:recent";
pub const REDIS_KEY_PRICE_PREFIX: &str = "price:";
pub const PUBSUB_CHANNEL_SWAPS: &str = "swaps:live";

/// Bound of the recent-swaps ring.
pub const MAX_RECENT_SWAPS: i64 = 100;
/// Consumer channel capacity per live subscription; a slow reader drops
/// events instead of back-pressuring the publisher.
pub const SUBSCRIBER_BUFFER: usize = 100;

pub fn redis_url(addr: &str) -> String {
    if addr.contains("://") {
        addr.to_string()
    } else {
        format!("redis://{}", addr)
    }
}

/// Redis-backed hot cache: bounded recent-swaps list, per-token last price,
/// and the `swaps:live` pub/sub channel.
pub struct RedisCache {
    pool: Pool,
    client: redis::Client,
    shutdown: CancellationToken,
}

impl RedisCache {
    /// Builds the pool and verifies connectivity with a PING; bootstrap
    /// callers treat a failure here as fatal.
    pub async fn connect(addr: &str, shutdown: CancellationToken) -> Result<Self> {
        let url = redis_url(addr);
        let pool = deadpool_redis::Config::from_url(url.as_str())
            .create_pool(Some(Runtime::Tokio1))
            .context("failed to create Redis pool")?;
        let client = redis::Client::open(url.as_str()).context("invalid Redis address")?;

        let cache = Self {
            pool,
            client,
            shutdown,
        };
        cache.ping().await.context("failed to connect to Redis")?;
        info!(addr, "connected to Redis");
        Ok(cache)
    }

    /// The command pool, shared with the feature-flag store.
    pub fn pool(&self) -> Pool {
        self.pool.clone()
    }
}

#[async_trait]
impl SwapCache for RedisCache {
    async fn add_recent_swap(&self, swap: &SwapEvent) -> Result<()> {
        let payload = serde_json::to_string(swap).context("failed to marshal swap")?;
        let mut conn = self.pool.get().await.context("redis pool")?;

        // Prepend then truncate, atomically, so the ring never exceeds its bound.
        redis::pipe()
            .atomic()
            .lpush(REDIS_KEY_RECENT_SWAPS, &payload)
            .ignore()
            .ltrim(REDIS_KEY_RECENT_SWAPS, 0, (MAX_RECENT_SWAPS - 1) as isize)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await
            .context("failed to push swap to Redis")?;

        debug!(signature = %swap.signature, pair = %swap.pair, "added swap to cache");
        Ok(())
    }

    async fn get_recent_swaps(&self, limit: i64) -> Result<Vec<SwapEvent>> {
        let mut conn = self.pool.get().await.context("redis pool")?;
        let raw: Vec<String> = conn
            .lrange(REDIS_KEY_RECENT_SWAPS, 0, (limit - 1) as isize)
            .await
            .context("failed to get recent swaps")?;

        let mut swaps = Vec::with_capacity(raw.len());
        for entry in raw {
            match serde_json::from_str::<SwapEvent>(&entry) {
                Ok(swap) => swaps.push(swap),
                Err(error) => {
                    warn!(error = %error, "failed to unmarshal swap from cache");
                }
            }
        }
        Ok(swaps)
    }

    async fn update_price(&self, token: &str, price: f64) -> Result<()> {
        let mut conn = self.pool.get().await.context("redis pool")?;
        let key = format!("{}{}", REDIS_KEY_PRICE_PREFIX, token);
        let _: () = conn.set(key, price).await.context("failed to set price")?;
        debug!(token, price, "updated token price");
        Ok(())
    }

    async fn get_price(&self, token: &str) -> Result<f64> {
        let mut conn = self.pool.get().await.context("redis pool")?;
        let key = format!("{}{}", REDIS_KEY_PRICE_PREFIX, token);
        let value: Option<String> = conn.get(key).await.context("failed to get price")?;
        match value {
            None => Ok(0.0),
            Some(raw) => raw.parse::<f64>().context("failed to parse price"),
        }
    }

    async fn publish_swap(&self, swap: &SwapEvent) -> Result<i64> {
        let payload = serde_json::to_string(swap).context("failed to marshal swap for publish")?;
        let mut conn = self.pool.get().await.context("redis pool")?;
        let receivers: i64 = conn
            .publish(PUBSUB_CHANNEL_SWAPS, payload)
            .await
            .context("failed to publish swap")?;
        debug!(
            signature = %swap.signature,
            pair = %swap.pair,
            subscribers = receivers,
            "published swap to channel"
        );
        Ok(receivers)
    }

    async fn subscribe_swaps(&self) -> Result<mpsc::Receiver<SwapEvent>> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .context("failed to open pubsub connection")?;
        pubsub
            .subscribe(PUBSUB_CHANNEL_SWAPS)
            .await
            .context("failed to subscribe to swaps channel")?;
        info!(channel = PUBSUB_CHANNEL_SWAPS, "subscribed to swaps channel");

        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            let mut stream = pubsub.into_on_message();
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        debug!("subscription cancelled, closing");
                        break;
                    }
                    message = stream.next() => {
                        let Some(message) = message else {
                            warn!("pubsub stream closed unexpectedly");
                            break;
                        };
                        let payload: String = match message.get_payload() {
                            Ok(payload) => payload,
                            Err(error) => {
                                warn!(error = %error, "failed to read pubsub payload");
                                continue;
                            }
                        };
                        let swap: SwapEvent = match serde_json::from_str(&payload) {
                            Ok(swap) => swap,
                            Err(error) => {
                                warn!(error = %error, "failed to unmarshal swap from pubsub");
                                continue;
                            }
                        };
                        match tx.try_send(swap) {
                            Ok(()) => {}
                            Err(TrySendError::Full(_)) => {
                                warn!("swap channel buffer full, dropping message");
                            }
                            Err(TrySendError::Closed(_)) => break,
                        }
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.pool.get().await.context("redis pool")?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .context("redis ping failed")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redis_url_prefixes_bare_addresses() {
        assert_eq!(redis_url("localhost:6379"), "redis://localhost:6379");
        assert_eq!(redis_url("redis://host:1/2"), "redis://host:1/2");
    }
}
