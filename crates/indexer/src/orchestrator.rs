use async_trait::async_trait;
use solswap_core_types::{SwapCache, SwapEvent, SwapHandler, SwapStore};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Fans each decoded swap into the analytics store, the hot cache and the
/// live channel, in that order. The store is the durability boundary: its
/// failure drops the event. Cache and pub/sub are derived surfaces whose
/// failures only degrade reads, so they log and continue.
pub struct Indexer {
    store: Arc<dyn SwapStore>,
    cache: Arc<dyn SwapCache>,
}

impl Indexer {
    pub fn new(store: Arc<dyn SwapStore>, cache: Arc<dyn SwapCache>) -> Self {
        Self { store, cache }
    }

    pub async fn process_swap(&self, swap: &SwapEvent) -> anyhow::Result<()> {
        info!(
            signature = %swap.signature,
            pair = %swap.pair,
            amount_in = swap.amount_in,
            amount_out = swap.amount_out,
            "processing swap"
        );

        if let Err(error) = self.store.insert_swap(swap).await {
            error!(
                error = %error,
                signature = %swap.signature,
                "analytics insert failed, dropping event"
            );
            return Err(error);
        }

        if let Err(error) = self.cache.add_recent_swap(swap).await {
            warn!(error = %error, signature = %swap.signature, "cache write failed");
        }
        if let Err(error) = self.cache.update_price(&swap.token_out, swap.price).await {
            warn!(error = %error, token = %swap.token_out, "price update failed");
        }
        if let Err(error) = self.cache.publish_swap(swap).await {
            warn!(error = %error, signature = %swap.signature, "publish failed");
        }

        Ok(())
    }
}

#[async_trait]
impl SwapHandler for Indexer {
    async fn handle(&self, swap: SwapEvent) {
        // Failures are terminal per event; the poller never retries them.
        let _ = self.process_swap(&swap).await;
    }
}
