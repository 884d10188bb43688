//! Example consumer of the live swap channel.

use anyhow::{Context, Result};
use solswap_cache::RedisCache;
use solswap_config::load_from_env;
use solswap_core_types::SwapCache;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = load_from_env()?;
    let shutdown = CancellationToken::new();

    let cache = RedisCache::connect(&config.redis_addr, shutdown.clone()).await?;
    let mut swaps = cache.subscribe_swaps().await?;

    let mut sigterm = signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
        signal_shutdown.cancel();
    });

    info!("subscriber running");
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            swap = swaps.recv() => {
                let Some(swap) = swap else { break };
                info!(
                    signature = %swap.signature,
                    pair = %swap.pair,
                    amount_in = swap.amount_in,
                    token_in = %swap.token_in,
                    amount_out = swap.amount_out,
                    token_out = %swap.token_out,
                    price = swap.price,
                    "swap received"
                );
            }
        }
    }

    info!("subscriber stopped");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .compact()
        .init();
}
