mod orchestrator;

use anyhow::{Context, Result};
use solswap_cache::RedisCache;
use solswap_config::{load_from_env, StreamProvider};
use solswap_ingestion::{Poller, PollerConfig, WATCHED_PROGRAMS};
use solswap_rpc::{Client, ClientConfig};
use solswap_storage::{ClickHouseConfig, ClickHouseStore};
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::orchestrator::Indexer;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = load_from_env()?;
    let shutdown = CancellationToken::new();

    let cache = Arc::new(RedisCache::connect(&config.redis_addr, shutdown.clone()).await?);
    let store = Arc::new(
        ClickHouseStore::connect(&ClickHouseConfig {
            addr: config.clickhouse_addr.clone(),
            database: config.clickhouse_database.clone(),
            username: config.clickhouse_username.clone(),
            password: config.clickhouse_password.clone(),
        })
        .await?,
    );

    let rpc_url = match config.stream_provider {
        StreamProvider::Rpc => config.rpc_url.clone(),
        StreamProvider::Triton => format!(
            "https://api.mainnet.solana.triton.one/{}",
            config.triton_api_key
        ),
    };
    info!(provider = config.stream_provider.as_str(), "using rpc polling");

    let client = Client::new(ClientConfig {
        base_url: rpc_url,
        timeout: config.http_timeout,
        max_retries: config.max_retries,
        retry_backoff: config.retry_backoff,
    })
    .context("failed to build rpc client")?;

    let poller = Poller::new(
        client,
        WATCHED_PROGRAMS.iter().collect(),
        PollerConfig::new(config.poll_interval),
        &shutdown,
    );
    let indexer = Indexer::new(store, cache);

    let mut sigterm = signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
        info!("shutdown signal received");
        signal_shutdown.cancel();
    });

    info!("indexer running");
    poller.run(&indexer).await?;

    info!("indexer stopped");
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
