mod error;
mod handlers;
mod jupiter;
mod quote;
mod rate_limit;
mod server;
mod state;
mod types;


use anyhow::{Context, Result};
use solswap_ai::{Agent, AgentConfig};
use solswap_cache::RedisCache;
use solswap_config::load_from_env;
use solswap_flags::Store as FlagStore;
use solswap_storage::ClickHouseConfig;
use std::env;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::jupiter::JupiterClient;
use crate::state::{AppState, Deps};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = load_from_env()?;
    let shutdown = CancellationToken::new();

    let cache = Arc::new(RedisCache::connect(&config.redis_addr, shutdown.clone()).await?);
    let flags = FlagStore::new(cache.pool());

    let ai_base = if config.openrouter_api_key.is_empty() {
        None
    } else {
        Some(AgentConfig {
            clickhouse: ClickHouseConfig {
                addr: config.clickhouse_addr.clone(),
                database: config.clickhouse_database.clone(),
                username: config.clickhouse_username.clone(),
                password: config.clickhouse_password.clone(),
            },
            openrouter_api_key: config.openrouter_api_key.clone(),
            model: String::new(),
        })
    };
    let ai = match ai_base.clone() {
        None => None,
        Some(base) => match Agent::new(base) {
            Ok(agent) => {
                if let Err(error) = agent.ping().await {
                    warn!(error = %error, "ai agent cannot reach ClickHouse");
                }
                Some(Arc::new(agent))
            }
            Err(error) => {
                warn!(error = %error, "failed to initialize ai agent");
                None
            }
        },
    };

    let jupiter = JupiterClient::new(
        &env::var("JUPITER_BASE_URL").unwrap_or_default(),
        &env::var("JUPITER_API_KEY").unwrap_or_default(),
    )?;

    let state = AppState::new(Deps {
        cache,
        flags,
        ai,
        ai_base,
        jupiter,
        api_key: config.api_key.clone(),
        dev_mode: config.dev_mode,
    });

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

    server::serve(state, &config.api_addr, shutdown.clone()).await?;

    info!("api server stopped");
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
