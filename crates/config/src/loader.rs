use anyhow::{anyhow, Context, Result};
use std::env;
use std::time::Duration;

use super::env_parsing::{parse_duration, parse_env_bool};
use super::schema::{AppConfig, StreamProvider};

const REQUIRED_VARS: &[&str] = &[
    "SOLANA_RPC_URL",
    "POLL_INTERVAL",
    "REDIS_ADDR",
    "CLICKHOUSE_ADDR",
    "CLICKHOUSE_DATABASE",
    "CLICKHOUSE_USERNAME",
    "CLICKHOUSE_PASSWORD",
    "HTTP_TIMEOUT",
    "MAX_RETRIES",
    "RETRY_BACKOFF",
    "API_ADDR",
];

/// Reads the whole configuration from the environment. Every missing required
/// variable is reported in one error so an operator fixes the deployment in a
/// single pass instead of one variable per restart.
pub fn load_from_env() -> Result<AppConfig> {
    let missing: Vec<&str> = REQUIRED_VARS
        .iter()
        .copied()
        .filter(|key| {
            // CLICKHOUSE_PASSWORD may legitimately be empty for local setups.
            if *key == "CLICKHOUSE_PASSWORD" {
                return env::var(key).is_err();
            }
            env_string(key).is_empty()
        })
        .collect();
    if !missing.is_empty() {
        return Err(anyhow!(
            "missing required environment variables: {}",
            missing.join(", ")
        ));
    }

    let stream_provider_raw = env_string("STREAM_PROVIDER");
    let stream_provider = StreamProvider::parse(&stream_provider_raw)
        .ok_or_else(|| anyhow!("unknown STREAM_PROVIDER {:?}", stream_provider_raw))?;
    let triton_api_key = env_string("TRITON_API_KEY");
    if stream_provider == StreamProvider::Triton && triton_api_key.is_empty() {
        return Err(anyhow!(
            "TRITON_API_KEY is required when STREAM_PROVIDER=triton"
        ));
    }

    let dev_mode = match env::var("DEV") {
        Ok(raw) => parse_env_bool(&raw)
            .ok_or_else(|| anyhow!("invalid boolean for DEV (got {:?})", raw))?,
        Err(_) => false,
    };

    Ok(AppConfig {
        rpc_url: env_string("SOLANA_RPC_URL"),
        poll_interval: duration_env("POLL_INTERVAL")?,

        redis_addr: env_string("REDIS_ADDR"),

        clickhouse_addr: env_string("CLICKHOUSE_ADDR"),
        clickhouse_database: env_string("CLICKHOUSE_DATABASE"),
        clickhouse_username: env_string("CLICKHOUSE_USERNAME"),
        clickhouse_password: env::var("CLICKHOUSE_PASSWORD").unwrap_or_default(),

        http_timeout: duration_env("HTTP_TIMEOUT")?,
        max_retries: int_env("MAX_RETRIES")?,
        retry_backoff: duration_env("RETRY_BACKOFF")?,

        stream_provider,
        triton_api_key,

        openrouter_api_key: env_string("OPENROUTER_API_KEY"),

        api_addr: env_string("API_ADDR"),
        api_key: env_string("API_KEY"),
        dev_mode,
    })
}

fn env_string(key: &str) -> String {
    env::var(key).unwrap_or_default().trim().to_string()
}

fn duration_env(key: &str) -> Result<Duration> {
    let raw = env_string(key);
    parse_duration(&raw).with_context(|| {
        format!(
            "invalid duration for {} (got {:?}); examples: 30s, 5m, 1h",
            key, raw
        )
    })
}

fn int_env(key: &str) -> Result<u32> {
    let raw = env_string(key);
    raw.parse::<u32>()
        .map_err(|_| anyhow!("invalid integer for {} (got {:?})", key, raw))
}
