use super::env_parsing::{parse_duration, parse_env_bool};
use super::*;
use std::env;
use std::sync::Mutex;
use std::time::Duration;

// Environment variables are process-global; serialize every test that
// touches them.
static ENV_LOCK: Mutex<()> = Mutex::new(());

const ALL_VARS: &[&str] = &[
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
    "STREAM_PROVIDER",
    "TRITON_API_KEY",
    "OPENROUTER_API_KEY",
    "API_ADDR",
    "API_KEY",
    "DEV",
];

fn with_clean_env<F: FnOnce()>(pairs: &[(&str, &str)], body: F) {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let saved: Vec<(&str, Option<String>)> = ALL_VARS
        .iter()
        .map(|key| (*key, env::var(key).ok()))
        .collect();
    for key in ALL_VARS {
        env::remove_var(key);
    }
    for (key, value) in pairs {
        env::set_var(key, value);
    }

    body();

    for (key, value) in saved {
        match value {
            Some(value) => env::set_var(key, value),
            None => env::remove_var(key),
        }
    }
}

fn full_env() -> Vec<(&'static str, &'static str)> {
    vec![
        ("SOLANA_RPC_URL", "https://api.mainnet-beta.solana.com"),
        ("POLL_INTERVAL", "10s"),
        ("REDIS_ADDR", "localhost:6379"),
        ("CLICKHOUSE_ADDR", "http://localhost:8123"),
        ("CLICKHOUSE_DATABASE", "solana"),
        ("CLICKHOUSE_USERNAME", "default"),
        ("CLICKHOUSE_PASSWORD", ""),
        ("HTTP_TIMEOUT", "30s"),
        ("MAX_RETRIES", "3"),
        ("RETRY_BACKOFF", "500ms"),
        ("API_ADDR", "127.0.0.1:8090"),
    ]
}

#[test]
fn load_reports_all_missing_vars_at_once() {
    with_clean_env(&[("SOLANA_RPC_URL", "https://rpc.example")], || {
        let err = load_from_env().expect_err("load should fail");
        let message = err.to_string();
        for key in ["POLL_INTERVAL", "REDIS_ADDR", "CLICKHOUSE_ADDR", "API_ADDR"] {
            assert!(message.contains(key), "error should name {}: {}", key, message);
        }
        assert!(!message.contains("SOLANA_RPC_URL"));
    });
}

#[test]
fn load_succeeds_with_minimal_env_and_applies_defaults() {
    with_clean_env(&full_env(), || {
        let config = load_from_env().expect("load should succeed");
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.retry_backoff, Duration::from_millis(500));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.stream_provider, StreamProvider::Rpc);
        assert!(config.api_key.is_empty());
        assert!(config.openrouter_api_key.is_empty());
        assert!(!config.dev_mode);
    });
}

#[test]
fn load_rejects_triton_provider_without_key() {
    let mut pairs = full_env();
    pairs.push(("STREAM_PROVIDER", "triton"));
    with_clean_env(&pairs, || {
        let err = load_from_env().expect_err("triton without key should fail");
        assert!(err.to_string().contains("TRITON_API_KEY"));
    });
}

#[test]
fn load_accepts_triton_provider_with_key() {
    let mut pairs = full_env();
    pairs.push(("STREAM_PROVIDER", "triton"));
    pairs.push(("TRITON_API_KEY", "key-123"));
    with_clean_env(&pairs, || {
        let config = load_from_env().expect("load should succeed");
        assert_eq!(config.stream_provider, StreamProvider::Triton);
        assert_eq!(config.triton_api_key, "key-123");
    });
}

#[test]
fn load_rejects_unknown_stream_provider() {
    let mut pairs = full_env();
    pairs.push(("STREAM_PROVIDER", "geyser"));
    with_clean_env(&pairs, || {
        assert!(load_from_env().is_err());
    });
}

#[test]
fn load_rejects_invalid_duration_with_context() {
    let mut pairs = full_env();
    pairs.retain(|(key, _)| *key != "POLL_INTERVAL");
    pairs.push(("POLL_INTERVAL", "banana"));
    with_clean_env(&pairs, || {
        let err = load_from_env().expect_err("bad duration should fail");
        assert!(format!("{:#}", err).contains("POLL_INTERVAL"));
    });
}

#[test]
fn load_parses_dev_mode_bool() {
    let mut pairs = full_env();
    pairs.push(("DEV", "true"));
    with_clean_env(&pairs, || {
        assert!(load_from_env().unwrap().dev_mode);
    });
    let mut pairs = full_env();
    pairs.push(("DEV", "definitely"));
    with_clean_env(&pairs, || {
        assert!(load_from_env().is_err());
    });
}

#[test]
fn parse_duration_accepts_common_units() {
    assert_eq!(parse_duration("300ms").unwrap(), Duration::from_millis(300));
    assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
    assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
    assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
    assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
    assert_eq!(parse_duration(" 2s ").unwrap(), Duration::from_secs(2));
}

#[test]
fn parse_duration_rejects_bare_numbers_and_junk() {
    assert!(parse_duration("").is_err());
    assert!(parse_duration("10").is_err());
    assert!(parse_duration("10d").is_err());
    assert!(parse_duration("-5s").is_err());
    assert!(parse_duration("fast").is_err());
}

#[test]
fn parse_env_bool_matches_expected_spellings() {
    for truthy in ["1", "true", "YES", "On"] {
        assert_eq!(parse_env_bool(truthy), Some(true));
    }
    for falsy in ["0", "false", "NO", "off"] {
        assert_eq!(parse_env_bool(falsy), Some(false));
    }
    assert_eq!(parse_env_bool("maybe"), None);
}
