use chrono::{DateTime, Utc};
use deadpool_redis::Pool;
use once_cell::sync::Lazy;
use redis::AsyncCommands;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const INDEX_KEY: &str = "flags:index";
const VALUE_PREFIX: &str = "flags:";

static KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]{1,128}$").expect("flag key regex"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flag {
    pub key: String,
    pub value: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum FlagStoreError {
    #[error("flag not found")]
    NotFound,
    #[error("invalid flag key")]
    InvalidKey,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub fn validate_key(key: &str) -> Result<(), FlagStoreError> {
    if KEY_RE.is_match(key) {
        Ok(())
    } else {
        Err(FlagStoreError::InvalidKey)
    }
}

/// Durable feature-flag store. Every key lives twice: the JSON value under
/// `flags:<key>` and the bare key in the `flags:index` set, written together
/// in one transaction so `list` never scans the keyspace.
pub struct Store {
    pool: Pool,
}

impl Store {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub async fn upsert(&self, key: &str, value: bool) -> Result<Flag, FlagStoreError> {
        validate_key(key)?;

        let flag = Flag {
            key: key.to_string(),
            value,
            updated_at: Utc::now(),
        };
        let payload = serde_json::to_string(&flag)
            .map_err(|error| anyhow::anyhow!("marshal flag: {error}"))?;

        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|error| anyhow::anyhow!("redis pool: {error}"))?;
        redis::pipe()
            .atomic()
            .set(flag_key(key), payload)
            .ignore()
            .sadd(INDEX_KEY, key)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|error| anyhow::anyhow!("upsert flag: {error}"))?;

        debug!(key, value, "flag upserted");
        Ok(flag)
    }

    pub async fn get(&self, key: &str) -> Result<Flag, FlagStoreError> {
        validate_key(key)?;

        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|error| anyhow::anyhow!("redis pool: {error}"))?;
        let value: Option<String> = conn
            .get(flag_key(key))
            .await
            .map_err(|error| anyhow::anyhow!("get flag: {error}"))?;

        let raw = value.ok_or(FlagStoreError::NotFound)?;
        let flag = serde_json::from_str(&raw)
            .map_err(|error| anyhow::anyhow!("unmarshal flag: {error}"))?;
        Ok(flag)
    }

    /// Index-order listing. Keys in the index that fail validation or whose
    /// value is gone are skipped; the index heals on the next upsert/delete.
    pub async fn list(&self) -> Result<Vec<Flag>, FlagStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|error| anyhow::anyhow!("redis pool: {error}"))?;
        let keys: Vec<String> = conn
            .smembers(INDEX_KEY)
            .await
            .map_err(|error| anyhow::anyhow!("list flags index: {error}"))?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let value_keys: Vec<String> = keys
            .iter()
            .filter(|key| validate_key(key).is_ok())
            .map(|key| flag_key(key))
            .collect();
        if value_keys.is_empty() {
            return Ok(Vec::new());
        }

        let values: Vec<Option<String>> = conn
            .mget(&value_keys)
            .await
            .map_err(|error| anyhow::anyhow!("mget flags: {error}"))?;

        let mut flags = Vec::with_capacity(values.len());
        for value in values.into_iter().flatten() {
            if let Ok(flag) = serde_json::from_str::<Flag>(&value) {
                flags.push(flag);
            }
        }
        Ok(flags)
    }

    /// Idempotent; deleting a missing key is not an error.
    pub async fn delete(&self, key: &str) -> Result<(), FlagStoreError> {
        validate_key(key)?;

        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|error| anyhow::anyhow!("redis pool: {error}"))?;
        redis::pipe()
            .atomic()
            .del(flag_key(key))
            .ignore()
            .srem(INDEX_KEY, key)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|error| anyhow::anyhow!("delete flag: {error}"))?;

        debug!(key, "flag deleted");
        Ok(())
    }
}

fn flag_key(key: &str) -> String {
    format!("{}{}", VALUE_PREFIX, key)
}
