use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clickhouse::Row;
use serde::Serialize;
use solswap_core_types::{SwapEvent, SwapStore};
use tracing::{debug, info};

use crate::ClickHouseConfig;

/// Row shape of the append-only `swaps` table; see sql/init.sql.
#[derive(Debug, Row, Serialize)]
struct SwapRow {
    signature: String,
    #[serde(with = "clickhouse::serde::chrono::datetime64::millis")]
    timestamp: DateTime<Utc>,
    pair: String,
    token_in: String,
    token_out: String,
    amount_in: f64,
    amount_out: f64,
    price: f64,
    fee: f64,
    pool: String,
    dex: String,
}

impl From<&SwapEvent> for SwapRow {
    fn from(swap: &SwapEvent) -> Self {
        Self {
            signature: swap.signature.clone(),
            timestamp: swap.timestamp,
            pair: swap.pair.clone(),
            token_in: swap.token_in.clone(),
            token_out: swap.token_out.clone(),
            amount_in: swap.amount_in,
            amount_out: swap.amount_out,
            price: swap.price,
            fee: swap.fee,
            pool: swap.pool.clone(),
            dex: swap.dex.clone(),
        }
    }
}

/// Durability boundary of the fan-out: the long-term swap log.
pub struct ClickHouseStore {
    client: clickhouse::Client,
}

impl ClickHouseStore {
    /// Connects and verifies reachability; bootstrap callers treat failure as
    /// fatal.
    pub async fn connect(cfg: &ClickHouseConfig) -> Result<Self> {
        let client = clickhouse::Client::default()
            .with_url(&cfg.addr)
            .with_database(&cfg.database)
            .with_user(&cfg.username)
            .with_password(&cfg.password);

        let store = Self { client };
        store
            .ping()
            .await
            .context("failed to connect to ClickHouse")?;
        info!(addr = %cfg.addr, database = %cfg.database, "connected to ClickHouse");
        Ok(store)
    }
}

#[async_trait]
impl SwapStore for ClickHouseStore {
    async fn insert_swap(&self, swap: &SwapEvent) -> Result<()> {
        let mut insert = self
            .client
            .insert::<SwapRow>("swaps")
            .context("failed to begin swap insert")?;
        insert
            .write(&SwapRow::from(swap))
            .await
            .context("failed to write swap row")?;
        insert.end().await.context("failed to insert swap")?;

        debug!(signature = %swap.signature, "swap stored");
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.client
            .query("SELECT 1")
            .fetch_one::<u8>()
            .await
            .context("clickhouse ping failed")?;
        Ok(())
    }
}
