use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

use crate::ClickHouseConfig;

/// Dynamic SELECT execution for the NL→SQL agent, over the ClickHouse HTTP
/// interface. Rows come back as column → value maps; the agent never needs a
/// compile-time row shape.
pub struct QueryClient {
    http: reqwest::Client,
    cfg: ClickHouseConfig,
}

#[derive(Debug, Deserialize)]
struct JsonQueryResponse {
    #[serde(default)]
    data: Vec<Map<String, Value>>,
}

impl QueryClient {
    pub fn new(cfg: ClickHouseConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("failed to build clickhouse http client")?;
        Ok(Self { http, cfg })
    }

    /// Runs one statement and materialises every row. Callers are expected to
    /// have validated the SQL; this layer only executes.
    pub async fn select_rows(&self, sql: &str) -> Result<Vec<Map<String, Value>>> {
        let response = self
            .http
            .post(&self.cfg.addr)
            .query(&[
                ("database", self.cfg.database.as_str()),
                ("default_format", "JSON"),
            ])
            .header("X-ClickHouse-User", &self.cfg.username)
            .header("X-ClickHouse-Key", &self.cfg.password)
            .body(sql.to_string())
            .send()
            .await
            .context("clickhouse query request failed")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("failed to read clickhouse response")?;
        if !status.is_success() {
            bail!(
                "clickhouse query failed ({}): {}",
                status.as_u16(),
                body.trim()
            );
        }

        let parsed: JsonQueryResponse =
            serde_json::from_str(&body).context("failed to decode clickhouse query result")?;
        debug!(rows = parsed.data.len(), "query executed");
        Ok(parsed.data)
    }
}
