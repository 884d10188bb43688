use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.jup.ag/swap/v1";

/// Pass-through client for the Jupiter Quote API. The API surface validates
/// parameters; this client only forwards them.
#[derive(Debug, Clone)]
pub struct JupiterClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl JupiterClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let base_url = {
            let trimmed = base_url.trim().trim_end_matches('/');
            if trimmed.is_empty() {
                DEFAULT_BASE_URL.to_string()
            } else {
                trimmed.to_string()
            }
        };
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(12))
            .build()
            .context("failed to build jupiter http client")?;
        Ok(Self {
            http,
            base_url,
            api_key: api_key.trim().to_string(),
        })
    }

    /// Forwards validated query parameters to `/quote` and returns the
    /// upstream JSON untouched.
    pub async fn quote(&self, params: &[(String, String)]) -> Result<Value> {
        let mut request = self
            .http
            .get(format!("{}/quote", self.base_url))
            .query(params)
            .header(reqwest::header::ACCEPT, "application/json");
        if !self.api_key.is_empty() {
            request = request.header("x-api-key", &self.api_key);
        }

        let response = request.send().await.context("jupiter request failed")?;
        let status = response.status();
        let body = response
            .text()
            .await
            .context("failed to read jupiter response")?;
        if !status.is_success() {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                bail!("jupiter http {}", status.as_u16());
            }
            bail!("jupiter http {}: {}", status.as_u16(), trimmed);
        }

        serde_json::from_str(&body).context("failed to decode jupiter quote response")
    }
}
