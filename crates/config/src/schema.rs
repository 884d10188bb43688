use std::time::Duration;

/// Process-wide configuration, loaded once from the environment and treated
/// as immutable afterwards. Handlers receive their dependencies explicitly;
/// nothing reads the environment on a request path.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // RPC
    pub rpc_url: String,
    pub poll_interval: Duration,

    // Redis
    pub redis_addr: String,

    // ClickHouse (HTTP interface, e.g. http://localhost:8123)
    pub clickhouse_addr: String,
    pub clickhouse_database: String,
    pub clickhouse_username: String,
    pub clickhouse_password: String,

    // RPC HTTP client
    pub http_timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,

    // Stream provider
    pub stream_provider: StreamProvider,
    pub triton_api_key: String,

    // LLM / OpenRouter; empty disables the AI endpoint
    pub openrouter_api_key: String,

    // API
    pub api_addr: String,
    /// Empty disables `X-API-Key` authentication.
    pub api_key: String,
    pub dev_mode: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamProvider {
    Rpc,
    Triton,
}

impl StreamProvider {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "rpc" => Some(Self::Rpc),
            "triton" => Some(Self::Triton),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rpc => "rpc",
            Self::Triton => "triton",
        }
    }
}
