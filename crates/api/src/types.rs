use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct PriceResponse {
    pub token: String,
    pub price: f64,
}

#[derive(Debug, Deserialize)]
pub struct FlagUpsertRequest {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: bool,
}

#[derive(Debug, Deserialize)]
pub struct FlagUpdateRequest {
    #[serde(default)]
    pub value: bool,
}

#[derive(Debug, Deserialize)]
pub struct AiAskRequest {
    #[serde(default)]
    pub question: String,
    /// Optional per-request model override.
    #[serde(default)]
    pub model: String,
}

#[derive(Debug, Serialize)]
pub struct AiAskResponse {
    pub sql: String,
    pub answer: String,
    pub took_ms: i64,
}
