use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default OpenRouter model for NL→SQL; callers may override per request.
pub const DEFAULT_MODEL: &str = "openai/gpt-4.1-mini";

const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
/// Generation and summarisation are both bounded to this many tokens.
const MAX_COMPLETION_TOKENS: u32 = 512;

/// Minimal chat-completions client against OpenRouter's OpenAI-compatible
/// API. The model is an opaque text generator; safety lives in the SQL
/// validator, not here.
#[derive(Debug, Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

impl LlmClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            bail!("OPENROUTER_API_KEY is required");
        }
        let model = {
            let model = model.into();
            if model.trim().is_empty() {
                DEFAULT_MODEL.to_string()
            } else {
                model
            }
        };
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("failed to build llm http client")?;
        Ok(Self {
            http,
            base_url: OPENROUTER_BASE_URL.to_string(),
            api_key,
            model,
        })
    }

    /// Point at a different OpenAI-compatible endpoint (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Single-prompt completion; returns the first choice's text.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: MAX_COMPLETION_TOKENS,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("llm request failed")?;

        let status = response.status();
        let body = response.text().await.context("failed to read llm response")?;
        if !status.is_success() {
            bail!("llm request failed ({}): {}", status.as_u16(), body.trim());
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body).context("failed to decode llm response")?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            bail!("llm returned an empty completion");
        }
        Ok(content)
    }
}
