use anyhow::Result;
use solswap_storage::{ClickHouseConfig, QueryClient};
use thiserror::Error;
use tracing::{debug, info};

use crate::llm::LlmClient;
use crate::schema::SWAPS_SCHEMA_DESCRIPTION;
use crate::sql::{sanitize_sql, validate_sql, SqlRejection};

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub clickhouse: ClickHouseConfig,
    pub openrouter_api_key: String,
    /// Empty picks [`crate::llm::DEFAULT_MODEL`].
    pub model: String,
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("LLM SQL generation failed: {0}")]
    Generation(#[source] anyhow::Error),
    #[error(transparent)]
    Rejected(#[from] SqlRejection),
    #[error("failed to execute query: {0}")]
    Execution(#[source] anyhow::Error),
    #[error("failed to encode query results: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("LLM summarisation failed: {0}")]
    Summarisation(#[source] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AskResult {
    pub sql: String,
    pub answer: String,
}

/// NL→SQL over the swaps table: prompt → sanitize → validate → execute →
/// summarise. The validator, not the prompt, is what keeps generated SQL
/// read-only.
pub struct Agent {
    llm: LlmClient,
    query: QueryClient,
}

impl Agent {
    pub fn new(cfg: AgentConfig) -> Result<Self> {
        let llm = LlmClient::new(cfg.openrouter_api_key, cfg.model)?;
        let query = QueryClient::new(cfg.clickhouse)?;
        info!(model = llm.model(), "initialized AI agent");
        Ok(Self { llm, query })
    }

    /// Assemble from pre-built clients; lets tests point both at local
    /// stand-ins.
    pub fn from_parts(llm: LlmClient, query: QueryClient) -> Self {
        Self { llm, query }
    }

    pub fn model(&self) -> &str {
        self.llm.model()
    }

    /// Reachability probe for bootstrap; the agent itself stays lazy.
    pub async fn ping(&self) -> Result<()> {
        self.query.select_rows("SELECT 1").await?;
        Ok(())
    }

    pub async fn ask(&self, question: &str) -> Result<AskResult, AgentError> {
        let sql = self.generate_sql(question).await?;

        let rows = self
            .query
            .select_rows(&sql)
            .await
            .map_err(AgentError::Execution)?;
        let rows_json = serde_json::to_string(&rows).map_err(AgentError::Encode)?;

        let answer = self.summarise(question, &sql, &rows_json).await?;

        Ok(AskResult { sql, answer })
    }

    async fn generate_sql(&self, question: &str) -> Result<String, AgentError> {
        let prompt = format!(
            r#"You are an expert ClickHouse SQL generator.

Use ONLY the following table:
{SWAPS_SCHEMA_DESCRIPTION}

Rules:
- Return a single SELECT query in ClickHouse SQL.
- Do NOT include any explanation or comments, only the SQL.
- The table is solana.swaps.
- Use timestamp for time filtering.
- Use aggregate functions like sum, avg, count when appropriate.
- If user asks for "top" or "biggest" something, use ORDER BY ... DESC and LIMIT.
- Never modify data: no INSERT, UPDATE, DELETE, DROP, ALTER, CREATE, TRUNCATE.

User question:
{question}
"#
        );

        let response = self
            .llm
            .complete(&prompt)
            .await
            .map_err(AgentError::Generation)?;

        let sql = sanitize_sql(&response);
        validate_sql(&sql)?;

        debug!(sql = %sql, "generated SQL from question");
        Ok(sql)
    }

    async fn summarise(
        &self,
        question: &str,
        sql: &str,
        rows_json: &str,
    ) -> Result<String, AgentError> {
        let prompt = format!(
            r#"You are a helpful assistant analysing Solana DEX swap analytics.

User question:
{question}

SQL that was executed:
{sql}

Query results in JSON (array of objects, can be empty):
{rows_json}

Instructions:
- If the result set is empty, say that no data was found for the question.
- Otherwise, answer the question concisely using bullet points and short sentences.
- Include key numbers (volumes, counts, prices) rounded reasonably.
- Do not restate the raw JSON.
"#
        );

        let response = self
            .llm
            .complete(&prompt)
            .await
            .map_err(AgentError::Summarisation)?;
        Ok(response.trim().to_string())
    }
}
