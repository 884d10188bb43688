mod agent;
mod llm;
mod schema;
mod sql;

pub use self::agent::{Agent, AgentConfig, AgentError, AskResult};
pub use self::llm::{LlmClient, DEFAULT_MODEL};
pub use self::schema::SWAPS_SCHEMA_DESCRIPTION;
pub use self::sql::{sanitize_sql, validate_sql, SqlRejection};

#[cfg(test)]
mod tests;
