use super::*;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use solswap_storage::{ClickHouseConfig, QueryClient};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

struct FakeLlm {
    completions: Vec<String>,
    hits: AtomicUsize,
    requests: Mutex<Vec<Value>>,
}

async fn spawn_llm(completions: Vec<&str>) -> (String, Arc<FakeLlm>) {
    let fake = Arc::new(FakeLlm {
        completions: completions.into_iter().map(String::from).collect(),
        hits: AtomicUsize::new(0),
        requests: Mutex::new(Vec::new()),
    });
    let app = Router::new()
        .route(
            "/chat/completions",
            post(
                |State(fake): State<Arc<FakeLlm>>, Json(body): Json<Value>| async move {
                    fake.requests.lock().unwrap().push(body);
                    let hit = fake.hits.fetch_add(1, Ordering::SeqCst);
                    let idx = hit.min(fake.completions.len() - 1);
                    Json(json!({
                        "choices": [{"message": {"role": "assistant", "content": fake.completions[idx]}}]
                    }))
                },
            ),
        )
        .with_state(fake.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), fake)
}

struct FakeClickHouse {
    status: StatusCode,
    body: String,
    hits: AtomicUsize,
    seen_sql: Mutex<Vec<String>>,
}

async fn spawn_clickhouse(status: StatusCode, body: &str) -> (String, Arc<FakeClickHouse>) {
    let fake = Arc::new(FakeClickHouse {
        status,
        body: body.to_string(),
        hits: AtomicUsize::new(0),
        seen_sql: Mutex::new(Vec::new()),
    });
    let app = Router::new()
        .route(
            "/",
            post(
                |State(fake): State<Arc<FakeClickHouse>>, sql: String| async move {
                    fake.hits.fetch_add(1, Ordering::SeqCst);
                    fake.seen_sql.lock().unwrap().push(sql);
                    (fake.status, fake.body.clone()).into_response()
                },
            ),
        )
        .with_state(fake.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), fake)
}

fn agent_for(llm_url: String, ch_url: String) -> Agent {
    let llm = LlmClient::new("test-key", "")
        .unwrap()
        .with_base_url(llm_url);
    let query = QueryClient::new(ClickHouseConfig {
        addr: ch_url,
        database: "solana".to_string(),
        username: "default".to_string(),
        password: String::new(),
    })
    .unwrap();
    Agent::from_parts(llm, query)
}

#[tokio::test]
async fn ask_generates_executes_and_summarises() {
    let (llm_url, llm) = spawn_llm(vec![
        "```sql\nSELECT pair, count() AS swaps FROM swaps GROUP BY pair;\n```",
        "  - SOL/USDC leads with 5 swaps.\n",
    ])
    .await;
    let (ch_url, clickhouse) = spawn_clickhouse(
        StatusCode::OK,
        r#"{"meta": [], "data": [{"pair": "SOL/USDC", "swaps": 5}], "rows": 1}"#,
    )
    .await;
    let agent = agent_for(llm_url, ch_url);

    let result = agent.ask("which pair trades the most?").await.unwrap();
    assert_eq!(
        result.sql,
        "SELECT pair, count() AS swaps FROM swaps GROUP BY pair"
    );
    assert_eq!(result.answer, "- SOL/USDC leads with 5 swaps.");

    // The sanitized query, not the fenced LLM output, reaches the store.
    let seen = clickhouse.seen_sql.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0], result.sql);

    // Both LLM calls are bounded.
    let requests = llm.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    for request in requests.iter() {
        assert_eq!(request["max_tokens"], 512);
    }
    // The summarisation prompt carries question, SQL and rows.
    let summary_prompt = requests[1]["messages"][0]["content"].as_str().unwrap();
    assert!(summary_prompt.contains("which pair trades the most?"));
    assert!(summary_prompt.contains(&result.sql));
    assert!(summary_prompt.contains("SOL/USDC"));
}

#[tokio::test]
async fn ask_refuses_unsafe_sql_before_execution() {
    let (llm_url, _llm) = spawn_llm(vec!["DROP TABLE swaps;"]).await;
    let (ch_url, clickhouse) =
        spawn_clickhouse(StatusCode::OK, r#"{"data": [], "rows": 0}"#).await;
    let agent = agent_for(llm_url, ch_url);

    let err = agent.ask("delete everything").await.unwrap_err();
    match err {
        AgentError::Rejected(SqlRejection::DisallowedKeyword(keyword)) => {
            assert_eq!(keyword, "DROP ")
        }
        other => panic!("expected rejection, got {other}"),
    }
    assert_eq!(clickhouse.hits.load(Ordering::SeqCst), 0, "unsafe SQL must never execute");
}

#[tokio::test]
async fn ask_surfaces_store_errors() {
    let (llm_url, _llm) = spawn_llm(vec!["SELECT broken FROM swaps"]).await;
    let (ch_url, _clickhouse) = spawn_clickhouse(
        StatusCode::BAD_REQUEST,
        "Code: 47. DB::Exception: Unknown identifier broken",
    )
    .await;
    let agent = agent_for(llm_url, ch_url);

    let err = agent.ask("what is broken?").await.unwrap_err();
    match err {
        AgentError::Execution(source) => {
            assert!(source.to_string().contains("Unknown identifier"), "{source}")
        }
        other => panic!("expected execution error, got {other}"),
    }
}

#[tokio::test]
async fn empty_model_falls_back_to_default() {
    let llm = LlmClient::new("key", "").unwrap();
    assert_eq!(llm.model(), DEFAULT_MODEL);

    let llm = LlmClient::new("key", "openai/gpt-4o-mini").unwrap();
    assert_eq!(llm.model(), "openai/gpt-4o-mini");

    assert!(LlmClient::new("", "").is_err());
}
