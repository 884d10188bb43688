use anyhow::{bail, Context, Result};
use solswap_ai::{Agent, AgentConfig};
use solswap_config::load_from_env;
use solswap_storage::ClickHouseConfig;
use std::io::Write;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let (question, model) = parse_args();
    let config = load_from_env()?;
    if config.openrouter_api_key.is_empty() {
        bail!("OPENROUTER_API_KEY is required for the AI agent");
    }

    let agent = Agent::new(AgentConfig {
        clickhouse: ClickHouseConfig {
            addr: config.clickhouse_addr.clone(),
            database: config.clickhouse_database.clone(),
            username: config.clickhouse_username.clone(),
            password: config.clickhouse_password.clone(),
        },
        openrouter_api_key: config.openrouter_api_key.clone(),
        model: model.unwrap_or_default(),
    })?;
    agent.ping().await.context("failed to reach ClickHouse")?;

    match question {
        Some(question) => run_single(&agent, &question).await,
        None => run_repl(&agent).await,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .compact()
        .init();
}

/// `-q <question>` runs one query and exits; `--model <name>` overrides the
/// OpenRouter model.
fn parse_args() -> (Option<String>, Option<String>) {
    let mut question = None;
    let mut model = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-q" => question = args.next(),
            "--model" => model = args.next(),
            _ if arg.starts_with("--model=") => {
                model = Some(arg["--model=".len()..].to_string());
            }
            _ => {}
        }
    }
    (question, model)
}

async fn run_single(agent: &Agent, question: &str) -> Result<()> {
    let started = Instant::now();
    let result = agent.ask(question).await?;
    println!("SQL:\n{}\n", result.sql);
    println!("{}", result.answer);
    println!("\n({} ms)", started.elapsed().as_millis());
    Ok(())
}

async fn run_repl(agent: &Agent) -> Result<()> {
    println!(
        "Ask questions about the swaps table (model: {}). Type 'exit' to quit.",
        agent.model()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question, "exit" | "quit") {
            break;
        }

        let started = Instant::now();
        match agent.ask(question).await {
            Ok(result) => {
                println!(
                    "\nSQL:\n{}\n\n{}\n\n({} ms)",
                    result.sql,
                    result.answer,
                    started.elapsed().as_millis()
                );
            }
            Err(error) => eprintln!("query failed: {error}"),
        }
    }
    Ok(())
}
