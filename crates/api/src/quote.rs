use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;

const QUOTE_DEADLINE: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct QuoteQuery {
    input_mint: Option<String>,
    output_mint: Option<String>,
    amount: Option<String>,
    slippage_bps: Option<String>,
    swap_mode: Option<String>,
    dexes: Option<String>,
    exclude_dexes: Option<String>,
    restrict_intermediate_tokens: Option<String>,
    only_direct_routes: Option<String>,
    as_legacy_transaction: Option<String>,
    platform_fee_bps: Option<String>,
    max_accounts: Option<String>,
    instruction_version: Option<String>,
    dynamic_slippage: Option<String>,
}

fn parse_bool_param(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

fn trimmed(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("").trim()
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Validated pass-through of the Jupiter Quote API.
pub async fn quote(
    State(state): State<AppState>,
    Query(query): Query<QuoteQuery>,
) -> Result<Json<Value>, ApiError> {
    let bad = |field: &str, reason: &str| {
        let mut details = serde_json::Map::new();
        details.insert(field.to_string(), Value::String(reason.to_string()));
        state
            .err(StatusCode::BAD_REQUEST, format!("invalid {}", field))
            .with_details(Value::Object(details))
    };

    let input_mint = trimmed(&query.input_mint);
    if input_mint.is_empty() {
        return Err(bad("inputMint", "required"));
    }
    let output_mint = trimmed(&query.output_mint);
    if output_mint.is_empty() {
        return Err(bad("outputMint", "required"));
    }
    let amount = trimmed(&query.amount);
    if amount.is_empty() {
        return Err(bad("amount", "required"));
    }
    if amount.parse::<u64>().is_err() {
        return Err(bad("amount", "must be uint64"));
    }

    let mut params: Vec<(String, String)> = vec![
        ("inputMint".to_string(), input_mint.to_string()),
        ("outputMint".to_string(), output_mint.to_string()),
        ("amount".to_string(), amount.to_string()),
    ];

    let slippage_bps = trimmed(&query.slippage_bps);
    if !slippage_bps.is_empty() {
        if slippage_bps.parse::<u16>().is_err() {
            return Err(bad("slippageBps", "must be uint16"));
        }
        params.push(("slippageBps".to_string(), slippage_bps.to_string()));
    }

    let swap_mode = trimmed(&query.swap_mode);
    if !swap_mode.is_empty() {
        if swap_mode != "ExactIn" && swap_mode != "ExactOut" {
            return Err(bad("swapMode", "must be ExactIn or ExactOut"));
        }
        params.push(("swapMode".to_string(), swap_mode.to_string()));
    }

    let dexes = split_csv(trimmed(&query.dexes));
    if !dexes.is_empty() {
        params.push(("dexes".to_string(), dexes.join(",")));
    }
    let exclude_dexes = split_csv(trimmed(&query.exclude_dexes));
    if !exclude_dexes.is_empty() {
        params.push(("excludeDexes".to_string(), exclude_dexes.join(",")));
    }

    for (field, raw) in [
        ("restrictIntermediateTokens", &query.restrict_intermediate_tokens),
        ("onlyDirectRoutes", &query.only_direct_routes),
        ("asLegacyTransaction", &query.as_legacy_transaction),
        ("dynamicSlippage", &query.dynamic_slippage),
    ] {
        let value = trimmed(raw);
        if value.is_empty() {
            continue;
        }
        let Some(parsed) = parse_bool_param(value) else {
            return Err(bad(field, "must be boolean"));
        };
        params.push((field.to_string(), parsed.to_string()));
    }

    let platform_fee_bps = trimmed(&query.platform_fee_bps);
    if !platform_fee_bps.is_empty() {
        if platform_fee_bps.parse::<u16>().is_err() {
            return Err(bad("platformFeeBps", "must be uint16"));
        }
        params.push(("platformFeeBps".to_string(), platform_fee_bps.to_string()));
    }

    let max_accounts = trimmed(&query.max_accounts);
    if !max_accounts.is_empty() {
        if max_accounts.parse::<u64>().is_err() {
            return Err(bad("maxAccounts", "must be uint64"));
        }
        params.push(("maxAccounts".to_string(), max_accounts.to_string()));
    }

    let instruction_version = trimmed(&query.instruction_version);
    if !instruction_version.is_empty() {
        if instruction_version != "V1" && instruction_version != "V2" {
            return Err(bad("instructionVersion", "must be V1 or V2"));
        }
        params.push(("instructionVersion".to_string(), instruction_version.to_string()));
    }

    let response = timeout(QUOTE_DEADLINE, state.jupiter().quote(&params))
        .await
        .map_err(|_| {
            state
                .err(StatusCode::BAD_GATEWAY, "jupiter quote failed")
                .with_details(json!({"err": "deadline exceeded"}))
        })?
        .map_err(|error| {
            warn!(error = %error, "jupiter quote failed");
            state
                .err(StatusCode::BAD_GATEWAY, "jupiter quote failed")
                .with_details(json!({"err": error.to_string()}))
        })?;

    Ok(Json(response))
}
