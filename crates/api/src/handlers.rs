use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use solswap_ai::Agent;
use solswap_flags::{validate_key, FlagStoreError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;
use crate::types::{
    AiAskRequest, AiAskResponse, FlagUpdateRequest, FlagUpsertRequest, HealthResponse,
    PriceResponse,
};

// Per-endpoint deadlines, independent of client cancellation.
const RECENT_SWAPS_DEADLINE: Duration = Duration::from_secs(5);
const PRICE_DEADLINE: Duration = Duration::from_secs(3);
const FLAG_DEADLINE: Duration = Duration::from_secs(3);
const FLAG_LIST_DEADLINE: Duration = Duration::from_secs(5);
const AI_ASK_DEADLINE: Duration = Duration::from_secs(45);

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

/// Returns the received JSON payload as-is.
pub async fn echo(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let value: Value = serde_json::from_slice(&body)
        .map_err(|_| state.err(StatusCode::BAD_REQUEST, "invalid json"))?;
    Ok(Json(value))
}

#[derive(Debug, Deserialize, Default)]
pub struct RecentQuery {
    limit: Option<String>,
}

pub async fn recent_swaps(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = match query.limit.as_deref() {
        None | Some("") => 100,
        Some(raw) => raw.parse::<i64>().map_err(|_| {
            state
                .err(StatusCode::BAD_REQUEST, "invalid limit")
                .with_details(json!({"limit": "must be an integer"}))
        })?,
    };
    if !(1..=200).contains(&limit) {
        return Err(state
            .err(StatusCode::BAD_REQUEST, "invalid limit")
            .with_details(json!({"limit": "min 1 max 200"})));
    }

    let items = timeout(RECENT_SWAPS_DEADLINE, state.cache().get_recent_swaps(limit))
        .await
        .map_err(|_| state.err(StatusCode::INTERNAL_SERVER_ERROR, "failed to get swaps"))?
        .map_err(|error| {
            warn!(error = %error, "recent swaps read failed");
            state.err(StatusCode::INTERNAL_SERVER_ERROR, "failed to get swaps")
        })?;
    Ok(Json(json!({"items": items})))
}

pub async fn price(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<PriceResponse>, ApiError> {
    let token = token.trim().to_uppercase();
    if token.is_empty() {
        return Err(state.err(StatusCode::BAD_REQUEST, "invalid token"));
    }

    let price = timeout(PRICE_DEADLINE, state.cache().get_price(&token))
        .await
        .map_err(|_| state.err(StatusCode::INTERNAL_SERVER_ERROR, "failed to get price"))?
        .map_err(|error| {
            warn!(error = %error, token = %token, "price read failed");
            state.err(StatusCode::INTERNAL_SERVER_ERROR, "failed to get price")
        })?;
    Ok(Json(PriceResponse { token, price }))
}

fn invalid_key_error(state: &AppState) -> ApiError {
    state
        .err(StatusCode::BAD_REQUEST, "invalid key")
        .with_details(json!({"key": "invalid format"}))
}

pub async fn flags_upsert(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<solswap_flags::Flag>, ApiError> {
    let request: FlagUpsertRequest = serde_json::from_slice(&body)
        .map_err(|_| state.err(StatusCode::BAD_REQUEST, "invalid json"))?;
    if validate_key(&request.key).is_err() {
        return Err(invalid_key_error(&state));
    }

    let flag = timeout(FLAG_DEADLINE, state.flags().upsert(&request.key, request.value))
        .await
        .map_err(|_| state.err(StatusCode::INTERNAL_SERVER_ERROR, "failed to upsert flag"))?
        .map_err(|error| {
            warn!(error = %error, key = %request.key, "flag upsert failed");
            state.err(StatusCode::INTERNAL_SERVER_ERROR, "failed to upsert flag")
        })?;
    Ok(Json(flag))
}

pub async fn flags_update(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: Bytes,
) -> Result<Json<solswap_flags::Flag>, ApiError> {
    if validate_key(&key).is_err() {
        return Err(invalid_key_error(&state));
    }
    let request: FlagUpdateRequest = serde_json::from_slice(&body)
        .map_err(|_| state.err(StatusCode::BAD_REQUEST, "invalid json"))?;

    let flag = timeout(FLAG_DEADLINE, state.flags().upsert(&key, request.value))
        .await
        .map_err(|_| state.err(StatusCode::INTERNAL_SERVER_ERROR, "failed to update flag"))?
        .map_err(|error| {
            warn!(error = %error, key = %key, "flag update failed");
            state.err(StatusCode::INTERNAL_SERVER_ERROR, "failed to update flag")
        })?;
    Ok(Json(flag))
}

pub async fn flags_get(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<solswap_flags::Flag>, ApiError> {
    if validate_key(&key).is_err() {
        return Err(invalid_key_error(&state));
    }

    let result = timeout(FLAG_DEADLINE, state.flags().get(&key))
        .await
        .map_err(|_| state.err(StatusCode::INTERNAL_SERVER_ERROR, "failed to get flag"))?;
    match result {
        Ok(flag) => Ok(Json(flag)),
        Err(FlagStoreError::NotFound) => {
            Err(state.err(StatusCode::NOT_FOUND, "flag not found"))
        }
        Err(error) => {
            warn!(error = %error, key = %key, "flag read failed");
            Err(state.err(StatusCode::INTERNAL_SERVER_ERROR, "failed to get flag"))
        }
    }
}

pub async fn flags_list(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let items = timeout(FLAG_LIST_DEADLINE, state.flags().list())
        .await
        .map_err(|_| state.err(StatusCode::INTERNAL_SERVER_ERROR, "failed to list flags"))?
        .map_err(|error| {
            warn!(error = %error, "flag list failed");
            state.err(StatusCode::INTERNAL_SERVER_ERROR, "failed to list flags")
        })?;
    Ok(Json(json!({"items": items})))
}

pub async fn flags_delete(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<StatusCode, ApiError> {
    if validate_key(&key).is_err() {
        return Err(invalid_key_error(&state));
    }

    timeout(FLAG_DEADLINE, state.flags().delete(&key))
        .await
        .map_err(|_| state.err(StatusCode::INTERNAL_SERVER_ERROR, "failed to delete flag"))?
        .map_err(|error| {
            warn!(error = %error, key = %key, "flag delete failed");
            state.err(StatusCode::INTERNAL_SERVER_ERROR, "failed to delete flag")
        })?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn ai_ask(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AiAskResponse>, ApiError> {
    let default_agent = match state.ai() {
        Some(agent) => agent.clone(),
        None => return Err(state.err(StatusCode::BAD_REQUEST, "ai is not configured")),
    };

    let request: AiAskRequest = serde_json::from_slice(&body)
        .map_err(|_| state.err(StatusCode::BAD_REQUEST, "invalid json"))?;
    let question = request.question.trim().to_string();
    if question.is_empty() {
        return Err(state
            .err(StatusCode::BAD_REQUEST, "question is required")
            .with_details(json!({"question": "required"})));
    }

    let started = Instant::now();

    // A model override gets a one-shot agent, released with the request.
    let agent: Arc<Agent> = match request.model.trim() {
        "" => default_agent,
        model => {
            let Some(base) = state.ai_base() else {
                return Err(state.err(StatusCode::INTERNAL_SERVER_ERROR, "failed to create ai agent"));
            };
            let mut cfg = base.clone();
            cfg.model = model.to_string();
            match Agent::new(cfg) {
                Ok(agent) => Arc::new(agent),
                Err(error) => {
                    warn!(error = %error, model, "failed to create override agent");
                    return Err(
                        state.err(StatusCode::INTERNAL_SERVER_ERROR, "failed to create ai agent")
                    );
                }
            }
        }
    };

    let result = match timeout(AI_ASK_DEADLINE, agent.ask(&question)).await {
        Err(_) => {
            return Err(state
                .err(StatusCode::INTERNAL_SERVER_ERROR, "ai ask failed")
                .with_details(json!({"err": "deadline exceeded"})))
        }
        Ok(Err(error)) => {
            return Err(state
                .err(StatusCode::INTERNAL_SERVER_ERROR, "ai ask failed")
                .with_details(json!({"err": error.to_string()})))
        }
        Ok(Ok(result)) => result,
    };

    Ok(Json(AiAskResponse {
        sql: result.sql,
        answer: result.answer,
        took_ms: started.elapsed().as_millis() as i64,
    }))
}

pub async fn not_found(State(state): State<AppState>) -> ApiError {
    state.err(StatusCode::NOT_FOUND, "not found")
}
