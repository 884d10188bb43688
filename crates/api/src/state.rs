use axum::http::StatusCode;
use solswap_ai::{Agent, AgentConfig};
use solswap_core_types::SwapCache;
use solswap_flags::Store as FlagStore;
use std::sync::Arc;

use crate::error::ApiError;
use crate::jupiter::JupiterClient;
use crate::rate_limit::AiLimiter;

/// Everything the handlers need, injected once at startup. No handler reads
/// the environment or builds clients on a request path; the one exception is
/// the short-lived agent created for a per-request model override.
pub struct Deps {
    pub cache: Arc<dyn SwapCache>,
    pub flags: FlagStore,
    pub ai: Option<Arc<Agent>>,
    pub ai_base: Option<AgentConfig>,
    pub jupiter: JupiterClient,
    pub api_key: String,
    pub dev_mode: bool,
}

#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    deps: Deps,
    ai_limiter: AiLimiter,
}

impl AppState {
    pub fn new(deps: Deps) -> Self {
        Self {
            inner: Arc::new(Inner {
                deps,
                ai_limiter: AiLimiter::new(),
            }),
        }
    }

    pub fn cache(&self) -> &dyn SwapCache {
        self.inner.deps.cache.as_ref()
    }

    pub fn flags(&self) -> &FlagStore {
        &self.inner.deps.flags
    }

    pub fn ai(&self) -> Option<&Arc<Agent>> {
        self.inner.deps.ai.as_ref()
    }

    pub fn ai_base(&self) -> Option<&AgentConfig> {
        self.inner.deps.ai_base.as_ref()
    }

    pub fn jupiter(&self) -> &JupiterClient {
        &self.inner.deps.jupiter
    }

    pub fn api_key(&self) -> &str {
        &self.inner.deps.api_key
    }

    pub fn ai_limiter(&self) -> &AiLimiter {
        &self.inner.ai_limiter
    }

    /// Error envelope builder; dev mode controls whether `details` survive.
    pub fn err(&self, status: StatusCode, message: impl Into<String>) -> ApiError {
        ApiError::new(status, message, self.inner.deps.dev_mode)
    }
}
