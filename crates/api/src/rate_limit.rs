use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::state::AppState;

const REFILL_PERIOD: Duration = Duration::from_secs(5);
const BURST: u32 = 2;
/// Clients idle this long lose their bucket entry.
const CLIENT_EXPIRY: Duration = Duration::from_secs(120);

struct ClientEntry {
    bucket: DefaultDirectRateLimiter,
    last_seen: Instant,
}

/// Token bucket guarding the AI endpoint: one token per five seconds
/// (0.2 req/s), burst of two, one bucket per client address. Entries not
/// seen for two minutes are pruned on the next acquire.
pub struct AiLimiter {
    quota: Quota,
    clients: Mutex<HashMap<IpAddr, ClientEntry>>,
}

impl AiLimiter {
    pub fn new() -> Self {
        let quota = Quota::with_period(REFILL_PERIOD)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
            .allow_burst(NonZeroU32::new(BURST).unwrap_or(NonZeroU32::MIN));
        Self {
            quota,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn try_acquire(&self, client: IpAddr) -> bool {
        self.try_acquire_at(client, Instant::now())
    }

    fn try_acquire_at(&self, client: IpAddr, now: Instant) -> bool {
        let mut clients = self
            .clients
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        clients.retain(|_, entry| now.duration_since(entry.last_seen) < CLIENT_EXPIRY);

        let entry = clients.entry(client).or_insert_with(|| ClientEntry {
            bucket: RateLimiter::direct(self.quota),
            last_seen: now,
        });
        entry.last_seen = now;
        entry.bucket.check().is_ok()
    }
}

impl Default for AiLimiter {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn ai_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));

    if state.ai_limiter().try_acquire(client) {
        next.run(request).await
    } else {
        state
            .err(StatusCode::TOO_MANY_REQUESTS, "rate limit exceeded")
            .into_response()
    }
}
