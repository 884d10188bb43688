use anyhow::{Context as AnyhowContext, Result};
use axum::extract::{Request, State};
use axum::http::header::{HeaderValue, CACHE_CONTROL, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto::Builder as ConnectionBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use hyper_util::service::TowerToHyperService;
use std::convert::Infallible;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::{Instant, Sleep};
use tokio_util::sync::CancellationToken;
use tower::Service;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tracing::{debug, info, warn};

use crate::handlers;
use crate::quote;
use crate::rate_limit;
use crate::state::AppState;

// Server-level timeouts: slow request heads, response production, and
// keep-alive connections that go quiet.
const READ_HEADER_TIMEOUT: Duration = Duration::from_secs(15);
const WRITE_TIMEOUT: Duration = Duration::from_secs(75);
const IDLE_TIMEOUT: Duration = Duration::from_secs(60);
const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(10);

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_origin(Any);

    let ai_routes = Router::new()
        .route("/v1/ai/ask", post(handlers::ai_ask))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::ai_rate_limit,
        ));

    Router::new()
        .route("/v1/health", get(handlers::health))
        .route("/v1/echo", post(handlers::echo))
        .route("/v1/swaps/recent", get(handlers::recent_swaps))
        .route("/v1/prices/:token", get(handlers::price))
        .route(
            "/v1/flags",
            get(handlers::flags_list).post(handlers::flags_upsert),
        )
        .route(
            "/v1/flags/:key",
            get(handlers::flags_get)
                .put(handlers::flags_update)
                .delete(handlers::flags_delete),
        )
        .route("/v1/quote", get(quote::quote))
        .merge(ai_routes)
        .fallback(handlers::not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ))
        .layer(middleware::from_fn(set_response_headers))
        .layer(TimeoutLayer::new(WRITE_TIMEOUT))
        .layer(cors)
        .with_state(state)
}

/// Rejects requests without a matching `X-API-Key` header whenever a key is
/// configured. An empty key disables authentication.
async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let expected = state.api_key();
    if expected.is_empty() {
        return next.run(request).await;
    }

    let provided = request
        .headers()
        .get("X-API-Key")
        .and_then(|value| value.to_str().ok());
    if provided == Some(expected) {
        next.run(request).await
    } else {
        state
            .err(StatusCode::UNAUTHORIZED, "invalid or missing api key")
            .into_response()
    }
}

/// API responses are never cacheable and always JSON.
async fn set_response_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    response
}

/// Accept loop with per-connection timeouts: request headers must arrive
/// within 15s, idle keep-alive connections close after 60s, and shutdown
/// drains in-flight connections for at most 10s.
pub async fn serve(state: AppState, addr: &str, shutdown: CancellationToken) -> Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind api server on {}", addr))?;
    info!(addr, "api server starting");

    let mut make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    let mut builder = ConnectionBuilder::new(TokioExecutor::new());
    builder
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(READ_HEADER_TIMEOUT);
    let graceful = GracefulShutdown::new();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => {
                let (stream, remote_addr) = match accepted {
                    Ok(pair) => pair,
                    Err(error) => {
                        warn!(error = %error, "accept failed");
                        continue;
                    }
                };

                let tower_service =
                    unwrap_infallible(make_service.call(remote_addr).await);
                let hyper_service = TowerToHyperService::new(tower_service);
                let io = TokioIo::new(IdleTimeout::new(stream, IDLE_TIMEOUT));

                let connection = builder.serve_connection_with_upgrades(io, hyper_service);
                let watched = graceful.watch(connection.into_owned());
                tokio::spawn(async move {
                    if let Err(error) = watched.await {
                        debug!(error = %error, "connection closed with error");
                    }
                });
            }
        }
    }

    info!("api server draining connections");
    tokio::select! {
        _ = graceful.shutdown() => {}
        _ = tokio::time::sleep(SHUTDOWN_DEADLINE) => {
            warn!("graceful shutdown deadline exceeded, closing remaining connections");
        }
    }
    Ok(())
}

fn unwrap_infallible<T>(result: Result<T, Infallible>) -> T {
    match result {
        Ok(value) => value,
        Err(never) => match never {},
    }
}

/// Socket wrapper that errors out a connection with no read/write progress
/// within the idle window. Progress on either direction re-arms the timer, so
/// active requests are unaffected; kept-alive connections waiting for another
/// request are closed.
struct IdleTimeout<S> {
    inner: S,
    idle: Duration,
    sleep: Pin<Box<Sleep>>,
}

impl<S> IdleTimeout<S> {
    fn new(inner: S, idle: Duration) -> Self {
        Self {
            inner,
            idle,
            sleep: Box::pin(tokio::time::sleep(idle)),
        }
    }

    fn bump(&mut self) {
        let deadline = Instant::now() + self.idle;
        self.sleep.as_mut().reset(deadline);
    }

    fn poll_idle(&mut self, cx: &mut Context<'_>) -> Poll<io::Error> {
        match self.sleep.as_mut().poll(cx) {
            Poll::Ready(()) => Poll::Ready(io::Error::new(
                io::ErrorKind::TimedOut,
                "connection idle timeout",
            )),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for IdleTimeout<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_read(cx, buf) {
            Poll::Ready(result) => {
                this.bump();
                Poll::Ready(result)
            }
            Poll::Pending => match this.poll_idle(cx) {
                Poll::Ready(error) => Poll::Ready(Err(error)),
                Poll::Pending => Poll::Pending,
            },
        }
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for IdleTimeout<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_write(cx, buf) {
            Poll::Ready(result) => {
                this.bump();
                Poll::Ready(result)
            }
            Poll::Pending => match this.poll_idle(cx) {
                Poll::Ready(error) => Poll::Ready(Err(error)),
                Poll::Pending => Poll::Pending,
            },
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}
