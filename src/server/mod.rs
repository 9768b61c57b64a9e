//! HTTP endpoints.
//!
//! Translation routes share one set of CORS headers taken from the config;
//! the lyrics proxy carries its own fixed set.

pub mod handlers;
pub mod proxy;

use axum::extract::Request;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, MethodRouter};
use axum::{Json, Router};
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{RelayError, Result};
use crate::rate_limit::RateLimiter;
use crate::translate::{
    build_client, FallbackTranslator, HfTranslator, MyMemoryTranslator, Orchestrator,
    PrimaryTranslator,
};

/// Shared state handed to every handler.
pub struct AppState {
    pub config: Config,
    pub orchestrator: Orchestrator,
    pub limiter: Arc<RateLimiter>,
    /// Client for the passthrough and lyrics proxy routes
    pub client: Client,
}

impl AppState {
    /// Wire up the real upstream providers from configuration.
    pub fn from_config(config: Config) -> Result<Self> {
        let timeout = config.primary.timeout_secs.map(Duration::from_secs);
        let client = build_client(timeout)?;
        let primary: Arc<dyn PrimaryTranslator> =
            Arc::new(HfTranslator::new(client.clone(), &config.primary));
        let fallback: Arc<dyn FallbackTranslator> =
            Arc::new(MyMemoryTranslator::new(client.clone(), &config.fallback));
        Ok(Self::new(config, primary, fallback, client))
    }

    pub fn new(
        config: Config,
        primary: Arc<dyn PrimaryTranslator>,
        fallback: Arc<dyn FallbackTranslator>,
        client: Client,
    ) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.rate_limit.spacing()));
        Self {
            orchestrator: Orchestrator::new(primary, fallback),
            limiter,
            client,
            config,
        }
    }
}

/// Best-effort caller identity used for rate limiting.
pub fn caller_identity(headers: &HeaderMap) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    header("x-real-ip")
        .or_else(|| header("x-forwarded-for").and_then(|list| list.split(',').next()).map(str::trim))
        .unwrap_or("anon")
        .to_string()
}

async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method not allowed" })),
    )
        .into_response()
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "lyric-relay",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn request_span(request: Request, next: Next) -> Response {
    let span = info_span!(
        "request",
        id = %Uuid::new_v4(),
        caller = %caller_identity(request.headers()),
        method = %request.method(),
        path = %request.uri().path(),
    );
    async move {
        let response = next.run(request).await;
        info!("Responded {}", response.status());
        response
    }
    .instrument(span)
    .await
}

fn translation_route<H, T>(handler: H) -> MethodRouter<Arc<AppState>>
where
    H: axum::handler::Handler<T, Arc<AppState>>,
    T: 'static,
{
    post(handler).options(preflight).fallback(method_not_allowed)
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let origin = HeaderValue::from_str(&state.config.cors.allow_origin).unwrap_or_else(|_| {
        warn!(
            "Invalid CORS origin {:?}, using *",
            state.config.cors.allow_origin
        );
        HeaderValue::from_static("*")
    });

    let translation = Router::new()
        .route("/api/hf-translate", translation_route(handlers::hf_translate))
        .route("/api/mymemory", translation_route(handlers::mymemory))
        .route("/api/translate", translation_route(handlers::passthrough))
        .layer(SetResponseHeaderLayer::overriding(ACCESS_CONTROL_ALLOW_ORIGIN, origin))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("POST,OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("content-type,authorization"),
        ));

    let lyrics = Router::new()
        .route("/api/proxy", get(proxy::relay).options(preflight))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type, User-Agent, Cookie, Authority"),
        ));

    Router::new()
        .route("/health", get(health))
        .merge(translation)
        .merge(lyrics)
        .layer(middleware::from_fn(request_span))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Bind and serve until interrupted.
pub async fn serve(config: Config) -> Result<()> {
    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let sweep_interval = Duration::from_secs(config.rate_limit.sweep_interval_secs.max(1));
    let idle_ttl = Duration::from_secs(config.rate_limit.idle_ttl_secs);

    if config.primary.token().is_none() {
        warn!("HF_TOKEN is not set; /api/hf-translate will answer 500");
    }

    let state = Arc::new(AppState::from_config(config)?);
    let sweeper = state.limiter.spawn_sweeper(sweep_interval, idle_ttl);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RelayError::Config(format!("Failed to bind {}: {}", addr, e)))?;

    info!("Listening on http://{}", addr);
    info!("  POST /api/hf-translate - primary translation with fallback");
    info!("  POST /api/mymemory     - fallback provider only");
    info!("  POST /api/translate    - LibreTranslate passthrough");
    info!("  GET  /api/proxy?url=   - lyrics proxy");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    info!("Server stopped");
    Ok(())
}
