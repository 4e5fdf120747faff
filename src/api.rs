//! HTTP surface: liveness, health, and the pending login QR.

use crate::controller::SharedState;
use atende_core::config::ApiConfig;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use tokio::sync::watch;
use tracing::info;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    bot: SharedState,
    api_key: Option<String>,
}

/// Constant-time string comparison for token checks.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Bearer token check. `None` when authorized, otherwise the rejection.
fn check_auth(headers: &HeaderMap, api_key: &Option<String>) -> Option<(StatusCode, Json<Value>)> {
    let key = api_key.as_ref()?;

    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token {
        Some(token) if constant_time_eq(token, key) => None,
        Some(_) => Some((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "invalid token"})),
        )),
        None => Some((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "missing or malformed Authorization header"})),
        )),
    }
}

/// `GET /`
async fn root() -> &'static str {
    "O bot está funcionando! 🚀"
}

/// `GET /health`
async fn health(State(state): State<ApiState>) -> Json<Value> {
    let bot = state.bot.read().await;
    Json(json!({
        "status": "ok",
        "message": "Bot ativo e saudável",
        "phase": bot.phase.as_str(),
        "uptime_secs": bot.started_at.elapsed().as_secs(),
        "qr_generated_at": bot.pending_qr.as_ref().map(|q| q.generated_at.to_rfc3339()),
    }))
}

/// `GET /qr`: the pending login QR as PNG.
async fn qr(headers: HeaderMap, State(state): State<ApiState>) -> Response {
    if let Some(rejection) = check_auth(&headers, &state.api_key) {
        return rejection.into_response();
    }

    let bot = state.bot.read().await;
    match &bot.pending_qr {
        Some(pending) => (
            [
                (header::CONTENT_TYPE, "image/png"),
                (header::CACHE_CONTROL, "no-store"),
            ],
            pending.png.clone(),
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"status": "no_qr", "message": "Nenhum QR Code pendente"})),
        )
            .into_response(),
    }
}

/// Build the axum router with shared state.
fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/qr", get(qr))
        .with_state(state)
}

/// Serve until `shutdown` flips to true. Bind failures are returned.
pub async fn serve(
    config: &ApiConfig,
    bot: SharedState,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let api_key = if config.api_key.is_empty() {
        None
    } else {
        Some(config.api_key.clone())
    };
    let app = build_router(ApiState { bot, api_key });

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            while shutdown.changed().await.is_ok() {
                if *shutdown.borrow() {
                    break;
                }
            }
        })
        .await
}
