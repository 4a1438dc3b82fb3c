/// HTTP surface: view snapshots plus thin proxies for charting and trades

pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::Config;
use crate::pipeline::{SharedRawLog, SharedStore};

const UPSTREAM_TIMEOUT_SECS: u64 = 30;

pub struct AppState {
    pub store: SharedStore,
    pub raw_log: SharedRawLog,
    pub connected: watch::Receiver<bool>,
    pub http: reqwest::Client,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        store: SharedStore,
        raw_log: SharedRawLog,
        connected: watch::Receiver<bool>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            store,
            raw_log,
            connected,
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(UPSTREAM_TIMEOUT_SECS))
                .build()
                .expect("Failed to create HTTP client"),
            config,
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/tokens", get(routes::get_tokens))
        .route("/api/tokens/raw", get(routes::get_raw_events))
        .route("/api/candlesticks", get(routes::get_candlesticks))
        .route("/api/trade", post(routes::post_trade))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(state: Arc<AppState>, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
    let addr: SocketAddr = state
        .config
        .listen_addr
        .parse()
        .context("Invalid listen address")?;

    let app = build_router(state);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("🌐 API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            info!("🛑 API server shutting down gracefully");
        })
        .await
        .context("API server error")?;

    Ok(())
}

/// Machine-readable error envelope: `error` plus optional `details`.
pub fn error_response(status: StatusCode, error: &str, details: Option<Value>) -> Response {
    let mut body = json!({ "error": error });
    if let Some(details) = details {
        body["details"] = details;
    }
    (status, Json(body)).into_response()
}
