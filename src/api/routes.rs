/// Route handlers

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{error_response, AppState};

/// Maps a reqwest status onto an axum one; upstream 5xx collapses to 502.
fn relay_status(status: reqwest::StatusCode) -> StatusCode {
    if status.is_server_error() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY)
    }
}

// ==================== Token views ====================

pub async fn get_tokens(State(state): State<Arc<AppState>>) -> Response {
    let views = state.store.read().await.views().clone();
    let connected = *state.connected.borrow();
    Json(json!({
        "connected": connected,
        "tokens": views,
    }))
    .into_response()
}

pub async fn get_raw_events(State(state): State<Arc<AppState>>) -> Response {
    let events = state.raw_log.read().await.snapshot();
    Json(json!({
        "count": events.len(),
        "events": events,
    }))
    .into_response()
}

// ==================== Candlestick proxy ====================

#[derive(Debug, Deserialize)]
pub struct CandlestickQuery {
    #[serde(rename = "poolAddress")]
    pub pool_address: Option<String>,
    #[serde(rename = "timeBucket")]
    pub time_bucket: Option<String>,
    pub limit: Option<u32>,
}

pub async fn get_candlesticks(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CandlestickQuery>,
) -> Result<Response, Response> {
    let Some(pool_address) = params.pool_address.filter(|p| !p.is_empty()) else {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "Pool address is required",
            None,
        ));
    };

    let time_bucket = params.time_bucket.unwrap_or_else(|| "1s".to_string());
    let limit = params.limit.unwrap_or(10_000);
    let end_time = Utc::now().timestamp();
    let url = format!(
        "{}?chain=sol&poolAddress={}&timeBucket={}&endTime={}&outlier=true&limit={}",
        state.config.candlestick_api_url, pool_address, time_bucket, end_time, limit
    );

    debug!(pool = %pool_address, bucket = %time_bucket, "Proxying candlestick request");

    let response = state
        .http
        .get(&url)
        .header(header::ACCEPT.as_str(), "application/json")
        .send()
        .await
        .map_err(|e| {
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
                Some(json!({ "message": e.to_string() })),
            )
        })?;

    let status = response.status();
    if !status.is_success() {
        let body_text = response.text().await.unwrap_or_default();
        warn!(status = %status, "Candlestick upstream error");

        // Upstream errors sometimes carry a structured message worth relaying.
        let message = serde_json::from_str::<Value>(&body_text)
            .ok()
            .and_then(|v| {
                ["message", "error"]
                    .iter()
                    .find_map(|k| v.get(*k).and_then(Value::as_str).map(str::to_string))
            })
            .unwrap_or_else(|| format!("Candlestick API failed with status: {}", status));

        return Err(error_response(
            relay_status(status),
            &message,
            Some(json!({
                "status": status.as_u16(),
                "url": url,
                "response": body_text,
            })),
        ));
    }

    let data: Value = response.json().await.map_err(|e| {
        error_response(
            StatusCode::BAD_GATEWAY,
            "Candlestick API returned a non-JSON body",
            Some(json!({ "message": e.to_string() })),
        )
    })?;

    if !data
        .get("candlesticks")
        .map(Value::is_array)
        .unwrap_or(false)
    {
        return Err(error_response(
            StatusCode::BAD_GATEWAY,
            "Invalid response from candlestick API: missing candlesticks array",
            Some(json!({ "responseData": data })),
        ));
    }

    Ok(Json(data).into_response())
}

// ==================== Trade construction proxy ====================

#[derive(Debug, Serialize, Deserialize)]
pub struct TradeRequest {
    #[serde(rename = "publicKey")]
    pub public_key: String,
    pub action: String,
    pub mint: String,
    #[serde(rename = "denominatedInSol")]
    pub denominated_in_sol: String,
    pub amount: f64,
    pub slippage: f64,
    #[serde(rename = "priorityFee")]
    pub priority_fee: f64,
    pub pool: String,
}

pub async fn post_trade(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TradeRequest>,
) -> Result<Response, Response> {
    if request.action != "buy" && request.action != "sell" {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "action must be \"buy\" or \"sell\"",
            None,
        ));
    }

    let response = state
        .http
        .post(&state.config.trade_api_url)
        .json(&request)
        .send()
        .await
        .map_err(|e| {
            error_response(
                StatusCode::BAD_GATEWAY,
                "Trade service unreachable",
                Some(json!({ "message": e.to_string() })),
            )
        })?;

    let status = response.status();
    if status == reqwest::StatusCode::OK {
        // Success body is a raw serialized unsigned transaction.
        let bytes = response.bytes().await.map_err(|e| {
            error_response(
                StatusCode::BAD_GATEWAY,
                "Failed to read trade service response",
                Some(json!({ "message": e.to_string() })),
            )
        })?;
        Ok((
            [(header::CONTENT_TYPE, "application/octet-stream")],
            bytes.to_vec(),
        )
            .into_response())
    } else {
        let body_text = response.text().await.unwrap_or_default();
        warn!(status = %status, "Trade upstream error");
        let message = if body_text.is_empty() {
            format!("Trade service failed with status: {}", status)
        } else {
            body_text.clone()
        };
        Err(error_response(
            relay_status(status),
            &message,
            Some(json!({ "status": status.as_u16() })),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::ingest::raw_log::RawEventLog;
    use crate::store::TokenStore;
    use tokio::sync::{watch, RwLock};

    fn test_state() -> Arc<AppState> {
        let config = Arc::new(Config::default());
        let store = Arc::new(RwLock::new(TokenStore::new(&config)));
        let raw_log = Arc::new(RwLock::new(RawEventLog::new(config.raw_log_capacity)));
        let (tx, rx) = watch::channel(false);
        // Keep the sender alive for the duration of the test state.
        std::mem::forget(tx);
        Arc::new(AppState::new(store, raw_log, rx, config))
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn candlesticks_require_pool_address() {
        let state = test_state();
        let query = Query(CandlestickQuery {
            pool_address: None,
            time_bucket: None,
            limit: None,
        });

        let response = get_candlesticks(State(state), query).await.unwrap_err();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Pool address is required");
    }

    #[tokio::test]
    async fn empty_pool_address_is_rejected_too() {
        let state = test_state();
        let query = Query(CandlestickQuery {
            pool_address: Some(String::new()),
            time_bucket: None,
            limit: None,
        });

        let response = get_candlesticks(State(state), query).await.unwrap_err();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn trade_rejects_unknown_action() {
        let state = test_state();
        let request = TradeRequest {
            public_key: "wallet".to_string(),
            action: "hold".to_string(),
            mint: "mint".to_string(),
            denominated_in_sol: "true".to_string(),
            amount: 0.5,
            slippage: 10.0,
            priority_fee: 0.00001,
            pool: "auto".to_string(),
        };

        let response = post_trade(State(state), Json(request)).await.unwrap_err();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn tokens_endpoint_reports_connectivity_and_views() {
        let state = test_state();
        let response = get_tokens(State(state)).await;
        let body = body_json(response).await;
        assert_eq!(body["connected"], false);
        assert!(body["tokens"]["all"].as_array().unwrap().is_empty());
        assert!(body["tokens"]["trending"].as_array().unwrap().is_empty());
    }

    #[test]
    fn upstream_server_errors_collapse_to_bad_gateway() {
        assert_eq!(
            relay_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            relay_status(reqwest::StatusCode::SERVICE_UNAVAILABLE),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            relay_status(reqwest::StatusCode::NOT_FOUND),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            relay_status(reqwest::StatusCode::TOO_MANY_REQUESTS),
            StatusCode::TOO_MANY_REQUESTS
        );
    }
}
