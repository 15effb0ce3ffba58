//! HTTP server: JSON-RPC endpoint, health probes and metrics

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use eyre::eyre;
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::dispatcher::RequestDispatcher;
use crate::error::PARSE_ERROR;
use crate::metrics::OracleMetrics;

/// Combined app state
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<RequestDispatcher>,
    pub metrics: Arc<OracleMetrics>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(dispatcher: Arc<RequestDispatcher>, metrics: Arc<OracleMetrics>) -> Self {
        Self {
            dispatcher,
            metrics,
            started_at: Instant::now(),
        }
    }
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub requests_total: u64,
    pub chain_query_failures: u64,
}

/// JSON-RPC endpoint. Always answers 200 with an envelope, including for
/// bodies that are not JSON.
async fn json_rpc(State(state): State<AppState>, body: Bytes) -> Json<Value> {
    let request: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            debug!(error = %e, "Unparseable JSON-RPC body");
            state.metrics.record_request("invalid", "parse_error");
            return Json(json!({
                "error": {"code": PARSE_ERROR, "message": "parse error"},
                "id": null,
                "jsonrpc": "2.0",
                "result": null,
            }));
        }
    };
    Json(state.dispatcher.dispatch(request).await)
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        requests_total: state.metrics.total_requests(),
        chain_query_failures: state.metrics.chain_query_failures_total.get(),
    })
}

/// Liveness probe (always returns OK if server is running)
async fn liveness() -> &'static str {
    "OK"
}

/// Prometheus metrics endpoint
async fn prometheus_metrics(State(state): State<AppState>) -> Response {
    let encoder = TextEncoder::new();
    let metric_families = state.metrics.registry.gather();
    let mut buffer = Vec::new();

    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response();
    }

    match Response::builder()
        .header(header::CONTENT_TYPE, encoder.format_type())
        .body(axum::body::Body::from(buffer))
    {
        Ok(resp) => resp,
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to build metrics response",
        )
            .into_response(),
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", post(json_rpc))
        .route("/health", get(health_check))
        .route("/healthz", get(liveness))
        .route("/metrics", get(prometheus_metrics))
        .with_state(state)
}

/// Serve until `shutdown` resolves, then drain in-flight requests
pub async fn start_server<F>(
    bind_address: &str,
    port: u16,
    state: AppState,
    shutdown: F,
) -> eyre::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr: SocketAddr = format!("{}:{}", bind_address, port)
        .parse()
        .map_err(|e| eyre!("Invalid bind address {}:{}: {}", bind_address, port, e))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Oracle listening on {}", addr);
    info!("  POST /   - JSON-RPC");
    info!("  /health  - Health status (JSON)");
    info!("  /metrics - Prometheus metrics");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Oracle server stopped");
    Ok(())
}
