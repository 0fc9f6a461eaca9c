//! HTTP endpoints
//!
//! - `/startup`, `/readiness`, `/liveness` - probes with configurable delay
//! - `/config` - update probe delays
//! - `/delay/{seconds}` - sleep the full duration
//! - `/graceDelay/{seconds}` - sleep, stopping early on shutdown
//! - `/metrics` - Prometheus metrics in text format
//!
//! Probes and `/metrics` are not counted in `http_requests_total`.

use super::delay::{parse_delay_seconds, sleep_full, sleep_graceful};
use super::metrics::SharedMetrics;
use super::shutdown::ShutdownSignal;
use crate::config::{ProbeDelays, ProbeDelaysBody, ProbeKind};
use crate::error::ApiError;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header::CONTENT_TYPE, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::{debug, info, warn};

/// Endpoint labels used in `http_requests_total`
pub const CONFIG_ENDPOINT: &str = "/config";
pub const DELAY_ENDPOINT: &str = "/delay/:seconds";
pub const GRACE_DELAY_ENDPOINT: &str = "/graceDelay/:seconds";

/// State shared by every handler
///
/// Built once at startup; cloning shares the same store, metrics, and flag.
#[derive(Clone)]
pub struct AppState {
    pub probe_delays: ProbeDelays,
    pub metrics: SharedMetrics,
    pub shutdown: ShutdownSignal,
}

impl AppState {
    pub fn new(
        probe_delays: ProbeDelays,
        metrics: SharedMetrics,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            probe_delays,
            metrics,
            shutdown,
        }
    }
}

async fn probe(state: &AppState, kind: ProbeKind) -> Json<serde_json::Value> {
    let delay = state.probe_delays.delay(kind);
    if !delay.is_zero() {
        debug!(probe = kind.as_str(), delay_secs = delay.as_secs(), "Delaying probe");
    }
    sleep_full(delay.as_secs()).await;
    Json(json!({ "message": kind.as_str() }))
}

async fn startup(State(state): State<AppState>) -> Json<serde_json::Value> {
    probe(&state, ProbeKind::Startup).await
}

async fn readiness(State(state): State<AppState>) -> Json<serde_json::Value> {
    probe(&state, ProbeKind::Readiness).await
}

async fn liveness(State(state): State<AppState>) -> Json<serde_json::Value> {
    probe(&state, ProbeKind::Liveness).await
}

/// Update probe delays
///
/// Returns 201 with the resulting configuration, or 400 if the body is
/// not a JSON object of string fields.
async fn post_config(State(state): State<AppState>, method: Method, body: Bytes) -> Response {
    let response = match serde_json::from_slice::<ProbeDelaysBody>(&body) {
        Ok(update) => {
            let values = state.probe_delays.apply(&update);
            info!(
                startup = values.startup,
                readiness = values.readiness,
                liveness = values.liveness,
                "Probe delays updated"
            );
            (StatusCode::CREATED, Json(ProbeDelaysBody::from(values))).into_response()
        }
        Err(e) => {
            warn!(error = %e, "Rejected probe delay update");
            ApiError::InvalidJson(e.to_string()).into_response()
        }
    };

    state
        .metrics
        .record_request(method.as_str(), CONFIG_ENDPOINT, response.status());
    response
}

/// Sleep the full duration
async fn delay(
    State(state): State<AppState>,
    method: Method,
    Path(seconds): Path<String>,
) -> Response {
    let seconds = match parse_delay_seconds(&seconds) {
        Ok(seconds) => seconds,
        Err(e) => return reject(&state, &method, DELAY_ENDPOINT, e),
    };

    let _active = state.metrics.track_active();
    sleep_full(seconds).await;

    state
        .metrics
        .record_request(method.as_str(), DELAY_ENDPOINT, StatusCode::OK);
    (StatusCode::OK, Json(json!({ "message": seconds }))).into_response()
}

/// Sleep up to the requested duration, reporting the seconds actually spent
async fn grace_delay(
    State(state): State<AppState>,
    method: Method,
    Path(seconds): Path<String>,
) -> Response {
    let seconds = match parse_delay_seconds(&seconds) {
        Ok(seconds) => seconds,
        Err(e) => return reject(&state, &method, GRACE_DELAY_ENDPOINT, e),
    };

    let _active = state.metrics.track_active();
    let elapsed = sleep_graceful(seconds, &state.shutdown).await;

    state
        .metrics
        .record_request(method.as_str(), GRACE_DELAY_ENDPOINT, StatusCode::OK);
    (StatusCode::OK, Json(json!({ "message": elapsed }))).into_response()
}

fn reject(state: &AppState, method: &Method, endpoint: &str, error: ApiError) -> Response {
    debug!(endpoint, error = %error, "Rejected delay request");
    state
        .metrics
        .record_request(method.as_str(), endpoint, error.status());
    error.into_response()
}

/// Prometheus metrics handler
///
/// Returns metrics in Prometheus text format for scraping.
async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {}", e),
        )
            .into_response(),
    }
}

/// Build the router for all endpoints
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/startup", get(startup))
        .route("/readiness", get(readiness))
        .route("/liveness", get(liveness))
        .route("/config", post(post_config))
        .route("/delay/{seconds}", get(delay))
        .route("/graceDelay/{seconds}", get(grace_delay))
        .route("/metrics", get(self::metrics))
        .with_state(state)
}

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;
