//! Prometheus metrics for the request endpoints
//!
//! - `active_requests` - delay requests currently sleeping
//! - `http_requests_total{method,endpoint,statusCode}` - completed requests
//! - `prober_build_info{version}` - always 1
//!
//! Each `Metrics` owns its registry, so tests never share counters.

use axum::http::StatusCode;
use prometheus::{Encoder, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

pub type SharedMetrics = Arc<Metrics>;

pub struct Metrics {
    registry: Registry,
    active_requests: IntGauge,
    requests_total: IntCounterVec,
}

/// Build a fresh registry with all collectors registered
pub fn create_metrics() -> Result<SharedMetrics, prometheus::Error> {
    Metrics::new().map(Arc::new)
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let active_requests = IntGauge::new("active_requests", "Number of active requests")?;
        registry.register(Box::new(active_requests.clone()))?;

        let requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Number of HTTP requests"),
            &["method", "endpoint", "statusCode"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let build_info = IntGaugeVec::new(
            Opts::new("prober_build_info", "Build information for prober"),
            &["version"],
        )?;
        registry.register(Box::new(build_info.clone()))?;
        build_info
            .with_label_values(&[env!("CARGO_PKG_VERSION")])
            .set(1);

        Ok(Self {
            registry,
            active_requests,
            requests_total,
        })
    }

    /// Count a finished request
    pub fn record_request(&self, method: &str, endpoint: &str, status: StatusCode) {
        self.requests_total
            .with_label_values(&[method, endpoint, status.as_str()])
            .inc();
    }

    /// Bump the active request gauge until the guard drops
    pub fn track_active(&self) -> ActiveRequestGuard {
        self.active_requests.inc();
        ActiveRequestGuard {
            gauge: self.active_requests.clone(),
        }
    }

    pub fn active_requests(&self) -> i64 {
        self.active_requests.get()
    }

    pub fn request_count(&self, method: &str, endpoint: &str, status: StatusCode) -> u64 {
        self.requests_total
            .with_label_values(&[method, endpoint, status.as_str()])
            .get()
    }

    /// Render all metrics in Prometheus text format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Decrements `active_requests` on drop
///
/// Runs on normal return and when the handler future is dropped early.
#[must_use = "the gauge is decremented as soon as the guard drops"]
pub struct ActiveRequestGuard {
    gauge: IntGauge,
}

impl Drop for ActiveRequestGuard {
    fn drop(&mut self) {
        self.gauge.dec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_contains_all_collectors() {
        let metrics = create_metrics().unwrap();
        metrics.record_request("GET", "/delay/:seconds", StatusCode::OK);

        let body = metrics.encode().unwrap();
        assert!(body.contains("active_requests 0"));
        assert!(body.contains(
            r#"http_requests_total{endpoint="/delay/:seconds",method="GET",statusCode="200"} 1"#
        ));
        assert!(body.contains(&format!(
            r#"prober_build_info{{version="{}"}} 1"#,
            env!("CARGO_PKG_VERSION")
        )));
    }

    #[test]
    fn test_guard_restores_gauge() {
        let metrics = create_metrics().unwrap();

        let first = metrics.track_active();
        let second = metrics.track_active();
        assert_eq!(metrics.active_requests(), 2);

        drop(first);
        assert_eq!(metrics.active_requests(), 1);
        drop(second);
        assert_eq!(metrics.active_requests(), 0);
    }

    #[test]
    fn test_counters_keyed_by_status() {
        let metrics = create_metrics().unwrap();
        metrics.record_request("POST", "/config", StatusCode::CREATED);
        metrics.record_request("POST", "/config", StatusCode::CREATED);
        metrics.record_request("POST", "/config", StatusCode::BAD_REQUEST);

        assert_eq!(metrics.request_count("POST", "/config", StatusCode::CREATED), 2);
        assert_eq!(metrics.request_count("POST", "/config", StatusCode::BAD_REQUEST), 1);
        assert_eq!(metrics.request_count("GET", "/config", StatusCode::CREATED), 0);
    }

    #[test]
    fn test_registries_are_isolated() {
        let a = create_metrics().unwrap();
        let b = create_metrics().unwrap();
        a.record_request("GET", "/delay/:seconds", StatusCode::OK);

        assert_eq!(b.request_count("GET", "/delay/:seconds", StatusCode::OK), 0);
    }
}
