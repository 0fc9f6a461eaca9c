//! prober: an HTTP test double for orchestrator probes
//!
//! Serves startup/readiness/liveness probes with configurable delays,
//! delay endpoints that simulate slow work, and Prometheus metrics.
//! Shutdown drains in-flight requests within a bounded window.

pub mod config;
pub mod error;
pub mod server;
