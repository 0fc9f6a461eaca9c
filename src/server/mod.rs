//! HTTP server for probes, delay endpoints, and metrics
//!
//! Also owns graceful shutdown: SIGTERM/SIGINT set the shutdown flag,
//! interruptible delays return early, and the listener drains within a
//! fixed deadline.

pub mod delay;
mod http;
pub mod lifecycle;
pub mod metrics;
pub mod shutdown;

pub use http::{
    build_router, AppState, CONFIG_ENDPOINT, DELAY_ENDPOINT, GRACE_DELAY_ENDPOINT,
};
pub use lifecycle::{DrainOutcome, LifecycleState, Server};
pub use metrics::{create_metrics, ActiveRequestGuard, Metrics, SharedMetrics};
pub use shutdown::{shutdown_channel, ShutdownController, ShutdownSignal, TerminationSignals};

#[cfg(test)]
#[path = "shutdown_test.rs"]
mod shutdown_tests;
