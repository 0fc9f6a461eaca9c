use anyhow::Context;
use prober::config::{ProbeDelays, ServerConfig};
use prober::server::{
    create_metrics, shutdown_channel, AppState, DrainOutcome, Server, TerminationSignals,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting prober");

    let config = ServerConfig::from_env();
    let probe_delays = ProbeDelays::from_env();
    let initial = probe_delays.snapshot();
    info!(
        startup = initial.startup,
        readiness = initial.readiness,
        liveness = initial.liveness,
        "Probe delays loaded"
    );

    let metrics = create_metrics().context("Failed to create metrics registry")?;
    info!("Prometheus metrics registry initialized");

    // Create shutdown channel for coordinated shutdown
    let (shutdown_controller, shutdown_signal) = shutdown_channel();
    let state = AppState::new(probe_delays, metrics, shutdown_signal);

    let mut signals = TerminationSignals::register()?;

    let server = Server::bind(
        config.listen_addr(),
        state,
        shutdown_controller,
        config.drain_timeout,
    )
    .await?;

    match server.run(async move { signals.recv().await }).await? {
        DrainOutcome::Completed => info!("All in-flight requests finished"),
        DrainOutcome::TimedOut => warn!(
            timeout_secs = config.drain_timeout.as_secs(),
            "Shutdown timed out with requests still in flight"
        ),
    }

    info!("Server exiting");
    Ok(())
}
