//! Shutdown flag and termination signals
//!
//! The flag is a `watch` channel holding a bool:
//! - `ShutdownController` sets it once (later calls are no-ops)
//! - `ShutdownSignal` is cloned into handlers to poll or await it
//!
//! `TerminationSignals` turns SIGTERM/SIGINT into a future.

use crate::error::ServerError;
use tokio::sync::watch;
use tracing::{debug, info};

/// Read side of the shutdown flag
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Wait for shutdown signal
    pub async fn wait(&mut self) {
        // Wait until the value becomes true
        while !*self.receiver.borrow() {
            if self.receiver.changed().await.is_err() {
                // Sender dropped, treat as shutdown
                break;
            }
        }
    }

    /// Check if shutdown was signaled (non-blocking)
    pub fn is_shutdown(&self) -> bool {
        *self.receiver.borrow()
    }
}

/// Write side of the shutdown flag
#[derive(Debug)]
pub struct ShutdownController {
    sender: watch::Sender<bool>,
}

impl ShutdownController {
    /// Set the flag
    ///
    /// Returns `true` only for the call that flipped it.
    pub fn shutdown(&self) -> bool {
        let flipped = self.sender.send_if_modified(|in_shutdown| {
            if *in_shutdown {
                false
            } else {
                *in_shutdown = true;
                true
            }
        });

        if flipped {
            info!("Shutdown signal sent");
        } else {
            debug!("Shutdown already in progress");
        }
        flipped
    }

    pub fn is_shutdown(&self) -> bool {
        *self.sender.borrow()
    }

    /// New reader for the same flag
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            receiver: self.sender.subscribe(),
        }
    }
}

/// Create a new shutdown signal pair
///
/// Returns (controller, signal) where:
/// - controller: Used to trigger shutdown
/// - signal: Cloned and passed to components that need to listen
pub fn shutdown_channel() -> (ShutdownController, ShutdownSignal) {
    let (sender, receiver) = watch::channel(false);
    (ShutdownController { sender }, ShutdownSignal { receiver })
}

/// OS termination signals
///
/// Handlers are installed by `register()`, before the server binds.
#[cfg(unix)]
pub struct TerminationSignals {
    sigterm: tokio::signal::unix::Signal,
    sigint: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl TerminationSignals {
    pub fn register() -> Result<Self, ServerError> {
        use tokio::signal::unix::{signal, SignalKind};

        let sigterm = signal(SignalKind::terminate()).map_err(ServerError::Signal)?;
        let sigint = signal(SignalKind::interrupt()).map_err(ServerError::Signal)?;
        Ok(Self { sigterm, sigint })
    }

    /// Wait for SIGTERM or SIGINT, returning the signal name
    pub async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.sigterm.recv() => {
                info!("Received SIGTERM");
                "SIGTERM"
            }
            _ = self.sigint.recv() => {
                info!("Received SIGINT");
                "SIGINT"
            }
        }
    }
}

/// Ctrl+C only (non-unix)
#[cfg(not(unix))]
pub struct TerminationSignals;

#[cfg(not(unix))]
impl TerminationSignals {
    pub fn register() -> Result<Self, ServerError> {
        Ok(Self)
    }

    pub async fn recv(&mut self) -> &'static str {
        use tracing::error;

        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to wait for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C");
        "CTRL_C"
    }
}
