//! Server lifecycle: Starting -> Serving -> Draining -> Stopped
//!
//! The serve loop runs in its own task. While serving, the controller
//! races that task (the listener dying) against the termination future
//! (an OS signal). Whichever finishes first starts the drain:
//! - the shutdown flag is set, which also stops the listener accepting
//! - in-flight requests get `drain_timeout` to finish
//! - past the deadline the serve task is aborted and the timeout is logged

use super::http::{build_router, AppState};
use super::shutdown::ShutdownController;
use crate::error::ServerError;
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Starting,
    Serving,
    Draining,
    Stopped,
}

/// How the drain ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every in-flight request finished before the deadline
    Completed,
    /// The deadline passed with requests still in flight
    TimedOut,
}

enum ShutdownTrigger {
    Signal(&'static str),
    ListenerExited(std::io::Error),
}

/// A bound server, ready to run
pub struct Server {
    listener: TcpListener,
    router: Router,
    shutdown: ShutdownController,
    drain_timeout: Duration,
    state: watch::Sender<LifecycleState>,
}

impl Server {
    /// Bind `addr` and prepare to serve
    ///
    /// A bind failure goes straight to `Stopped`.
    pub async fn bind(
        addr: SocketAddr,
        app: AppState,
        shutdown: ShutdownController,
        drain_timeout: Duration,
    ) -> Result<Self, ServerError> {
        info!(%addr, "Binding listener");
        match TcpListener::bind(addr).await {
            Ok(listener) => Ok(Self::from_listener(listener, app, shutdown, drain_timeout)),
            Err(source) => {
                error!(%addr, error = %source, "Bind failed, server stopped");
                Err(ServerError::Bind { addr, source })
            }
        }
    }

    /// Wrap an already-bound listener
    pub fn from_listener(
        listener: TcpListener,
        app: AppState,
        shutdown: ShutdownController,
        drain_timeout: Duration,
    ) -> Self {
        let (state, _) = watch::channel(LifecycleState::Starting);
        Self {
            listener,
            router: build_router(app),
            shutdown,
            drain_timeout,
            state,
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Observe lifecycle transitions
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Serve until `termination` resolves or the listener fails, then drain
    ///
    /// A drain timeout is not an error. A listener failure is.
    pub async fn run<F>(self, termination: F) -> Result<DrainOutcome, ServerError>
    where
        F: Future<Output = &'static str>,
    {
        let Self {
            listener,
            router,
            shutdown,
            drain_timeout,
            state,
        } = self;

        let port = listener.local_addr().map(|a| a.port()).ok();
        let mut drain_signal = shutdown.subscribe();
        let mut server: JoinHandle<std::io::Result<()>> = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move { drain_signal.wait().await })
                .await
        });

        transition(&state, LifecycleState::Serving);
        info!(port = ?port, "Server listening (HTTP)");

        let trigger = tokio::select! {
            result = &mut server => ShutdownTrigger::ListenerExited(listener_error(result)),
            signal = termination => ShutdownTrigger::Signal(signal),
        };

        transition(&state, LifecycleState::Draining);
        shutdown.shutdown();

        let outcome = match trigger {
            ShutdownTrigger::ListenerExited(e) => {
                error!(error = %e, "Server shutdown: listener failed");
                transition(&state, LifecycleState::Stopped);
                return Err(ServerError::Listener(e));
            }
            ShutdownTrigger::Signal(signal) => {
                info!(
                    signal,
                    timeout_secs = drain_timeout.as_secs(),
                    "Server shutdown: draining in-flight requests"
                );
                match tokio::time::timeout(drain_timeout, &mut server).await {
                    Ok(Ok(Ok(()))) => DrainOutcome::Completed,
                    Ok(result) => {
                        let e = listener_error(result);
                        error!(error = %e, "Listener failed while draining");
                        transition(&state, LifecycleState::Stopped);
                        return Err(ServerError::Listener(e));
                    }
                    Err(_) => {
                        server.abort();
                        warn!(
                            timeout_secs = drain_timeout.as_secs(),
                            "Drain deadline exceeded, abandoning in-flight requests"
                        );
                        DrainOutcome::TimedOut
                    }
                }
            }
        };

        transition(&state, LifecycleState::Stopped);
        Ok(outcome)
    }
}

fn transition(state: &watch::Sender<LifecycleState>, next: LifecycleState) {
    let previous = state.send_replace(next);
    info!(from = ?previous, to = ?next, "Lifecycle transition");
}

/// Error for a serve task that ended on its own
fn listener_error(result: Result<std::io::Result<()>, tokio::task::JoinError>) -> std::io::Error {
    match result {
        Ok(Ok(())) => std::io::Error::other("listener closed unexpectedly"),
        Ok(Err(e)) => e,
        Err(e) => std::io::Error::other(e),
    }
}

#[cfg(test)]
#[path = "lifecycle_test.rs"]
mod tests;
