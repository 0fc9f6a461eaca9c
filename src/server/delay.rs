//! Artificial request delays
//!
//! Two modes:
//! - `sleep_full` ignores shutdown and always sleeps the whole duration
//! - `sleep_graceful` sleeps in one-second steps and stops early once
//!   shutdown begins, returning how many steps it started

use super::shutdown::ShutdownSignal;
use crate::error::ApiError;
use std::time::Duration;
use tracing::debug;

/// Granularity of an interruptible delay
pub const DELAY_STEP: Duration = Duration::from_secs(1);

/// Parse a delay path parameter as whole seconds
///
/// Negative, fractional, and non-numeric values are rejected.
pub fn parse_delay_seconds(raw: &str) -> Result<u64, ApiError> {
    raw.parse::<u64>()
        .map_err(|_| ApiError::InvalidDelay(raw.to_string()))
}

/// Sleep for `seconds`, regardless of shutdown
pub async fn sleep_full(seconds: u64) {
    if seconds == 0 {
        return;
    }
    tokio::time::sleep(Duration::from_secs(seconds)).await;
}

/// Sleep for up to `seconds`, stopping early on shutdown
///
/// Returns the number of one-second steps started. A step cut short by
/// shutdown still counts, so the result is within one second of the
/// wall time spent.
pub async fn sleep_graceful(seconds: u64, shutdown: &ShutdownSignal) -> u64 {
    let mut shutdown = shutdown.clone();
    let mut elapsed = 0;

    while elapsed < seconds {
        if shutdown.is_shutdown() {
            break;
        }
        elapsed += 1;

        tokio::select! {
            _ = tokio::time::sleep(DELAY_STEP) => {}
            _ = shutdown.wait() => {}
        }
    }

    if elapsed < seconds {
        debug!(requested = seconds, elapsed, "Delay interrupted by shutdown");
    }
    elapsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::shutdown::shutdown_channel;
    use tokio::time::Instant;

    #[test]
    fn test_parse_delay_seconds() {
        assert_eq!(parse_delay_seconds("0"), Ok(0));
        assert_eq!(parse_delay_seconds("42"), Ok(42));
        assert!(parse_delay_seconds("-1").is_err());
        assert!(parse_delay_seconds("1.5").is_err());
        assert!(parse_delay_seconds("abc").is_err());
        assert!(parse_delay_seconds("").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_full_waits_whole_duration() {
        let start = Instant::now();
        sleep_full(5).await;
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_full_ignores_shutdown() {
        let (controller, _signal) = shutdown_channel();
        controller.shutdown();

        let start = Instant::now();
        sleep_full(3).await;
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_delay_returns_immediately() {
        let (_controller, signal) = shutdown_channel();

        let start = Instant::now();
        sleep_full(0).await;
        assert_eq!(sleep_graceful(0, &signal).await, 0);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_graceful_runs_to_completion_without_shutdown() {
        let (_controller, signal) = shutdown_channel();

        let start = Instant::now();
        let elapsed = sleep_graceful(4, &signal).await;

        assert_eq!(elapsed, 4);
        assert!(start.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_graceful_stops_mid_step_on_shutdown() {
        let (controller, signal) = shutdown_channel();

        let handle = tokio::spawn(async move {
            let start = Instant::now();
            let elapsed = sleep_graceful(50, &signal).await;
            (elapsed, start.elapsed())
        });

        tokio::time::sleep(Duration::from_millis(2500)).await;
        controller.shutdown();

        let (elapsed, wall) = handle.await.unwrap();
        assert_eq!(elapsed, 3, "third step was in progress");
        assert!(wall < Duration::from_secs(3), "returned without finishing the step");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_graceful_skips_when_already_shut_down() {
        let (controller, signal) = shutdown_channel();
        controller.shutdown();

        let start = Instant::now();
        assert_eq!(sleep_graceful(10, &signal).await, 0);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
