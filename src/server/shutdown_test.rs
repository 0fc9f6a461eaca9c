//! Tests for the shutdown flag

use super::shutdown::*;
use std::time::Duration;

#[tokio::test]
async fn test_shutdown_channel_initially_not_shutdown() {
    let (controller, signal) = shutdown_channel();

    assert!(!signal.is_shutdown());
    assert!(!controller.is_shutdown());
}

#[tokio::test]
async fn test_shutdown_channel_triggers_shutdown() {
    let (controller, signal) = shutdown_channel();

    assert!(controller.shutdown());

    assert!(signal.is_shutdown());
    assert!(controller.is_shutdown());
}

/// Second trigger is a no-op and the flag never reverts
#[tokio::test]
async fn test_shutdown_is_idempotent() {
    let (controller, signal) = shutdown_channel();

    assert!(controller.shutdown(), "first trigger flips the flag");
    assert!(!controller.shutdown(), "second trigger is ignored");
    assert!(!controller.shutdown());

    assert!(signal.is_shutdown());
}

#[tokio::test]
async fn test_shutdown_wait_completes_on_signal() {
    let (controller, mut signal) = shutdown_channel();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        controller.shutdown();
        // keep the sender alive past the flip
        tokio::time::sleep(Duration::from_millis(500)).await;
    });

    let result = tokio::time::timeout(Duration::from_secs(1), signal.wait()).await;

    assert!(
        result.is_ok(),
        "wait() should complete when shutdown triggered"
    );
    assert!(signal.is_shutdown());
}

#[tokio::test]
async fn test_wait_returns_immediately_when_already_shut_down() {
    let (controller, mut signal) = shutdown_channel();
    controller.shutdown();

    let result = tokio::time::timeout(Duration::from_millis(10), signal.wait()).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_wait_pends_without_shutdown() {
    let (_controller, mut signal) = shutdown_channel();

    let result = tokio::time::timeout(Duration::from_millis(50), signal.wait()).await;
    assert!(result.is_err(), "wait() must not complete on its own");
}

#[tokio::test]
async fn test_shutdown_signal_clones_and_subscribers_share_state() {
    let (controller, signal) = shutdown_channel();
    let signal2 = signal.clone();
    let signal3 = controller.subscribe();

    assert!(!signal.is_shutdown());
    assert!(!signal2.is_shutdown());
    assert!(!signal3.is_shutdown());

    controller.shutdown();

    assert!(signal.is_shutdown());
    assert!(signal2.is_shutdown());
    assert!(signal3.is_shutdown());
}
