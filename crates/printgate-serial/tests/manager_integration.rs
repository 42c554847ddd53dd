//! Integration tests for DeviceManager
//!
//! These tests drive the manager end to end over the mock transport:
//! status propagation from the reader, command forwarding, the enroll
//! sequence, failure teardown and concurrent access.

use printgate_core::EnrollId;
use printgate_serial::{
    DeviceManager, EnrollError, LinkConfig, LinkError, LinkState, MockTransport,
    MockTransportHandle,
};
use std::sync::Arc;
use std::time::Duration;

fn fast_config() -> LinkConfig {
    LinkConfig {
        poll_interval: Duration::from_millis(5),
        error_backoff: Duration::from_millis(5),
        shutdown_timeout: Duration::from_millis(500),
        ..LinkConfig::default()
    }
}

fn connected() -> (DeviceManager, MockTransportHandle) {
    let manager = DeviceManager::new(fast_config());
    let (transport, handle) = MockTransport::new();
    manager.initialize_with(transport.into());
    (manager, handle)
}

async fn wait_until(manager: &DeviceManager, expected: &str) {
    let reached = tokio::time::timeout(Duration::from_secs(2), async {
        while manager.last_status() != expected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;

    assert!(
        reached.is_ok(),
        "status never became {:?}, last was {:?}",
        expected,
        manager.last_status()
    );
}

/// Status lines arrive in order and the latest one wins
#[tokio::test]
async fn test_status_follows_controller_output() {
    let (manager, handle) = connected();

    handle.push_line("PLACE FINGER");
    wait_until(&manager, "PLACE FINGER").await;

    handle.push_bytes(b"REMOVE FINGER\r\n");
    wait_until(&manager, "REMOVE FINGER").await;

    // Blank lines never replace the status
    handle.push_bytes(b"\r\n\n");
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(manager.last_status(), "REMOVE FINGER");

    manager.shutdown().await;
}

/// A line split across several reads is published once complete
#[tokio::test]
async fn test_partial_line_is_buffered() {
    let (manager, handle) = connected();

    handle.push_bytes(b"ENROLL ");
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(manager.last_status(), "Initializing...");

    handle.push_bytes(b"OK\n");
    wait_until(&manager, "ENROLL OK").await;

    manager.shutdown().await;
}

/// Enroll writes the identifier first, then the enroll token
#[tokio::test]
async fn test_enroll_sequence() {
    let (manager, handle) = connected();

    let detail = manager.enroll(EnrollId::new(5).unwrap()).await.unwrap();

    assert!(detail.starts_with("ID 5 set."));
    assert_eq!(handle.written_tokens(), vec!["I5", "E"]);

    manager.shutdown().await;
}

/// A failed identifier step means enrollment mode is never requested
#[tokio::test]
async fn test_enroll_stops_after_failed_id() {
    let (manager, handle) = connected();
    handle.fail_writes("write timeout");

    let err = manager.enroll(EnrollId::new(5).unwrap()).await.unwrap_err();

    assert!(matches!(err, EnrollError::SetId(LinkError::Write { .. })));
    assert_eq!(err.to_string(), "ID command failed: Serial write error: write timeout");
    assert_eq!(handle.written_tokens(), vec!["I5"]);
    assert_eq!(manager.state(), LinkState::Failed);
    assert_eq!(manager.last_status(), "SERIAL ERROR (write): write timeout");

    manager.shutdown().await;
}

/// A failure on the enroll step is reported after the identifier was sent
#[tokio::test]
async fn test_enroll_fails_on_enter_step() {
    let (manager, handle) = connected();
    handle.fail_nth_write(2, "write timeout");

    let err = manager.enroll(EnrollId::new(5).unwrap()).await.unwrap_err();

    assert!(matches!(err, EnrollError::EnterEnroll(LinkError::Write { .. })));
    assert!(err.to_string().starts_with("ENROLL command failed"));
    assert_eq!(handle.written_tokens(), vec!["I5", "E"]);
    assert_eq!(manager.state(), LinkState::Failed);
    assert_eq!(manager.last_status(), "SERIAL ERROR (write): write timeout");

    manager.shutdown().await;
}

/// Transient read anomalies are logged and the reader keeps going
#[tokio::test]
async fn test_reader_survives_transient_fault() {
    let (manager, handle) = connected();

    handle.hiccup_reads("operation timed out");
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(manager.is_connected());

    handle.push_line("R:OK");
    wait_until(&manager, "R:OK").await;

    assert!(manager.is_connected());
    assert_eq!(manager.state(), LinkState::Connected);
    assert!(!handle.is_closed());

    manager.shutdown().await;
}

/// A reconnect that fails after a teardown leaves the manager disconnected
#[tokio::test]
async fn test_failed_reconnect_after_teardown() {
    let (manager, handle) = connected();

    handle.fail_writes("broken pipe");
    manager.verify().await.unwrap_err();
    assert_eq!(manager.state(), LinkState::Failed);

    assert!(manager.initialize("/dev/printgate-missing").is_err());

    assert_eq!(manager.state(), LinkState::Disconnected);
    assert_eq!(manager.last_status(), "SENSOR: ERROR - serial connection failed.");

    manager.shutdown().await;
}

/// Enroll without any link names the identifier step
#[tokio::test]
async fn test_enroll_without_link() {
    let manager = DeviceManager::new(fast_config());

    let err = manager.enroll(EnrollId::new(1).unwrap()).await.unwrap_err();

    assert!(matches!(err, EnrollError::SetId(LinkError::NotConnected { .. })));
    assert!(err.to_string().starts_with("ID command failed: "));
}

/// Read faults tear the link down and are reported in the status
#[tokio::test]
async fn test_read_fault_disconnects() {
    let (manager, handle) = connected();
    assert!(manager.is_connected());

    handle.fail_reads("device reports an error");
    wait_until(&manager, "SERIAL ERROR: device reports an error").await;

    assert!(!manager.is_connected());
    assert_eq!(manager.state(), LinkState::Failed);
    assert!(handle.is_closed());

    // No automatic reconnect; commands fail fast
    let err = manager.verify().await.unwrap_err();
    assert!(err.is_connection_unavailable());
    assert!(handle.write_attempts().is_empty());

    manager.shutdown().await;
    assert_eq!(manager.state(), LinkState::Failed);
}

/// Status queries race with the reader and with command senders
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_commands_and_queries() {
    let (manager, handle) = connected();
    let manager = Arc::new(manager);

    let mut tasks = Vec::new();
    for i in 0..8 {
        let manager = Arc::clone(&manager);
        tasks.push(tokio::spawn(async move {
            for _ in 0..10 {
                if i % 2 == 0 {
                    manager.verify().await.unwrap();
                } else {
                    manager.cancel().await.unwrap();
                }
                let _ = manager.last_status();
            }
        }));
    }

    for n in 0..20 {
        handle.push_line(&format!("LINE {n}"));
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    for task in tasks {
        task.await.unwrap();
    }

    wait_until(&manager, "LINE 19").await;

    // Every token was written whole, one per attempt
    let tokens = handle.written_tokens();
    assert_eq!(tokens.len(), 80);
    assert!(tokens.iter().all(|t| t == "V" || t == "C"));
    assert_eq!(tokens.iter().filter(|t| *t == "V").count(), 40);

    manager.shutdown().await;
}

/// Shutdown closes the port and leaves the last status readable
#[tokio::test]
async fn test_shutdown_releases_port() {
    let (manager, handle) = connected();

    handle.push_line("R:OK");
    wait_until(&manager, "R:OK").await;

    manager.shutdown().await;
    assert!(handle.is_closed());
    assert!(!manager.is_connected());
    assert_eq!(manager.state(), LinkState::Disconnected);
    assert_eq!(manager.last_status(), "R:OK");

    // Idempotent
    manager.shutdown().await;
}

/// Status updates are mirrored to the configured file
#[tokio::test]
async fn test_status_file_mirror() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("last_message.txt");

    let manager = DeviceManager::new(LinkConfig {
        status_file: Some(path.clone()),
        ..fast_config()
    });
    let (transport, handle) = MockTransport::new();
    manager.initialize_with(transport.into());

    handle.push_line("ENROLL: place finger");
    wait_until(&manager, "ENROLL: place finger").await;

    let content = manager.status_file().unwrap().read().unwrap();
    assert!(content.ends_with("] ENROLL: place finger"));

    manager.shutdown().await;
}

/// Opening a missing port leaves the manager usable in degraded mode
#[tokio::test]
async fn test_degraded_mode_after_open_failure() {
    let manager = DeviceManager::new(fast_config());

    let err = manager.initialize("/dev/printgate-missing").unwrap_err();
    assert!(matches!(err, LinkError::OpenFailed { .. }));
    assert_eq!(manager.last_status(), "SENSOR: ERROR - serial connection failed.");

    let err = manager.send_command("V").await.unwrap_err();
    assert!(matches!(err, LinkError::NotConnected { .. }));
    assert_eq!(
        manager.last_status(),
        "ERROR: not connected to the serial port (selected or default)."
    );

    // A working link can still be attached later
    let (transport, handle) = MockTransport::new();
    manager.initialize_with(transport.into());
    manager.send_command("V").await.unwrap();
    assert_eq!(handle.written_tokens(), vec!["V"]);

    manager.shutdown().await;
}
