//! Integration tests for the HTTP API
//!
//! Each test serves the real router on an ephemeral port, backed by a
//! DeviceManager over the mock transport, and talks to it with reqwest.

use printgate_serial::{DeviceManager, LinkConfig, MockTransport, MockTransportHandle};
use printgate_server::{CommandResponse, IndexResponse, StatusResponse};
use reqwest::StatusCode;
use rstest::rstest;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

struct TestServer {
    addr: SocketAddr,
    manager: Arc<DeviceManager>,
    stop: Option<oneshot::Sender<()>>,
    task: tokio::task::JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    async fn start(manager: DeviceManager) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let manager = Arc::new(manager);
        let (stop, stopped) = oneshot::channel::<()>();

        let task = tokio::spawn(printgate_server::serve(
            listener,
            Arc::clone(&manager),
            async move {
                let _ = stopped.await;
            },
        ));

        Self {
            addr,
            manager,
            stop: Some(stop),
            task,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        (&mut self.task).await.unwrap().unwrap();
        self.manager.shutdown().await;
    }
}

fn config() -> LinkConfig {
    LinkConfig {
        poll_interval: Duration::from_millis(5),
        error_backoff: Duration::from_millis(5),
        ..LinkConfig::default()
    }
}

async fn connected_server() -> (TestServer, MockTransportHandle) {
    let manager = DeviceManager::new(config());
    let (transport, handle) = MockTransport::new();
    manager.initialize_with(transport.into());
    (TestServer::start(manager).await, handle)
}

async fn post(server: &TestServer, path: &str) -> (StatusCode, CommandResponse) {
    let response = reqwest::Client::new()
        .post(server.url(path))
        .send()
        .await
        .unwrap();
    let status = response.status();
    (status, response.json().await.unwrap())
}

async fn get_status(server: &TestServer) -> StatusResponse {
    reqwest::get(server.url("/api/status"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_index_lists_endpoints() {
    let server = TestServer::start(DeviceManager::new(config())).await;

    let index: IndexResponse = reqwest::get(server.url("/"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(index.status_url, "/api/status");
    assert_eq!(index.enroll_url, "/api/enroll/<id> (POST)");

    server.stop().await;
}

#[tokio::test]
async fn test_status_reports_last_line() {
    let (server, handle) = connected_server().await;

    handle.push_line("R:OK");
    let reached = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let status = get_status(&server).await;
            if status.last_message == "R:OK" {
                break status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    assert_eq!(reached.status, "OK");
    assert!(reached.is_connected);
    assert_eq!(reached.status_file_content, "");

    server.stop().await;
}

#[tokio::test]
async fn test_status_without_device() {
    let server = TestServer::start(DeviceManager::new(config())).await;

    let status = get_status(&server).await;

    assert_eq!(status.status, "OK");
    assert!(!status.is_connected);
    assert_eq!(status.last_message, "Initializing...");

    server.stop().await;
}

#[tokio::test]
async fn test_status_includes_file_content() {
    let dir = tempfile::tempdir().unwrap();
    let manager = DeviceManager::new(LinkConfig {
        status_file: Some(dir.path().join("last_message.txt")),
        ..config()
    });
    let (transport, handle) = MockTransport::new();
    manager.initialize_with(transport.into());
    let server = TestServer::start(manager).await;

    handle.push_line("ACCESS GRANTED");
    let status = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let status = get_status(&server).await;
            if status.last_message == "ACCESS GRANTED" {
                break status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    assert!(status.status_file_content.ends_with("] ACCESS GRANTED"));

    server.stop().await;
}

#[rstest]
#[case("/api/verify", "V")]
#[case("/api/cancel", "C")]
#[tokio::test]
async fn test_simple_commands(#[case] path: &str, #[case] token: &str) {
    let (server, handle) = connected_server().await;

    let (status, body) = post(&server, path).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.success);
    assert_eq!(body.message.unwrap(), format!("Command '{token}' sent."));
    assert_eq!(handle.written_tokens(), vec![token.to_string()]);

    server.stop().await;
}

#[tokio::test]
async fn test_verify_without_device_is_unavailable() {
    let server = TestServer::start(DeviceManager::new(config())).await;

    let (status, body) = post(&server, "/api/verify").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(!body.success);
    assert!(body.error.unwrap().starts_with("Not connected"));

    server.stop().await;
}

#[tokio::test]
async fn test_enroll_sends_id_then_enroll() {
    let (server, handle) = connected_server().await;

    let (status, body) = post(&server, "/api/enroll/42").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.success);
    assert!(body.message.unwrap().starts_with("ID 42 set."));
    assert_eq!(handle.written_tokens(), vec!["I42", "E"]);

    server.stop().await;
}

#[rstest]
#[case("128")]
#[case("-1")]
#[case("abc")]
#[tokio::test]
async fn test_enroll_rejects_invalid_id(#[case] id: &str) {
    let (server, handle) = connected_server().await;

    let (status, body) = post(&server, &format!("/api/enroll/{id}")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!body.success);
    assert!(body.error.is_some());
    assert!(handle.write_attempts().is_empty());

    server.stop().await;
}

#[tokio::test]
async fn test_enroll_id_step_failure() {
    let (server, handle) = connected_server().await;
    handle.fail_writes("write timeout");

    let (status, body) = post(&server, "/api/enroll/5").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body.error.unwrap(),
        "ID command failed: Serial write error: write timeout"
    );
    assert_eq!(handle.written_tokens(), vec!["I5"]);

    let status = get_status(&server).await;
    assert!(!status.is_connected);
    assert_eq!(status.last_message, "SERIAL ERROR (write): write timeout");

    server.stop().await;
}

#[tokio::test]
async fn test_enroll_enter_step_failure() {
    let (server, handle) = connected_server().await;
    handle.fail_nth_write(2, "write timeout");

    let (status, body) = post(&server, "/api/enroll/5").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(!body.success);
    assert_eq!(
        body.error.unwrap(),
        "ENROLL command failed: Serial write error: write timeout"
    );
    assert_eq!(handle.written_tokens(), vec!["I5", "E"]);

    server.stop().await;
}
