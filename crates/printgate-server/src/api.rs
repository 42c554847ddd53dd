//! HTTP API over the device manager.
//!
//! Every handler is a thin translation: it calls one [`DeviceManager`]
//! operation and maps the outcome to a JSON body and status code. Command
//! failures map to `503 Service Unavailable` because they always mean the
//! controller link is down.
//!
//! | Route                   | Manager call          |
//! |-------------------------|-----------------------|
//! | `GET  /`                | none (index)          |
//! | `GET  /api/status`      | `last_status`, `state`|
//! | `POST /api/verify`      | `verify`              |
//! | `POST /api/enroll/{id}` | `enroll`              |
//! | `POST /api/cancel`      | `cancel`              |

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use printgate_core::EnrollId;
use printgate_serial::{DeviceManager, LinkError, LinkState};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Shared state for the axum handlers
#[derive(Debug, Clone)]
pub struct AppState {
    manager: Arc<DeviceManager>,
}

impl AppState {
    pub fn new(manager: Arc<DeviceManager>) -> Self {
        Self { manager }
    }
}

/// Body of `GET /`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexResponse {
    pub api_name: String,
    pub status_url: String,
    pub verify_url: String,
    pub enroll_url: String,
    pub cancel_url: String,
}

/// Body of `GET /api/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Always "OK"; the endpoint answers even without a device.
    pub status: String,
    pub is_connected: bool,
    pub state: LinkState,
    pub last_message: String,
    /// Raw status file content, empty when there is none.
    pub status_file_content: String,
}

/// Body of the command endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandResponse {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }
}

/// Handler failures and their HTTP mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request rejected before touching the device.
    #[error("{0}")]
    BadRequest(String),

    /// The controller link could not carry the command.
    #[error("{0}")]
    Unavailable(String),
}

impl From<LinkError> for ApiError {
    fn from(e: LinkError) -> Self {
        Self::Unavailable(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, Json(CommandResponse::failed(self.to_string()))).into_response()
    }
}

type ApiResult = Result<Json<CommandResponse>, ApiError>;

/// Build the API router.
pub fn router(manager: Arc<DeviceManager>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/status", get(status))
        .route("/api/verify", post(verify))
        .route("/api/enroll/{id}", post(enroll))
        .route("/api/cancel", post(cancel))
        .with_state(AppState::new(manager))
}

/// Serve the API on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns the I/O error that stopped the server.
pub async fn serve<F>(
    listener: TcpListener,
    manager: Arc<DeviceManager>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("HTTP API listening on {}", addr);
    }

    axum::serve(listener, router(manager))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn index() -> Json<IndexResponse> {
    Json(IndexResponse {
        api_name: "PrintGate fingerprint access controller".to_string(),
        status_url: "/api/status".to_string(),
        verify_url: "/api/verify (POST)".to_string(),
        enroll_url: "/api/enroll/<id> (POST)".to_string(),
        cancel_url: "/api/cancel (POST)".to_string(),
    })
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let manager = &state.manager;

    let status_file_content = match manager.status_file() {
        Some(file) if file.path().exists() => file.read().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read status file");
            "Could not read status file.".to_string()
        }),
        _ => String::new(),
    };

    Json(StatusResponse {
        status: "OK".to_string(),
        is_connected: manager.is_connected(),
        state: manager.state(),
        last_message: manager.last_status(),
        status_file_content,
    })
}

async fn verify(State(state): State<AppState>) -> ApiResult {
    let message = state.manager.verify().await?;
    Ok(Json(CommandResponse::ok(message)))
}

async fn cancel(State(state): State<AppState>) -> ApiResult {
    let message = state.manager.cancel().await?;
    Ok(Json(CommandResponse::ok(message)))
}

async fn enroll(State(state): State<AppState>, Path(raw): Path<String>) -> ApiResult {
    let id: EnrollId = raw.parse().map_err(|e: printgate_core::Error| {
        debug!(id = %raw, "Rejected enroll request");
        ApiError::BadRequest(e.to_string())
    })?;

    let message = state
        .manager
        .enroll(id)
        .await
        .map_err(|e| ApiError::Unavailable(e.to_string()))?;
    Ok(Json(CommandResponse::ok(message)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_error_maps_to_unavailable() {
        let error = ApiError::from(LinkError::not_connected("COM12"));
        assert!(matches!(error, ApiError::Unavailable(_)));
        assert_eq!(
            error.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_bad_request_status() {
        let response = ApiError::BadRequest("Enroll ID must be 0-127, got 128".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_command_response_omits_empty_fields() {
        let ok = serde_json::to_value(CommandResponse::ok("Command 'V' sent.")).unwrap();
        assert_eq!(ok, serde_json::json!({"success": true, "message": "Command 'V' sent."}));

        let failed = serde_json::to_value(CommandResponse::failed("boom")).unwrap();
        assert_eq!(failed, serde_json::json!({"success": false, "error": "boom"}));
    }
}
