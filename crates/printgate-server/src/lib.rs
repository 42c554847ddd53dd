//! HTTP gateway for the PrintGate fingerprint controller
//!
//! This crate exposes the [`DeviceManager`](printgate_serial::DeviceManager)
//! over a small JSON API and provides the `printgate` binary that wires the
//! serial link, the API and process shutdown together.
//!
//! # Components
//!
//! - **api**: axum router and handlers
//! - **config**: server configuration
//! - **ports**: serial port discovery for startup
//!
//! # Example
//!
//! ```no_run
//! use printgate_serial::{DeviceManager, LinkConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = Arc::new(DeviceManager::new(LinkConfig::default()));
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:5000").await?;
//!
//! printgate_server::serve(listener, Arc::clone(&manager), async {
//!     let _ = tokio::signal::ctrl_c().await;
//! })
//! .await?;
//!
//! manager.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod ports;

pub use api::{ApiError, AppState, CommandResponse, IndexResponse, StatusResponse, router, serve};
pub use config::ServerConfig;
pub use ports::{PortEntry, available_ports, resolve_port};
