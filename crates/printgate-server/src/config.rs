//! Server configuration.

use printgate_serial::LinkConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";

/// Configuration for the HTTP gateway
///
/// # Example
///
/// ```
/// use printgate_server::ServerConfig;
///
/// let config = ServerConfig {
///     bind_addr: "127.0.0.1:8080".parse().unwrap(),
///     ..ServerConfig::default()
/// };
/// assert!(config.port.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP API listens on
    pub bind_addr: SocketAddr,

    /// Serial port of the controller. Resolved at startup when absent.
    pub port: Option<String>,

    /// Serial link settings
    pub link: LinkConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            port: None,
            link: LinkConfig::default(),
        }
    }
}
