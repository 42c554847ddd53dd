//! Serial link layer for the PrintGate fingerprint gateway.
//!
//! This crate owns the connection to the fingerprint controller: it opens the
//! serial port, frames the controller's newline-terminated status lines,
//! keeps the most recent one available to any caller and forwards command
//! tokens from the host.
//!
//! # Overview
//!
//! ```text
//!  HTTP handlers ──► DeviceManager ──► Transport (serial port | mock)
//!                         ▲                    │
//!                         │ last status        │ bytes
//!                    StatusStore ◄── reader ◄──┘
//! ```
//!
//! - [`DeviceManager`] is the entry point. One instance per process.
//! - [`Transport`] abstracts the byte link; [`SerialLink`] is the real port
//!   and [`MockTransport`] a scripted stand-in for tests.
//! - [`LineCodec`] frames incoming bytes into status lines.
//! - [`StatusStore`] holds the last status and mirrors it to a file.
//!
//! # Failure model
//!
//! A read or write fault closes the link and records a `SERIAL ERROR` status.
//! The manager does not reconnect on its own; until
//! [`DeviceManager::initialize`] succeeds again, every command fails with
//! [`LinkError::NotConnected`] while status queries keep working.
//!
//! # Example
//!
//! ```
//! use printgate_serial::{DeviceManager, LinkConfig, MockTransport};
//!
//! #[tokio::main]
//! async fn main() {
//!     let manager = DeviceManager::new(LinkConfig::default());
//!     let (transport, _handle) = MockTransport::new();
//!     manager.initialize_with(transport.into());
//!
//!     let detail = manager.cancel().await.unwrap();
//!     assert_eq!(detail, "Command 'C' sent.");
//!
//!     manager.shutdown().await;
//! }
//! ```
//!
//! [`MockTransport`]: mock::MockTransport

pub mod codec;
pub mod error;
pub mod links;
pub mod manager;
pub mod mock;
mod reader;
pub mod serial;
pub mod status;
pub mod transport;

// Re-export commonly used types for convenience
pub use codec::LineCodec;
pub use error::{EnrollError, LinkError, Result};
pub use links::AnyTransport;
pub use manager::{DeviceManager, LinkConfig, LinkState};
pub use mock::{MockTransport, MockTransportHandle};
pub use serial::SerialLink;
pub use status::{StatusFile, StatusStore};
pub use transport::{LinkInfo, Transport};
