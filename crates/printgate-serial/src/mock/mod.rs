//! Mock transport for testing and development.
//!
//! This module provides a scripted in-memory transport that can be driven
//! programmatically without a controller plugged in.

pub mod transport;

pub use transport::{MockTransport, MockTransportHandle};
