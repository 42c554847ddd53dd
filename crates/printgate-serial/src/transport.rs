//! Transport trait definitions.
//!
//! The link manager never touches a serial port directly. It goes through the
//! [`Transport`] trait so the real port and the scripted mock used in tests
//! are interchangeable.
//!
//! Unlike device traits that await their I/O, a transport is synchronous: the
//! background reader only reads bytes that are already buffered by the OS,
//! and the command path runs its write on Tokio's blocking pool. All methods
//! take `&self` so the read half and the write half can be driven from
//! different tasks at the same time; implementations guard each half with its
//! own lock.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// Identity of an open link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkInfo {
    /// Port identifier (e.g. "/dev/ttyACM0", "COM12").
    pub port: String,

    /// Baud rate in bits per second.
    pub baud_rate: u32,
}

impl LinkInfo {
    /// Create a new LinkInfo.
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baud_rate,
        }
    }
}

impl fmt::Display for LinkInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {} bps", self.port, self.baud_rate)
    }
}

/// Full-duplex byte transport to the controller.
///
/// # Contract
///
/// - [`bytes_available`](Transport::bytes_available) never blocks.
/// - [`read`](Transport::read) returns promptly when bytes are available.
/// - [`write_all`](Transport::write_all) is bounded by the transport timeout.
/// - Reads and writes may run concurrently without corrupting either stream.
/// - After [`close`](Transport::close), every I/O call fails.
pub trait Transport: Send + Sync {
    /// Number of bytes that can be read without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Read`](crate::LinkError::Read) if the port is gone.
    fn bytes_available(&self) -> Result<usize>;

    /// Read buffered bytes into `buf`, returning how many were read.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Read`](crate::LinkError::Read) on a transport fault,
    /// or [`LinkError::Io`](crate::LinkError::Io) for transient conditions such
    /// as a timeout.
    fn read(&self, buf: &mut [u8]) -> Result<usize>;

    /// Write all of `data` and flush it to the wire.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Write`](crate::LinkError::Write) on any failure.
    fn write_all(&self, data: &[u8]) -> Result<()>;

    /// Release the underlying port. Idempotent.
    fn close(&self);

    /// Identity of this link.
    fn info(&self) -> LinkInfo;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_info_display() {
        let info = LinkInfo::new("/dev/ttyACM0", 9600);
        assert_eq!(info.to_string(), "/dev/ttyACM0 @ 9600 bps");
    }

    #[test]
    fn test_link_info_serialization() {
        let info = LinkInfo::new("COM12", 115200);
        let json = serde_json::to_string(&info).unwrap();
        let deserialized: LinkInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(info, deserialized);
    }
}
