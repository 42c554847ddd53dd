//! Enum wrapper for transport dispatch.
//!
//! The link manager owns exactly one transport at a time and shares it
//! between the background reader and the command path. `AnyTransport`
//! gives it a single concrete type for both the real serial port and the
//! mock, without boxing a trait object.
//!
//! # Examples
//!
//! ```
//! use printgate_serial::links::AnyTransport;
//! use printgate_serial::mock::MockTransport;
//! use printgate_serial::transport::Transport;
//!
//! let (transport, _handle) = MockTransport::new();
//! let link = AnyTransport::Mock(transport);
//!
//! assert_eq!(link.info().port, "mock");
//! ```

use crate::mock::MockTransport;
use crate::serial::SerialLink;
use crate::transport::{LinkInfo, Transport};
use crate::Result;

/// Enum wrapper for transport dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyTransport {
    /// Physical serial port.
    Serial(SerialLink),

    /// Scripted transport for development and testing.
    Mock(MockTransport),
}

impl Transport for AnyTransport {
    fn bytes_available(&self) -> Result<usize> {
        match self {
            Self::Serial(link) => link.bytes_available(),
            Self::Mock(link) => link.bytes_available(),
        }
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        match self {
            Self::Serial(link) => link.read(buf),
            Self::Mock(link) => link.read(buf),
        }
    }

    fn write_all(&self, data: &[u8]) -> Result<()> {
        match self {
            Self::Serial(link) => link.write_all(data),
            Self::Mock(link) => link.write_all(data),
        }
    }

    fn close(&self) {
        match self {
            Self::Serial(link) => link.close(),
            Self::Mock(link) => link.close(),
        }
    }

    fn info(&self) -> LinkInfo {
        match self {
            Self::Serial(link) => link.info(),
            Self::Mock(link) => link.info(),
        }
    }
}

impl From<SerialLink> for AnyTransport {
    fn from(link: SerialLink) -> Self {
        Self::Serial(link)
    }
}

impl From<MockTransport> for AnyTransport {
    fn from(link: MockTransport) -> Self {
        Self::Mock(link)
    }
}
