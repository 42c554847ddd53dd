//! Error types for serial link operations.
//!
//! This module defines the failures the link manager can surface: a missing
//! link, transport-level read and write faults, recoverable decode anomalies
//! and rejected arguments.

/// Result type alias for link operations.
pub type Result<T> = std::result::Result<T, LinkError>;

/// Errors that can occur while talking to the fingerprint controller.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// No link is open, either because the initial open failed or because
    /// the link was torn down after a transport error.
    #[error("Not connected to serial port {port}")]
    NotConnected { port: String },

    /// The serial port could not be opened.
    #[error("Failed to open serial port {port}: {message}")]
    OpenFailed { port: String, message: String },

    /// Transport-level read failure. Terminal for the current link.
    #[error("Serial read error: {message}")]
    Read { message: String },

    /// Transport-level write failure. Terminal for the current link.
    #[error("Serial write error: {message}")]
    Write { message: String },

    /// Malformed or oversized input on the read path. Always recovered.
    #[error("Decode anomaly: {message}")]
    Decode { message: String },

    /// Argument rejected before any device interaction.
    #[error("Invalid argument: {0}")]
    InvalidArgument(#[from] printgate_core::Error),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with custom message.
    #[error("{0}")]
    Other(String),
}

impl LinkError {
    /// Create a new not-connected error.
    pub fn not_connected(port: impl Into<String>) -> Self {
        Self::NotConnected { port: port.into() }
    }

    /// Create a new open failure.
    pub fn open_failed(port: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OpenFailed {
            port: port.into(),
            message: message.into(),
        }
    }

    /// Create a new read error.
    pub fn read(message: impl Into<String>) -> Self {
        Self::Read {
            message: message.into(),
        }
    }

    /// Create a new write error.
    pub fn write(message: impl Into<String>) -> Self {
        Self::Write {
            message: message.into(),
        }
    }

    /// Create a new decode anomaly.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a generic error with custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Whether this error means the link is unusable and must be torn down.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Read { .. } | Self::Write { .. })
    }

    /// Whether this error reports a missing link.
    pub fn is_connection_unavailable(&self) -> bool {
        matches!(self, Self::NotConnected { .. } | Self::OpenFailed { .. })
    }

    /// Underlying transport message, without the category prefix.
    pub fn detail(&self) -> String {
        match self {
            Self::Read { message } | Self::Write { message } | Self::Decode { message } => {
                message.clone()
            }
            other => other.to_string(),
        }
    }
}

/// Failure of the two-step enroll sequence, naming the step that failed.
#[derive(Debug, thiserror::Error)]
pub enum EnrollError {
    /// The set-identifier token was not accepted; enrollment mode was not requested.
    #[error("ID command failed: {0}")]
    SetId(#[source] LinkError),

    /// The identifier was set but entering enrollment mode failed.
    #[error("ENROLL command failed: {0}")]
    EnterEnroll(#[source] LinkError),
}

impl EnrollError {
    /// The link error behind this failure.
    pub fn link_error(&self) -> &LinkError {
        match self {
            Self::SetId(e) | Self::EnterEnroll(e) => e,
        }
    }
}
