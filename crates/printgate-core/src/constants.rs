//! Core constants for the fingerprint controller serial protocol.
//!
//! The controller speaks a line-oriented text protocol over a serial link:
//!
//! ```text
//! HOST   -> DEVICE : <TOKEN>\n        (e.g. "V\n", "I12\n", "E\n")
//! DEVICE -> HOST   : <status text>\n  (opaque, e.g. "R:OK")
//! ```
//!
//! Status lines coming back from the device are never interpreted by this
//! workspace; they are stored verbatim (minus trailing whitespace) as the
//! last known status.
//!
//! # Usage
//!
//! ```
//! use printgate_core::constants::*;
//!
//! assert_eq!(TOKEN_VERIFY, "V");
//! assert!(MAX_ENROLL_ID >= MIN_ENROLL_ID);
//! ```

// ============================================================================
// Command Tokens
// ============================================================================

/// Switch the controller to verification mode.
pub const TOKEN_VERIFY: &str = "V";

/// Switch the controller to enrollment mode.
///
/// Must be preceded by [`TOKEN_SET_ID_PREFIX`] so the controller knows which
/// slot the new template goes to.
pub const TOKEN_ENROLL: &str = "E";

/// Cancel the enrollment in progress.
pub const TOKEN_CANCEL: &str = "C";

/// Prefix of the "set identifier" token.
///
/// The full token is the prefix followed by the decimal slot number, with no
/// separator.
///
/// # Examples
///
/// ```
/// use printgate_core::constants::TOKEN_SET_ID_PREFIX;
///
/// let token = format!("{TOKEN_SET_ID_PREFIX}{}", 42);
/// assert_eq!(token, "I42");
/// ```
pub const TOKEN_SET_ID_PREFIX: &str = "I";

// ============================================================================
// Framing
// ============================================================================

/// Line terminator appended to every outgoing token and expected at the end
/// of every status line.
pub const LINE_TERMINATOR: u8 = b'\n';

/// Default maximum length of a single status line in bytes.
///
/// Longer lines are discarded up to the next terminator.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024;

/// Maximum number of bytes pulled from the port in a single read.
pub const READ_CHUNK_SIZE: usize = 256;

// ============================================================================
// Enrollment Slots
// ============================================================================

/// Lowest template slot accepted by the controller.
pub const MIN_ENROLL_ID: u8 = 0;

/// Highest template slot accepted by the controller.
pub const MAX_ENROLL_ID: u8 = 127;

// ============================================================================
// Link Defaults
// ============================================================================

/// Default serial baud rate of the controller firmware.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Port used when nothing else can be resolved.
#[cfg(windows)]
pub const DEFAULT_PORT: &str = "COM12";

/// Port used when nothing else can be resolved.
#[cfg(not(windows))]
pub const DEFAULT_PORT: &str = "/dev/ttyACM0";

/// Sleep between two availability polls of the background reader (milliseconds).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Backoff after a transient reader anomaly (milliseconds).
pub const DEFAULT_ERROR_BACKOFF_MS: u64 = 1000;

/// Port read/write timeout (milliseconds).
///
/// Keeps a stalled controller from hanging the command path.
pub const DEFAULT_IO_TIMEOUT_MS: u64 = 500;

/// Maximum time shutdown waits for the background reader (milliseconds).
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 2000;

/// Default status file, relative to the working directory.
pub const DEFAULT_STATUS_FILE: &str = "last_message.txt";

/// Timestamp format used in the status file prefix.
pub const STATUS_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ============================================================================
// Status Messages
// ============================================================================

/// Last status before the controller said anything.
pub const STATUS_INITIALIZING: &str = "Initializing...";

/// Last status after the port could not be opened.
pub const STATUS_CONNECT_FAILED: &str = "SENSOR: ERROR - serial connection failed.";

/// Last status after a command was rejected for lack of a link.
pub const STATUS_NOT_CONNECTED: &str =
    "ERROR: not connected to the serial port (selected or default).";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_single_ascii_letters() {
        for token in [TOKEN_VERIFY, TOKEN_ENROLL, TOKEN_CANCEL, TOKEN_SET_ID_PREFIX] {
            assert_eq!(token.len(), 1);
            assert!(token.chars().all(|c| c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn test_enroll_range() {
        assert_eq!(MIN_ENROLL_ID, 0);
        assert_eq!(MAX_ENROLL_ID, 127);
    }

    #[test]
    fn test_poll_interval_shorter_than_shutdown_timeout() {
        assert!(DEFAULT_POLL_INTERVAL_MS < DEFAULT_SHUTDOWN_TIMEOUT_MS);
    }
}
