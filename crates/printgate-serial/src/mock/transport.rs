//! Mock serial transport implementation for testing and development.
//!
//! This module provides a simulated controller link. Bytes queued through the
//! handle become readable by the link manager, every write attempt is
//! recorded, and read or write faults can be injected at any point.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    Result,
    error::LinkError,
    transport::{LinkInfo, Transport},
};

/// Shared state between the transport and its handle.
#[derive(Debug, Default)]
struct MockState {
    /// Bytes waiting to be read by the host.
    inbound: VecDeque<u8>,

    /// Every write attempt, successful or not.
    write_attempts: Vec<Vec<u8>>,

    /// Pending read fault, reported on the next availability poll.
    read_fault: Option<String>,

    /// Pending transient read anomaly, reported on the next availability poll.
    read_hiccup: Option<String>,

    /// Pending write fault, reported by every write until cleared.
    write_fault: Option<String>,

    /// One-shot write fault: index of the write attempt that fails.
    write_fault_at: Option<(usize, String)>,

    /// Transport has been closed.
    closed: bool,
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock transport for testing and development.
///
/// # Examples
///
/// ```
/// use printgate_serial::mock::MockTransport;
/// use printgate_serial::transport::Transport;
///
/// let (transport, handle) = MockTransport::new();
///
/// handle.push_line("R:OK");
/// assert_eq!(transport.bytes_available().unwrap(), 5);
///
/// transport.write_all(b"V\n").unwrap();
/// assert_eq!(handle.written_tokens(), vec!["V".to_string()]);
/// ```
#[derive(Debug)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
    info: LinkInfo,
}

impl MockTransport {
    /// Create a new mock transport named "mock" at the default baud rate.
    ///
    /// Returns a tuple of (MockTransport, MockTransportHandle) where the handle
    /// drives the simulated controller.
    pub fn new() -> (Self, MockTransportHandle) {
        Self::with_info(LinkInfo::new(
            "mock",
            printgate_core::constants::DEFAULT_BAUD_RATE,
        ))
    }

    /// Create a new mock transport with a custom identity.
    pub fn with_info(info: LinkInfo) -> (Self, MockTransportHandle) {
        let state = Arc::new(Mutex::new(MockState::default()));

        let transport = Self {
            state: Arc::clone(&state),
            info,
        };

        (transport, MockTransportHandle { state })
    }
}

impl Transport for MockTransport {
    fn bytes_available(&self) -> Result<usize> {
        let mut state = lock(&self.state);
        if state.closed {
            return Err(LinkError::read("port closed"));
        }
        if let Some(message) = state.read_fault.take() {
            return Err(LinkError::read(message));
        }
        if let Some(message) = state.read_hiccup.take() {
            return Err(LinkError::Io(io::Error::new(io::ErrorKind::TimedOut, message)));
        }
        Ok(state.inbound.len())
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let mut state = lock(&self.state);
        if state.closed {
            return Err(LinkError::read("port closed"));
        }

        let n = buf.len().min(state.inbound.len());
        for (slot, byte) in buf.iter_mut().zip(state.inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write_all(&self, data: &[u8]) -> Result<()> {
        let mut state = lock(&self.state);
        let attempt = state.write_attempts.len();
        state.write_attempts.push(data.to_vec());

        if state.closed {
            return Err(LinkError::write("port closed"));
        }
        if state
            .write_fault_at
            .as_ref()
            .is_some_and(|(index, _)| *index == attempt)
            && let Some((_, message)) = state.write_fault_at.take()
        {
            return Err(LinkError::write(message));
        }
        if let Some(message) = &state.write_fault {
            return Err(LinkError::write(message.clone()));
        }
        Ok(())
    }

    fn close(&self) {
        lock(&self.state).closed = true;
    }

    fn info(&self) -> LinkInfo {
        self.info.clone()
    }
}

/// Handle for controlling a mock transport.
///
/// Cloneable; every clone drives the same simulated controller.
#[derive(Debug, Clone)]
pub struct MockTransportHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockTransportHandle {
    /// Queue raw bytes as if the controller had sent them.
    pub fn push_bytes(&self, bytes: &[u8]) {
        lock(&self.state).inbound.extend(bytes.iter().copied());
    }

    /// Queue a status line; the terminator is appended.
    pub fn push_line(&self, line: &str) {
        let mut state = lock(&self.state);
        state.inbound.extend(line.bytes());
        state.inbound.push_back(b'\n');
    }

    /// Make the next availability poll fail with a transport read error.
    pub fn fail_reads(&self, message: impl Into<String>) {
        lock(&self.state).read_fault = Some(message.into());
    }

    /// Make the next availability poll report a transient, non-fatal anomaly
    /// (an OS read timeout).
    pub fn hiccup_reads(&self, message: impl Into<String>) {
        lock(&self.state).read_hiccup = Some(message.into());
    }

    /// Make only the `n`-th write from now fail (1-based). Writes before
    /// and after it succeed.
    pub fn fail_nth_write(&self, n: usize, message: impl Into<String>) {
        let mut state = lock(&self.state);
        let index = state.write_attempts.len() + n.saturating_sub(1);
        state.write_fault_at = Some((index, message.into()));
    }

    /// Make every write fail with a transport write error until cleared.
    pub fn fail_writes(&self, message: impl Into<String>) {
        lock(&self.state).write_fault = Some(message.into());
    }

    /// Clear the pending write fault.
    pub fn clear_write_fault(&self) {
        lock(&self.state).write_fault = None;
    }

    /// Raw bytes of every write attempt, in order.
    pub fn write_attempts(&self) -> Vec<Vec<u8>> {
        lock(&self.state).write_attempts.clone()
    }

    /// Every write attempt decoded as a token, terminator stripped.
    pub fn written_tokens(&self) -> Vec<String> {
        lock(&self.state)
            .write_attempts
            .iter()
            .map(|bytes| {
                String::from_utf8_lossy(bytes)
                    .trim_end_matches('\n')
                    .to_string()
            })
            .collect()
    }

    /// Whether the transport has been closed by its owner.
    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }

    /// Bytes still waiting to be read.
    pub fn pending_bytes(&self) -> usize {
        lock(&self.state).inbound.len()
    }
}
