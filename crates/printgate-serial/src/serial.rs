//! Serial port transport backed by the `serialport` crate.

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{ErrorKind, Read, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{LinkError, Result};
use crate::transport::{LinkInfo, Transport};

type PortSlot = Mutex<Option<Box<dyn SerialPort>>>;

/// Open serial connection to the controller.
///
/// The port is cloned into an independent read half and write half at open
/// time, each behind its own lock, so the background reader and the command
/// path never contend on the same handle.
pub struct SerialLink {
    info: LinkInfo,
    reader: PortSlot,
    writer: PortSlot,
}

impl SerialLink {
    /// Open a serial port as 8N1 without flow control.
    ///
    /// # Arguments
    /// * `port` - Serial port path (e.g., "/dev/ttyACM0", "COM12")
    /// * `baud_rate` - Baud rate (e.g., 9600)
    /// * `timeout` - Read/write timeout applied to both halves
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::OpenFailed`] if the port cannot be opened or cloned.
    pub fn open(port: &str, baud_rate: u32, timeout: Duration) -> Result<Self> {
        let reader = serialport::new(port, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(timeout)
            .open()
            .map_err(|e| LinkError::open_failed(port, e.to_string()))?;

        let writer = reader
            .try_clone()
            .map_err(|e| LinkError::open_failed(port, e.to_string()))?;

        info!("Serial link established on {} @ {} bps", port, baud_rate);

        Ok(Self {
            info: LinkInfo::new(port, baud_rate),
            reader: Mutex::new(Some(reader)),
            writer: Mutex::new(Some(writer)),
        })
    }

    fn lock(slot: &PortSlot) -> MutexGuard<'_, Option<Box<dyn SerialPort>>> {
        slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

impl Transport for SerialLink {
    fn bytes_available(&self) -> Result<usize> {
        let guard = Self::lock(&self.reader);
        let port = guard
            .as_ref()
            .ok_or_else(|| LinkError::read("port closed"))?;

        port.bytes_to_read()
            .map(|n| n as usize)
            .map_err(|e| LinkError::read(e.to_string()))
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let mut guard = Self::lock(&self.reader);
        let port = guard
            .as_mut()
            .ok_or_else(|| LinkError::read("port closed"))?;

        match port.read(buf) {
            Ok(n) => Ok(n),
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) =>
            {
                Err(LinkError::Io(e))
            }
            Err(e) => Err(LinkError::read(e.to_string())),
        }
    }

    fn write_all(&self, data: &[u8]) -> Result<()> {
        let mut guard = Self::lock(&self.writer);
        let port = guard
            .as_mut()
            .ok_or_else(|| LinkError::write("port closed"))?;

        port.write_all(data)
            .and_then(|()| port.flush())
            .map_err(|e| LinkError::write(e.to_string()))
    }

    fn close(&self) {
        let reader = Self::lock(&self.reader).take();
        let writer = Self::lock(&self.writer).take();

        if reader.is_some() || writer.is_some() {
            debug!("Releasing serial port {}", self.info.port);
        }
    }

    fn info(&self) -> LinkInfo {
        self.info.clone()
    }
}
