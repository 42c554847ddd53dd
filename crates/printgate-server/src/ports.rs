//! Serial port discovery.
//!
//! The gateway never prompts: an explicitly configured port wins, then the
//! first port the OS reports, then the platform default.

use printgate_core::constants::DEFAULT_PORT;
use serialport::{SerialPortInfo, SerialPortType};
use tracing::{info, warn};

/// A serial port visible to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortEntry {
    /// Device name (e.g. "/dev/ttyACM0").
    pub name: String,

    /// Human readable description.
    pub description: String,
}

impl From<SerialPortInfo> for PortEntry {
    fn from(info: SerialPortInfo) -> Self {
        let description = match info.port_type {
            SerialPortType::UsbPort(usb) => {
                match (usb.manufacturer.as_deref(), usb.product.as_deref()) {
                    (Some(m), Some(p)) => format!("{m} {p}"),
                    (Some(s), None) | (None, Some(s)) => s.to_string(),
                    (None, None) => format!("USB {:04x}:{:04x}", usb.vid, usb.pid),
                }
            }
            SerialPortType::BluetoothPort => "Bluetooth".to_string(),
            SerialPortType::PciPort => "PCI".to_string(),
            SerialPortType::Unknown => "n/a".to_string(),
        };

        Self {
            name: info.port_name,
            description,
        }
    }
}

impl std::fmt::Display for PortEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.name, self.description)
    }
}

/// Ports currently reported by the OS. Enumeration failures yield an empty list.
pub fn available_ports() -> Vec<PortEntry> {
    match serialport::available_ports() {
        Ok(ports) => ports.into_iter().map(PortEntry::from).collect(),
        Err(e) => {
            warn!(error = %e, "Could not enumerate serial ports");
            Vec::new()
        }
    }
}

/// Pick the port to open.
pub fn resolve_port(explicit: Option<&str>) -> String {
    choose_port(explicit, &available_ports())
}

fn choose_port(explicit: Option<&str>, available: &[PortEntry]) -> String {
    if let Some(port) = explicit.map(str::trim).filter(|p| !p.is_empty()) {
        return port.to_string();
    }

    match available.first() {
        Some(entry) => {
            info!("Using first detected serial port: {}", entry);
            entry.name.clone()
        }
        None => {
            warn!("No serial port detected, falling back to {}", DEFAULT_PORT);
            DEFAULT_PORT.to_string()
        }
    }
}
