//! Serial port scanner
//!
//! This module provides serial port enumeration with a heuristic for
//! spotting the switch controller board without opening anything.

use serialport::{available_ports, SerialPortType};
use tracing::info;

use crate::error::DetectError;

/// USB vendor ID of the Raspberry Pi Pico the controller runs on
pub const PICO_VID: u16 = 0x2E8A;

/// Information about a serial port
#[derive(Debug, Clone)]
pub struct SerialPortInfo {
    /// Port name (e.g., /dev/ttyACM0, COM3)
    pub port: String,
    /// USB Vendor ID (if USB)
    pub vid: Option<u16>,
    /// USB Product ID (if USB)
    pub pid: Option<u16>,
    /// USB serial number (if available)
    pub serial_number: Option<String>,
    /// USB manufacturer string
    pub manufacturer: Option<String>,
    /// USB product string
    pub product: Option<String>,
}

impl SerialPortInfo {
    /// Create from serialport crate's port info
    fn from_serialport(name: String, port_type: &SerialPortType) -> Self {
        match port_type {
            SerialPortType::UsbPort(usb) => Self {
                port: name,
                vid: Some(usb.vid),
                pid: Some(usb.pid),
                serial_number: usb.serial_number.clone(),
                manufacturer: usb.manufacturer.clone(),
                product: usb.product.clone(),
            },
            _ => Self {
                port: name,
                vid: None,
                pid: None,
                serial_number: None,
                manufacturer: None,
                product: None,
            },
        }
    }

    /// Whether the USB descriptors look like the controller board
    ///
    /// A heuristic only; the probe is the final word.
    pub fn looks_like_switch(&self) -> bool {
        if self.vid == Some(PICO_VID) {
            return true;
        }
        let matches = |s: &Option<String>| {
            s.as_deref().is_some_and(|s| {
                let s = s.to_ascii_lowercase();
                s.contains("pico") || s.contains("raspberry")
            })
        };
        matches(&self.product) || matches(&self.manufacturer)
    }
}

/// Serial port scanner configuration
#[derive(Debug, Clone, Default)]
pub struct ScannerConfig {
    /// Skip ports matching these patterns
    pub skip_patterns: Vec<String>,
}

/// Serial port scanner
pub struct PortScanner {
    config: ScannerConfig,
}

impl PortScanner {
    /// Create a new scanner with default configuration
    pub fn new() -> Self {
        Self {
            config: ScannerConfig {
                skip_patterns: vec![
                    // Bluetooth ports on macOS
                    "Bluetooth".to_string(),
                    // Debug/logging ports
                    "debug".to_string(),
                ],
            },
        }
    }

    /// Create a scanner with custom configuration
    pub fn with_config(config: ScannerConfig) -> Self {
        Self { config }
    }

    /// Enumerate all available serial ports
    pub fn enumerate_ports(&self) -> Result<Vec<SerialPortInfo>, DetectError> {
        info!("Enumerating serial ports...");
        let ports = available_ports().map_err(|e| DetectError::EnumerationFailed(e.to_string()))?;

        let result: Vec<_> = ports
            .into_iter()
            .map(|p| SerialPortInfo::from_serialport(p.port_name, &p.port_type))
            .filter(|p| !self.should_skip_port(p))
            .collect();

        if result.is_empty() {
            info!("No serial ports found");
        } else {
            info!("Found {} serial port(s)", result.len());
            for port in &result {
                let desc = port.product.as_deref().unwrap_or("Unknown");
                info!("  {} - {}", port.port, desc);
            }
        }

        Ok(result)
    }

    /// Enumerate ports with likely controller candidates first
    pub fn candidate_ports(&self) -> Result<Vec<SerialPortInfo>, DetectError> {
        let mut ports = self.enumerate_ports()?;
        ports.sort_by_key(|p| !p.looks_like_switch());
        Ok(ports)
    }

    /// Check if a port should be skipped
    fn should_skip_port(&self, port: &SerialPortInfo) -> bool {
        for pattern in &self.config.skip_patterns {
            if port.port.contains(pattern) {
                return true;
            }
        }
        false
    }
}

impl Default for PortScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serialport::UsbPortInfo;

    fn usb_info(vid: u16, product: Option<&str>) -> SerialPortInfo {
        let port_type = SerialPortType::UsbPort(UsbPortInfo {
            vid,
            pid: 0x0005,
            serial_number: None,
            manufacturer: None,
            product: product.map(String::from),
        });
        SerialPortInfo::from_serialport("/dev/ttyACM0".to_string(), &port_type)
    }

    #[test]
    fn test_serial_port_info_from_usb() {
        let info = usb_info(0x2E8A, Some("Pico"));
        assert_eq!(info.vid, Some(0x2E8A));
        assert_eq!(info.product.as_deref(), Some("Pico"));
    }

    #[test]
    fn test_pico_vid_looks_like_switch() {
        assert!(usb_info(0x2E8A, None).looks_like_switch());
    }

    #[test]
    fn test_product_string_looks_like_switch() {
        assert!(usb_info(0x0403, Some("Raspberry Pi Pico")).looks_like_switch());
        assert!(!usb_info(0x0403, Some("FT232R")).looks_like_switch());
    }

    #[test]
    fn test_non_usb_port_is_not_a_candidate() {
        let info =
            SerialPortInfo::from_serialport("/dev/ttyS0".to_string(), &SerialPortType::Unknown);
        assert!(!info.looks_like_switch());
    }
}
