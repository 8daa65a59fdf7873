//! Coax Switch Port Detection Library
//!
//! This crate provides serial port enumeration and probing for the coax
//! switch controller.
//!
//! # Example
//!
//! ```rust,no_run
//! use coax_detect::PortScanner;
//!
//! let scanner = PortScanner::new();
//! let ports = scanner.enumerate_ports().unwrap();
//!
//! for port in ports {
//!     println!("Found port: {}", port.port);
//! }
//! ```

pub mod error;
pub mod probe;
pub mod scanner;

pub use error::DetectError;
pub use probe::{find_switch_port, probe_port, ProbeConfig, SwitchProber, PORT_ENV_VAR};
pub use scanner::{PortScanner, ScannerConfig, SerialPortInfo};
