//! Coax Switch Simulation Library
//!
//! This crate provides a simulated switch controller for testing routing
//! logic without physical relay hardware. It includes:
//!
//! - **VirtualSwitchBank**: the controller state machine, wire-accurate
//!   replies included
//! - **spawn_bank**: runs a bank behind a `DuplexStream` so anything that
//!   speaks to a serial port can speak to the simulator instead
//!
//! # Example
//!
//! ```rust
//! use coax_sim::VirtualSwitchBank;
//!
//! let mut bank = VirtualSwitchBank::new();
//!
//! // Drive it with wire-format lines
//! assert_eq!(bank.handle_line("STATUS"), Some("STATE S1=1 S2=1 S3=1".to_string()));
//! assert_eq!(bank.handle_line("SET S2_2"), Some("OK STATE S1=1 S2=2 S3=1".to_string()));
//! ```

pub mod bank;
pub mod link;

pub use bank::{FaultMode, VirtualBankConfig, VirtualSwitchBank};
pub use link::{spawn_bank, BankHandle};
