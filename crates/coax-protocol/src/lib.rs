//! Coax Switch Wire Protocol
//!
//! This crate provides parsing and encoding for the line protocol spoken
//! by the Pico-based three-relay coax switch controller.
//!
//! # Format
//!
//! Newline-terminated ASCII lines in both directions:
//!
//! - Host → controller: `SET S1_1`, `SET S3_2`, `STATUS`
//! - Controller → host: `STATE S1=1 S2=2 S3=1`, `OK STATE …`, `ERROR …`
//!
//! A `STATE` line reports the controller's last commanded position for
//! each relay. The controller may also print banner or debug lines; those
//! parse as [`ControllerReply::Unknown`] and are skipped by callers.
//!
//! # Example
//!
//! ```rust
//! use coax_protocol::{ControllerReply, LineCodec, SwitchId, SwitchPosition};
//!
//! let mut codec = LineCodec::new();
//! codec.push_bytes(b"STATE S1=1 S2=2 S3=1\n");
//!
//! if let Some(ControllerReply::State(snapshot)) = codec.next_reply() {
//!     assert_eq!(snapshot.position(SwitchId::S2), Some(SwitchPosition::P2));
//!     assert!(snapshot.is_complete());
//! }
//! ```

pub mod codec;
pub mod command;
pub mod error;
pub mod switch;

pub use codec::LineCodec;
pub use command::{ControllerReply, HostCommand};
pub use error::ParseError;
pub use switch::{RawSwitchSnapshot, SwitchId, SwitchPosition};
