//! Coax Switch-Path Routing Engine
//!
//! This crate tracks the three 2-position relays (S1/S2/S3) that route the
//! TX/RX signal chain of the antenna rig, reconciles the local view against
//! the device-reported truth, and classifies the resulting electrical path.
//!
//! # Architecture
//!
//! - [`gateway`]: async I/O to the switch controller (serial port or any
//!   duplex stream)
//! - [`store`]: all-or-nothing cache of the last device-reported state
//! - [`graph`]: the fixed RF wiring table and the reachability traversal
//! - [`classify`]: labels the energized path (inactive / valid TX /
//!   valid RX / misconfigured)
//! - [`actor`]: the reconciliation loop, periodic polling plus
//!   user-issued set commands with a forced re-read after every set
//!
//! The engine fails safe: any transport failure, timeout, or partial
//! status report collapses the store to `Disconnected`, which classifies
//! as `Inactive`. Uncertainty is rendered as "no active path", never as
//! a guessed switch position.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use coax_route::{RouteConfig, SwitchGateway, actor};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = SwitchGateway::connect("/dev/ttyACM0", 115_200, Duration::from_millis(200))?;
//! let (handle, mut events, _task) = actor::start(gateway, RouteConfig::default());
//!
//! while let Some(event) = events.recv().await {
//!     println!("{:?}", event);
//! }
//! # Ok(())
//! # }
//! ```

pub mod actor;
pub mod classify;
pub mod error;
pub mod events;
pub mod gateway;
pub mod graph;
pub mod store;

pub use actor::{run_route_actor, PendingSets, RouteCommand, RouteConfig, RouteHandle};
pub use classify::{classify, compute_path, Classification, PathResult, VALID_RX, VALID_TX};
pub use error::{DeviceError, RouteError};
pub use events::RouteEvent;
pub use gateway::{SwitchGateway, DEFAULT_BAUD};
pub use graph::{energize, Edge, EdgeSet, NodeId, Trace, WIRING};
pub use store::{StoreView, SwitchState, SwitchStore};
