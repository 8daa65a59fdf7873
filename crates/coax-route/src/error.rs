//! Error types for the routing engine

use coax_protocol::SwitchId;
use thiserror::Error;

/// Errors reported by the switch device gateway
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Transport failure: open error, I/O error, closed link, or reply timeout
    #[error("switch controller unreachable: {0}")]
    Unreachable(String),

    /// The controller answered `ERROR`; it cannot honor the command
    #[error("switch controller rejected command: {0}")]
    Rejected(String),
}

/// Errors surfaced to callers of the route handle
#[derive(Debug, Error)]
pub enum RouteError {
    /// The gateway failed; the store has been collapsed to Disconnected
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// A set for this switch is still awaiting its forced re-read
    #[error("conflicting command: {0} already has an outstanding request")]
    ConflictingCommand(SwitchId),

    /// The actor task is not running
    #[error("route actor is not running")]
    ActorGone,
}
