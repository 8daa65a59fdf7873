//! Events broadcast to passive observers
//!
//! Observers only ever see reconciled state. Device faults surface here
//! as a `Disconnected` view, never as raw errors; the error values go to
//! whichever caller issued the failing command.

use crate::classify::PathResult;
use crate::store::StoreView;

/// Notification from the route actor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteEvent {
    /// The store changed; carries the new view and its path analysis
    StateChanged { view: StoreView, path: PathResult },
    /// The actor shut down and will emit nothing further
    Stopped,
}
