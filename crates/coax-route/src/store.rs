//! Switch state store
//!
//! Process-local cache of the last device-reported relay positions. The
//! invariant is all-or-nothing: either every switch position is known
//! (device connected) or none are (disconnected). A partial status report
//! is never stored; the classifier must not reason about an invented
//! position.

use std::fmt;

use coax_protocol::{RawSwitchSnapshot, SwitchId, SwitchPosition};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Fully-known positions of all three switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchState {
    /// Position of S1 (source select)
    #[serde(rename = "S1")]
    pub s1: SwitchPosition,
    /// Position of S2 (LNA / straight-through select)
    #[serde(rename = "S2")]
    pub s2: SwitchPosition,
    /// Position of S3 (antenna-side join)
    #[serde(rename = "S3")]
    pub s3: SwitchPosition,
}

impl SwitchState {
    /// Build from explicit positions, in S1/S2/S3 order
    pub fn new(s1: SwitchPosition, s2: SwitchPosition, s3: SwitchPosition) -> Self {
        Self { s1, s2, s3 }
    }

    /// Build from a device snapshot; `None` unless all three are reported
    pub fn from_snapshot(snapshot: &RawSwitchSnapshot) -> Option<Self> {
        Some(Self {
            s1: snapshot.position(SwitchId::S1)?,
            s2: snapshot.position(SwitchId::S2)?,
            s3: snapshot.position(SwitchId::S3)?,
        })
    }

    /// Position of one switch
    pub fn get(&self, id: SwitchId) -> SwitchPosition {
        match id {
            SwitchId::S1 => self.s1,
            SwitchId::S2 => self.s2,
            SwitchId::S3 => self.s3,
        }
    }

    /// Positions as an array in S1/S2/S3 order
    pub fn triple(&self) -> [SwitchPosition; 3] {
        [self.s1, self.s2, self.s3]
    }

    /// Copy with one switch moved
    pub fn with(&self, id: SwitchId, position: SwitchPosition) -> Self {
        let mut next = *self;
        match id {
            SwitchId::S1 => next.s1 = position,
            SwitchId::S2 => next.s2 = position,
            SwitchId::S3 => next.s3 = position,
        }
        next
    }
}

impl fmt::Display for SwitchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S1={} S2={} S3={}", self.s1, self.s2, self.s3)
    }
}

/// What the store currently knows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreView {
    /// All three positions are known
    Connected(SwitchState),
    /// Nothing is known; the device is offline or untrusted
    Disconnected,
}

impl StoreView {
    /// The state, if connected
    pub fn state(&self) -> Option<SwitchState> {
        match self {
            StoreView::Connected(state) => Some(*state),
            StoreView::Disconnected => None,
        }
    }

    /// True iff the device is connected
    pub fn is_connected(&self) -> bool {
        matches!(self, StoreView::Connected(_))
    }
}

impl fmt::Display for StoreView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreView::Connected(state) => state.fmt(f),
            StoreView::Disconnected => f.write_str("disconnected"),
        }
    }
}

/// The single source of truth for the rest of the engine
///
/// Writes must be serialized by the owner (the route actor); the store
/// itself only enforces the wholesale-replace and change-detection
/// contracts.
#[derive(Debug)]
pub struct SwitchStore {
    view: StoreView,
}

impl SwitchStore {
    /// New store; nothing is known until the first successful poll
    pub fn new() -> Self {
        Self {
            view: StoreView::Disconnected,
        }
    }

    /// Replace the stored view wholesale
    ///
    /// Returns true iff the stored value changed, so callers emit change
    /// notifications exactly once per actual change and never on
    /// redundant polls.
    pub fn apply(&mut self, view: StoreView) -> bool {
        let changed = self.view != view;
        self.view = view;
        changed
    }

    /// Apply a raw device snapshot
    ///
    /// An incomplete snapshot (device claims to be up but reported fewer
    /// than three positions) is applied as `Disconnected`: partial truth
    /// is never trusted.
    pub fn apply_snapshot(&mut self, snapshot: &RawSwitchSnapshot) -> bool {
        match SwitchState::from_snapshot(snapshot) {
            Some(state) => self.apply(StoreView::Connected(state)),
            None => {
                let missing: Vec<_> = snapshot.missing().map(SwitchId::name).collect();
                warn!(
                    "Partial snapshot (missing {}), treating device as disconnected",
                    missing.join(", ")
                );
                self.apply(StoreView::Disconnected)
            }
        }
    }

    /// Current view; always fully known or explicitly disconnected
    pub fn current(&self) -> StoreView {
        self.view
    }
}

impl Default for SwitchStore {
    fn default() -> Self {
        Self::new()
    }
}
