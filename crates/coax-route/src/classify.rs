//! Path classification against the sanctioned switch configurations

use serde::{Deserialize, Serialize};

use coax_protocol::SwitchPosition::{self, P1, P2};

use crate::graph::{energize, EdgeSet};
use crate::store::{StoreView, SwitchState};

/// Electrical soundness of the currently energized path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    /// No signal reaches the antenna (or the device state is unknown)
    Inactive,
    /// The exact transmit configuration: TX → PA → antenna
    ValidTx,
    /// The exact receive configuration: antenna → LNA → receiver
    ValidRx,
    /// The antenna is reached, but not through a sanctioned configuration
    Misconfigured,
}

impl Classification {
    /// Human-readable label
    pub fn name(&self) -> &'static str {
        match self {
            Classification::Inactive => "inactive",
            Classification::ValidTx => "valid-tx",
            Classification::ValidRx => "valid-rx",
            Classification::Misconfigured => "misconfigured",
        }
    }
}

/// The switch triple that routes TX source → PA → antenna
pub const VALID_TX: [SwitchPosition; 3] = [P1, P2, P2];

/// The switch triple that routes antenna → LNA → receiver
pub const VALID_RX: [SwitchPosition; 3] = [P2, P1, P1];

/// Label a reachability outcome
///
/// Total over all eight switch triples: a path that does not reach the
/// antenna is inactive; one that reaches it is valid only for the two
/// sanctioned triples and misconfigured otherwise (electrically
/// connected but unintended, e.g. the PA leg bridged straight to the
/// antenna while S1 selects the receiver).
pub fn classify(state: &SwitchState, reaches: bool) -> Classification {
    if !reaches {
        return Classification::Inactive;
    }

    let triple = state.triple();
    if triple == VALID_TX {
        Classification::ValidTx
    } else if triple == VALID_RX {
        Classification::ValidRx
    } else {
        Classification::Misconfigured
    }
}

/// Derived path state, recomputed wholesale on every store change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathResult {
    /// Wire segments carrying signal
    pub energized: EdgeSet,
    /// True iff the antenna is fed
    pub reaches: bool,
    /// Label of the resulting path
    pub classification: Classification,
}

impl PathResult {
    /// The fail-safe result: nothing energized, nothing reached
    pub fn inactive() -> Self {
        Self {
            energized: EdgeSet::EMPTY,
            reaches: false,
            classification: Classification::Inactive,
        }
    }
}

/// Compute the path state for a store view
///
/// Pure function of its input. A disconnected view short-circuits to the
/// inactive result without traversal: when the positions are unknown,
/// nothing is assumed.
pub fn compute_path(view: &StoreView) -> PathResult {
    match view {
        StoreView::Disconnected => PathResult::inactive(),
        StoreView::Connected(state) => {
            let trace = energize(state);
            PathResult {
                energized: trace.energized,
                reaches: trace.reaches,
                classification: classify(state, trace.reaches),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, NodeId};

    fn path_for(s1: SwitchPosition, s2: SwitchPosition, s3: SwitchPosition) -> PathResult {
        compute_path(&StoreView::Connected(SwitchState::new(s1, s2, s3)))
    }

    #[test]
    fn test_all_eight_triples() {
        // Exhaustive: the antenna is reached iff S2 and S3 agree, and only
        // the two sanctioned triples are valid.
        let expected = [
            ([P1, P1, P1], Classification::Misconfigured),
            ([P1, P1, P2], Classification::Inactive),
            ([P1, P2, P1], Classification::Inactive),
            ([P1, P2, P2], Classification::ValidTx),
            ([P2, P1, P1], Classification::ValidRx),
            ([P2, P1, P2], Classification::Inactive),
            ([P2, P2, P1], Classification::Inactive),
            ([P2, P2, P2], Classification::Misconfigured),
        ];

        for ([s1, s2, s3], classification) in expected {
            let path = path_for(s1, s2, s3);
            assert_eq!(
                path.classification, classification,
                "S1={} S2={} S3={}",
                s1, s2, s3
            );
            // Reaching and being classified active must agree
            assert_eq!(path.reaches, classification != Classification::Inactive);
        }
    }

    #[test]
    fn test_valid_tx_scenario() {
        let path = path_for(P1, P2, P2);
        assert_eq!(path.classification, Classification::ValidTx);
        assert_eq!(path.energized.len(), 5);
        assert!(path
            .energized
            .contains(Edge { from: NodeId::TxSource, to: NodeId::Pa }));
    }

    #[test]
    fn test_rx_selected_but_straight_leg_is_misconfigured() {
        // S1=P2 routes the RX source, but S2=P2/S3=P2 bridge the straight
        // leg to the antenna: connected, not sanctioned.
        let path = path_for(P2, P2, P2);
        assert_eq!(path.classification, Classification::Misconfigured);
        assert!(path.reaches);
    }

    #[test]
    fn test_disconnected_is_inactive() {
        let path = compute_path(&StoreView::Disconnected);
        assert_eq!(path, PathResult::inactive());
        assert!(path.energized.is_empty());
        assert!(!path.reaches);
    }

    #[test]
    fn test_recomputation_is_idempotent() {
        let view = StoreView::Connected(SwitchState::new(P2, P1, P1));
        assert_eq!(compute_path(&view), compute_path(&view));
    }

    #[test]
    fn test_classification_labels() {
        assert_eq!(Classification::ValidTx.name(), "valid-tx");
        assert_eq!(
            serde_json::to_string(&Classification::ValidRx).unwrap(),
            "\"valid-rx\""
        );
    }
}
