//! Fixed RF signal graph and path reachability
//!
//! The rig's wiring never changes at runtime: a constant table of eight
//! directed wire segments connects the TX/RX sources, the power amplifier,
//! the low-noise amplifier, the three relay junctions, and the antenna.
//! Reachability is a forward traversal over that table, gated at each
//! relay by its current position.

use std::collections::VecDeque;

use coax_protocol::{SwitchId, SwitchPosition};

use crate::store::SwitchState;

/// Logical nodes of the RF signal graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeId {
    /// Transmit source
    TxSource,
    /// Receive source
    RxSource,
    /// Power amplifier
    Pa,
    /// Low-noise amplifier
    Lna,
    /// S1 common terminal
    S1Com,
    /// S1 throw 1
    S1P1,
    /// S1 throw 2
    S1P2,
    /// S2 common terminal
    S2Com,
    /// S2 throw 1
    S2P1,
    /// S2 throw 2
    S2P2,
    /// S3 common terminal
    S3Com,
    /// S3 throw 1
    S3P1,
    /// S3 throw 2
    S3P2,
    /// Antenna feed point
    Antenna,
}

/// Number of nodes, for visited arrays
const NODE_COUNT: usize = 14;

impl NodeId {
    fn index(self) -> usize {
        self as usize
    }

    /// Schematic name, e.g. `S1_P1`
    pub fn name(self) -> &'static str {
        match self {
            NodeId::TxSource => "TX_SOURCE",
            NodeId::RxSource => "RX_SOURCE",
            NodeId::Pa => "PA",
            NodeId::Lna => "LNA",
            NodeId::S1Com => "S1_COM",
            NodeId::S1P1 => "S1_P1",
            NodeId::S1P2 => "S1_P2",
            NodeId::S2Com => "S2_COM",
            NodeId::S2P1 => "S2_P1",
            NodeId::S2P2 => "S2_P2",
            NodeId::S3Com => "S3_COM",
            NodeId::S3P1 => "S3_P1",
            NodeId::S3P2 => "S3_P2",
            NodeId::Antenna => "ANTENNA",
        }
    }

    /// Gating requirement: a throw node carries signal only while its
    /// relay sits in the corresponding position
    fn gate(self) -> Option<(SwitchId, SwitchPosition)> {
        match self {
            NodeId::S1P1 => Some((SwitchId::S1, SwitchPosition::P1)),
            NodeId::S1P2 => Some((SwitchId::S1, SwitchPosition::P2)),
            NodeId::S2P1 => Some((SwitchId::S2, SwitchPosition::P1)),
            NodeId::S2P2 => Some((SwitchId::S2, SwitchPosition::P2)),
            NodeId::S3P1 => Some((SwitchId::S3, SwitchPosition::P1)),
            NodeId::S3P2 => Some((SwitchId::S3, SwitchPosition::P2)),
            _ => None,
        }
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One directed wire segment between two graph nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    /// Signal enters here
    pub from: NodeId,
    /// Signal leaves here
    pub to: NodeId,
}

impl Edge {
    const fn new(from: NodeId, to: NodeId) -> Self {
        Self { from, to }
    }
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}

/// The fixed wiring table of the rig
///
/// Defined once; everything downstream (traversal, classification, the
/// misconfigured set) derives from this table, so a schematic revision
/// only touches these eight entries.
pub const WIRING: [Edge; 8] = [
    Edge::new(NodeId::TxSource, NodeId::Pa),
    Edge::new(NodeId::Pa, NodeId::S1P1),
    Edge::new(NodeId::RxSource, NodeId::S1P2),
    Edge::new(NodeId::S1Com, NodeId::S2Com),
    Edge::new(NodeId::S2P1, NodeId::Lna),
    Edge::new(NodeId::Lna, NodeId::S3P1),
    Edge::new(NodeId::S2P2, NodeId::S3P2),
    Edge::new(NodeId::S3Com, NodeId::Antenna),
];

/// Set of energized wiring-table edges, as a bitmask over [`WIRING`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EdgeSet(u8);

impl EdgeSet {
    /// No edges energized
    pub const EMPTY: EdgeSet = EdgeSet(0);

    fn insert_index(&mut self, index: usize) {
        self.0 |= 1 << index;
    }

    /// True iff this wiring-table edge is energized
    pub fn contains(&self, edge: Edge) -> bool {
        WIRING
            .iter()
            .position(|e| *e == edge)
            .is_some_and(|i| self.0 & (1 << i) != 0)
    }

    /// Energized edges, in wiring-table order
    pub fn iter(&self) -> impl Iterator<Item = Edge> + '_ {
        WIRING
            .iter()
            .enumerate()
            .filter(|(i, _)| self.0 & (1 << i) != 0)
            .map(|(_, e)| *e)
    }

    /// Number of energized edges
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// True iff nothing is energized
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Build from explicit edges (test helper, but harmless elsewhere)
    pub fn from_edges(edges: &[Edge]) -> Self {
        let mut set = EdgeSet::EMPTY;
        for edge in edges {
            if let Some(i) = WIRING.iter().position(|e| e == edge) {
                set.insert_index(i);
            }
        }
        set
    }
}

/// Result of one traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trace {
    /// Wire segments that carry signal under the given positions
    pub energized: EdgeSet,
    /// True iff the antenna node was reached
    pub reaches: bool,
}

/// Compute which wire segments carry signal and whether the antenna is fed
///
/// Pure and deterministic. Traversal starts at the single live source:
/// S1 selects the leg (P1 routes TX, P2 routes RX), so one result can
/// never energize both the TX and the RX edges. Passing through a relay
/// junction (COM to throw or back) requires the relay to sit in the
/// throw's position.
pub fn energize(state: &SwitchState) -> Trace {
    let source = match state.get(SwitchId::S1) {
        SwitchPosition::P1 => NodeId::TxSource,
        SwitchPosition::P2 => NodeId::RxSource,
    };

    let mut visited = [false; NODE_COUNT];
    let mut queue = VecDeque::new();
    visited[source.index()] = true;
    queue.push_back(source);

    let mut energized = EdgeSet::EMPTY;

    while let Some(node) = queue.pop_front() {
        for (i, edge) in WIRING.iter().enumerate() {
            if edge.from == node && gate_open(edge.to, state) {
                energized.insert_index(i);
                if !visited[edge.to.index()] {
                    visited[edge.to.index()] = true;
                    queue.push_back(edge.to);
                }
            }
        }

        if let Some(peer) = junction_peer(node, state) {
            if !visited[peer.index()] {
                visited[peer.index()] = true;
                queue.push_back(peer);
            }
        }
    }

    Trace {
        energized,
        reaches: visited[NodeId::Antenna.index()],
    }
}

fn gate_open(node: NodeId, state: &SwitchState) -> bool {
    node.gate()
        .map_or(true, |(id, position)| state.get(id) == position)
}

/// The node joined to `node` inside a relay, under the current positions
///
/// A COM terminal joins its selected throw; a throw joins COM only while
/// selected.
fn junction_peer(node: NodeId, state: &SwitchState) -> Option<NodeId> {
    match node {
        NodeId::S1Com => Some(throw_node(SwitchId::S1, state.get(SwitchId::S1))),
        NodeId::S2Com => Some(throw_node(SwitchId::S2, state.get(SwitchId::S2))),
        NodeId::S3Com => Some(throw_node(SwitchId::S3, state.get(SwitchId::S3))),
        _ => node
            .gate()
            .filter(|(id, position)| state.get(*id) == *position)
            .map(|(id, _)| com_node(id)),
    }
}

fn throw_node(id: SwitchId, position: SwitchPosition) -> NodeId {
    match (id, position) {
        (SwitchId::S1, SwitchPosition::P1) => NodeId::S1P1,
        (SwitchId::S1, SwitchPosition::P2) => NodeId::S1P2,
        (SwitchId::S2, SwitchPosition::P1) => NodeId::S2P1,
        (SwitchId::S2, SwitchPosition::P2) => NodeId::S2P2,
        (SwitchId::S3, SwitchPosition::P1) => NodeId::S3P1,
        (SwitchId::S3, SwitchPosition::P2) => NodeId::S3P2,
    }
}

fn com_node(id: SwitchId) -> NodeId {
    match id {
        SwitchId::S1 => NodeId::S1Com,
        SwitchId::S2 => NodeId::S2Com,
        SwitchId::S3 => NodeId::S3Com,
    }
}
