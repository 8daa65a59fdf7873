//! Switch identifiers, relay positions, and raw state snapshots

use std::fmt;

use crate::error::ParseError;

/// Identifies one of the three 2-position relays in the signal chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SwitchId {
    /// Selects the TX or RX leg at the source end
    S1,
    /// Routes the common leg toward the LNA (P1) or straight through (P2)
    S2,
    /// Joins the LNA leg (P1) or the straight leg (P2) to the antenna
    S3,
}

impl SwitchId {
    /// All switches, in wiring order
    pub const ALL: [SwitchId; 3] = [SwitchId::S1, SwitchId::S2, SwitchId::S3];

    /// Stable index into three-element position arrays
    pub fn index(self) -> usize {
        match self {
            SwitchId::S1 => 0,
            SwitchId::S2 => 1,
            SwitchId::S3 => 2,
        }
    }

    /// Wire name, e.g. `S1`
    pub fn name(self) -> &'static str {
        match self {
            SwitchId::S1 => "S1",
            SwitchId::S2 => "S2",
            SwitchId::S3 => "S3",
        }
    }

    /// Parse a wire name (`S1`/`S2`/`S3`)
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        match s {
            "S1" => Ok(SwitchId::S1),
            "S2" => Ok(SwitchId::S2),
            "S3" => Ok(SwitchId::S3),
            other => Err(ParseError::InvalidSwitchId(other.to_string())),
        }
    }
}

impl fmt::Display for SwitchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One of the two electro-mechanical states of a relay
///
/// The wire encoding is `"1"`/`"2"`, matching the controller firmware and
/// the JSON records the dashboard consumes. There is no unknown variant;
/// an unreadable position is represented as an absent entry in
/// [`RawSwitchSnapshot`], never as a position value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SwitchPosition {
    /// Throw 1
    #[cfg_attr(feature = "serde", serde(rename = "1"))]
    P1,
    /// Throw 2
    #[cfg_attr(feature = "serde", serde(rename = "2"))]
    P2,
}

impl SwitchPosition {
    /// Wire encoding (`"1"`/`"2"`)
    pub fn wire(self) -> &'static str {
        match self {
            SwitchPosition::P1 => "1",
            SwitchPosition::P2 => "2",
        }
    }

    /// Parse the wire encoding
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        match s {
            "1" => Ok(SwitchPosition::P1),
            "2" => Ok(SwitchPosition::P2),
            other => Err(ParseError::InvalidPosition(other.to_string())),
        }
    }

    /// The other throw
    pub fn opposite(self) -> Self {
        match self {
            SwitchPosition::P1 => SwitchPosition::P2,
            SwitchPosition::P2 => SwitchPosition::P1,
        }
    }
}

impl fmt::Display for SwitchPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire())
    }
}

/// Device-reported relay positions as parsed off a `STATE` line
///
/// A partially responsive controller can report fewer than three entries;
/// the missing ones stay `None`. Callers must never guess a missing
/// position; the state store treats an incomplete snapshot as a
/// disconnected device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawSwitchSnapshot {
    positions: [Option<SwitchPosition>; 3],
}

impl RawSwitchSnapshot {
    /// Empty snapshot, no positions known
    pub fn new() -> Self {
        Self::default()
    }

    /// Reported position of one switch, if present
    pub fn position(&self, id: SwitchId) -> Option<SwitchPosition> {
        self.positions[id.index()]
    }

    /// Record a reported position
    pub fn set_position(&mut self, id: SwitchId, position: SwitchPosition) {
        self.positions[id.index()] = Some(position);
    }

    /// True iff all three positions were reported
    pub fn is_complete(&self) -> bool {
        self.positions.iter().all(Option::is_some)
    }

    /// Switches with no reported position
    pub fn missing(&self) -> impl Iterator<Item = SwitchId> + '_ {
        SwitchId::ALL
            .into_iter()
            .filter(|id| self.positions[id.index()].is_none())
    }

    /// Parse the parameter part of a `STATE` line (`S1=1 S2=2 S3=1`)
    ///
    /// Tokens that do not look like `Sx=y` are skipped rather than failing
    /// the whole line; the controller interleaves debug output on the same
    /// link and a missing entry is meaningful on its own.
    pub fn parse_state_params(params: &str) -> Self {
        let mut snapshot = Self::new();

        for token in params.split_whitespace() {
            let Some((key, value)) = token.split_once('=') else {
                continue;
            };
            match (SwitchId::parse(key), SwitchPosition::parse(value)) {
                (Ok(id), Ok(position)) => snapshot.set_position(id, position),
                _ => tracing::debug!("Skipping malformed STATE token: {}", token),
            }
        }

        snapshot
    }

    /// Render as the parameter part of a `STATE` line, skipping unknowns
    pub fn to_state_params(&self) -> String {
        let mut out = String::new();
        for id in SwitchId::ALL {
            if let Some(position) = self.position(id) {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(id.name());
                out.push('=');
                out.push_str(position.wire());
            }
        }
        out
    }
}
