//! Host commands and controller replies
//!
//! The same line grammar is used from both ends of the link: the host
//! encodes [`HostCommand`]s and parses [`ControllerReply`]s, while the
//! firmware (and the virtual switch bank in `coax-sim`) does the reverse.

use crate::error::ParseError;
use crate::switch::{RawSwitchSnapshot, SwitchId, SwitchPosition};

/// Command sent from the host to the switch controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    /// Move one relay: `SET S1_1`
    Set {
        /// Relay to move
        id: SwitchId,
        /// Requested throw
        position: SwitchPosition,
    },
    /// Query all positions: `STATUS`
    Status,
}

impl HostCommand {
    /// Encode to wire bytes, newline-terminated
    pub fn encode(&self) -> Vec<u8> {
        match self {
            HostCommand::Set { id, position } => {
                format!("SET {}_{}\n", id.name(), position.wire()).into_bytes()
            }
            HostCommand::Status => b"STATUS\n".to_vec(),
        }
    }

    /// Parse a host command line (firmware side)
    ///
    /// The firmware uppercases incoming lines before matching; this parse
    /// does the same so `set s1_1` is accepted.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.trim().to_ascii_uppercase();

        if line == "STATUS" {
            return Ok(HostCommand::Status);
        }

        if let Some(params) = line.strip_prefix("SET ") {
            let (id, position) = params
                .trim()
                .split_once('_')
                .ok_or_else(|| ParseError::InvalidFrame(params.to_string()))?;
            return Ok(HostCommand::Set {
                id: SwitchId::parse(id)?,
                position: SwitchPosition::parse(position)?,
            });
        }

        Err(ParseError::UnknownCommand(line))
    }
}

/// One reply line from the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerReply {
    /// `STATE S1=1 S2=2 S3=1`, the answer to `STATUS`
    State(RawSwitchSnapshot),
    /// `OK` or `OK STATE …`, the answer to a successful `SET`
    ///
    /// The embedded snapshot is informational only; callers reconcile
    /// through a follow-up `STATUS` read rather than trusting it.
    Ack {
        /// Snapshot echoed after the `OK`, if any
        state: Option<RawSwitchSnapshot>,
    },
    /// `ERROR …`: the controller refused the command
    Error(String),
    /// Boot banner, debug output, anything else on the line
    Unknown(String),
}

impl ControllerReply {
    /// Parse one reply line (terminator already stripped)
    pub fn parse(line: &str) -> Self {
        let line = line.trim();

        if let Some(params) = line.strip_prefix("STATE") {
            return ControllerReply::State(RawSwitchSnapshot::parse_state_params(params));
        }

        if let Some(rest) = line.strip_prefix("OK") {
            let state = rest
                .trim_start()
                .strip_prefix("STATE")
                .map(RawSwitchSnapshot::parse_state_params);
            return ControllerReply::Ack { state };
        }

        if let Some(message) = line.strip_prefix("ERROR") {
            return ControllerReply::Error(message.trim().to_string());
        }

        ControllerReply::Unknown(line.to_string())
    }

    /// Encode to wire bytes, newline-terminated (device side)
    pub fn encode(&self) -> Vec<u8> {
        match self {
            ControllerReply::State(snapshot) => {
                format!("STATE {}\n", snapshot.to_state_params()).into_bytes()
            }
            ControllerReply::Ack { state: Some(snapshot) } => {
                format!("OK STATE {}\n", snapshot.to_state_params()).into_bytes()
            }
            ControllerReply::Ack { state: None } => b"OK\n".to_vec(),
            ControllerReply::Error(message) => format!("ERROR {}\n", message).into_bytes(),
            ControllerReply::Unknown(line) => format!("{}\n", line).into_bytes(),
        }
    }
}
