//! Virtual switch bank
//!
//! The controller state machine, separated from any transport. Replies are
//! wire-accurate so the same parsing path covers hardware and simulation.

use coax_protocol::{HostCommand, RawSwitchSnapshot, SwitchId, SwitchPosition};
use serde::{Deserialize, Serialize};

/// Banner the controller prints on boot
pub const BOOT_BANNER: &str = "Ready: commands SET S1_1 | STATUS";

/// Injected failure behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FaultMode {
    /// Behave normally
    #[default]
    None,
    /// Swallow every command without replying
    DropReplies,
    /// Answer set commands with an error, leave status alone
    RejectSets,
    /// Leave one switch out of every state report
    OmitSwitch(SwitchId),
}

/// Configuration for creating a virtual switch bank
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualBankConfig {
    /// Starting positions, S1 through S3
    pub initial: [SwitchPosition; 3],
    /// Failure behavior
    pub fault: FaultMode,
}

impl Default for VirtualBankConfig {
    fn default() -> Self {
        Self {
            // Hardware boots with every relay on position 1
            initial: [SwitchPosition::P1; 3],
            fault: FaultMode::None,
        }
    }
}

/// A simulated switch controller
#[derive(Debug)]
pub struct VirtualSwitchBank {
    positions: [SwitchPosition; 3],
    fault: FaultMode,
    /// Commands received (for test verification)
    received: Vec<String>,
}

impl VirtualSwitchBank {
    /// Create a bank with every relay on position 1
    pub fn new() -> Self {
        Self::from_config(VirtualBankConfig::default())
    }

    /// Create a bank from configuration
    pub fn from_config(config: VirtualBankConfig) -> Self {
        Self {
            positions: config.initial,
            fault: config.fault,
            received: Vec::new(),
        }
    }

    /// Current position of one relay
    pub fn position(&self, id: SwitchId) -> SwitchPosition {
        self.positions[id.index()]
    }

    /// Move a relay without going through the wire protocol
    ///
    /// Models an operator or a glitch changing hardware state behind the
    /// host's back.
    pub fn set_position(&mut self, id: SwitchId, position: SwitchPosition) {
        self.positions[id.index()] = position;
    }

    /// Current failure behavior
    pub fn fault(&self) -> FaultMode {
        self.fault
    }

    /// Change the failure behavior
    pub fn set_fault(&mut self, fault: FaultMode) {
        self.fault = fault;
    }

    /// Lines received so far
    pub fn received(&self) -> &[String] {
        &self.received
    }

    /// Process one wire-format line and produce the reply, if any
    pub fn handle_line(&mut self, line: &str) -> Option<String> {
        self.received.push(line.to_string());

        if self.fault == FaultMode::DropReplies {
            return None;
        }

        match HostCommand::parse(line) {
            Ok(HostCommand::Set { id, position }) => {
                if self.fault == FaultMode::RejectSets {
                    return Some("ERROR Relay fault".to_string());
                }
                self.positions[id.index()] = position;
                Some(format!("OK STATE {}", self.state_params()))
            }
            Ok(HostCommand::Status) => Some(format!("STATE {}", self.state_params())),
            Err(_) => Some(format!("ERROR Unknown command: {}", line.trim())),
        }
    }

    fn state_params(&self) -> String {
        let mut snapshot = RawSwitchSnapshot::default();
        for id in SwitchId::ALL {
            if self.fault == FaultMode::OmitSwitch(id) {
                continue;
            }
            snapshot.set_position(id, self.positions[id.index()]);
        }
        snapshot.to_state_params()
    }
}

impl Default for VirtualSwitchBank {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boots_all_position_one() {
        let mut bank = VirtualSwitchBank::new();
        assert_eq!(
            bank.handle_line("STATUS"),
            Some("STATE S1=1 S2=1 S3=1".to_string())
        );
    }

    #[test]
    fn test_set_moves_relay_and_acks() {
        let mut bank = VirtualSwitchBank::new();
        assert_eq!(
            bank.handle_line("SET S1_2"),
            Some("OK STATE S1=2 S2=1 S3=1".to_string())
        );
        assert_eq!(bank.position(SwitchId::S1), SwitchPosition::P2);
    }

    #[test]
    fn test_lowercase_input_accepted() {
        let mut bank = VirtualSwitchBank::new();
        assert_eq!(
            bank.handle_line("set s3_2"),
            Some("OK STATE S1=1 S2=1 S3=2".to_string())
        );
    }

    #[test]
    fn test_unknown_command_errors() {
        let mut bank = VirtualSwitchBank::new();
        let reply = bank.handle_line("FLUSH").unwrap();
        assert!(reply.starts_with("ERROR"));
        assert_eq!(bank.position(SwitchId::S1), SwitchPosition::P1);
    }

    #[test]
    fn test_drop_replies_fault() {
        let mut bank = VirtualSwitchBank::new();
        bank.set_fault(FaultMode::DropReplies);
        assert_eq!(bank.handle_line("STATUS"), None);
        assert_eq!(bank.handle_line("SET S1_2"), None);
    }

    #[test]
    fn test_reject_sets_fault_leaves_status_working() {
        let mut bank = VirtualSwitchBank::new();
        bank.set_fault(FaultMode::RejectSets);

        let reply = bank.handle_line("SET S2_2").unwrap();
        assert!(reply.starts_with("ERROR"));
        assert_eq!(bank.position(SwitchId::S2), SwitchPosition::P1);

        assert_eq!(
            bank.handle_line("STATUS"),
            Some("STATE S1=1 S2=1 S3=1".to_string())
        );
    }

    #[test]
    fn test_omit_switch_fault_produces_partial_state() {
        let mut bank = VirtualSwitchBank::new();
        bank.set_fault(FaultMode::OmitSwitch(SwitchId::S2));
        assert_eq!(
            bank.handle_line("STATUS"),
            Some("STATE S1=1 S3=1".to_string())
        );
    }

    #[test]
    fn test_out_of_band_position_change_shows_in_status() {
        let mut bank = VirtualSwitchBank::new();
        bank.set_position(SwitchId::S3, SwitchPosition::P2);
        assert_eq!(
            bank.handle_line("STATUS"),
            Some("STATE S1=1 S2=1 S3=2".to_string())
        );
    }
}
