//! Error types for wire protocol parsing

use thiserror::Error;

/// Errors that can occur while parsing protocol lines
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Switch id is not S1/S2/S3
    #[error("invalid switch id: {0}")]
    InvalidSwitchId(String),

    /// Position is not 1 or 2
    #[error("invalid switch position: {0}")]
    InvalidPosition(String),

    /// Line does not start with a recognized command word
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Line has a recognized command word but malformed parameters
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}
