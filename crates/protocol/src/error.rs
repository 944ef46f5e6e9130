use thiserror::Error;

use crate::state::SessionPhase;

/// Errors raised while encoding or decoding packet fields
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Read past end of packet: need {need} bytes at offset {offset}, have {have}")]
    Truncated {
        offset: usize,
        need: usize,
        have: usize,
    },

    #[error("Text of {len} bytes does not fit a {size}-byte field")]
    TextTooLong { len: usize, size: usize },

    #[error("No null terminator within {size}-byte text field")]
    MissingTerminator { size: usize },

    #[error("Text field is not valid UTF-8")]
    InvalidText,

    #[error("Opcode 0 is reserved for the retry sentinel")]
    ReservedOpcode,

    #[error("Unexpected value {value} for {field}")]
    InvalidValue { field: &'static str, value: u8 },
}

/// Invalid session phase transition
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Invalid phase transition from {from} to {to}")]
pub struct PhaseError {
    pub from: SessionPhase,
    pub to: SessionPhase,
}

pub type Result<T> = std::result::Result<T, CodecError>;
