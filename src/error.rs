//! Error types for the script codecs

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Malformed hex: {0}")]
    MalformedHex(String),

    #[error("Read out of range: needed {needed} bytes at position {position}, {available} available")]
    OutOfRange {
        position: usize,
        needed: usize,
        available: usize,
    },

    #[error("{0} is not a valid opcode")]
    InvalidOpcode(String),

    #[error("{0} is not a valid byte array")]
    InvalidByteArray(String),
}

pub type Result<T> = std::result::Result<T, CodecError>;
