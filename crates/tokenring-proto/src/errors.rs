//! Errors raised while encoding or decoding frames.

use thiserror::Error;

/// Result alias for wire-format operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Wire-format violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Fewer bytes than a full header (or the declared payload) were supplied
    #[error("frame too short: expected {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Bytes required
        expected: usize,
        /// Bytes available
        actual: usize,
    },

    /// Header did not start with the protocol magic
    #[error("invalid magic 0x{0:08x}")]
    InvalidMagic(u32),

    /// Header version is not one we speak
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),

    /// Opcode byte does not map to a known frame type
    #[error("unknown opcode 0x{0:02x}")]
    UnknownOpcode(u8),

    /// Payload exceeds the protocol limit
    #[error("payload of {size} bytes exceeds limit of {max} bytes")]
    PayloadTooLarge {
        /// Declared or actual payload size
        size: usize,
        /// Maximum allowed payload size
        max: usize,
    },

    /// CBOR serialization failed
    #[error("failed to encode payload: {0}")]
    CborEncode(String),

    /// CBOR deserialization failed
    #[error("failed to decode payload: {0}")]
    CborDecode(String),
}
