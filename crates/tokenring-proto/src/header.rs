//! Fixed-size frame header.
//!
//! ```text
//! 0       4   5   6       8               12
//! ┌───────┬───┬───┬───────┬───────────────┐
//! │ magic │ v │ op│ rsvd  │ payload_size  │
//! └───────┴───┴───┴───────┴───────────────┘
//! ```
//!
//! All multi-byte fields are big-endian. The reserved field is written as zero
//! and ignored on read.

use zerocopy::{
    FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
    byteorder::big_endian::{U16, U32},
};

use crate::{
    errors::{ProtocolError, Result},
    opcodes::Opcode,
};

/// Frame header, laid out exactly as it appears on the wire.
#[repr(C)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned,
)]
pub struct FrameHeader {
    magic: U32,
    version: u8,
    opcode: u8,
    reserved: U16,
    payload_size: U32,
}

const _: () = assert!(size_of::<FrameHeader>() == FrameHeader::SIZE);

impl FrameHeader {
    /// Encoded header size in bytes
    pub const SIZE: usize = 12;

    /// Protocol magic, ASCII "TKRN"
    pub const MAGIC: u32 = 0x544B_524E;

    /// Current protocol version
    pub const VERSION: u8 = 1;

    /// Largest payload accepted in either direction
    pub const MAX_PAYLOAD_SIZE: usize = 64 * 1024;

    /// Header for `opcode` with an empty payload.
    pub fn new(opcode: Opcode) -> Self {
        Self {
            magic: U32::new(Self::MAGIC),
            version: Self::VERSION,
            opcode: opcode.to_u8(),
            reserved: U16::new(0),
            payload_size: U32::new(0),
        }
    }

    /// Parse and validate a header from the front of `bytes`.
    ///
    /// Trailing bytes beyond [`Self::SIZE`] are ignored.
    ///
    /// # Errors
    ///
    /// Rejects short input, bad magic, unknown versions or opcodes, and
    /// declared payloads above [`Self::MAX_PAYLOAD_SIZE`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (header, _rest) = Self::read_from_prefix(bytes).map_err(|_| {
            ProtocolError::FrameTooShort { expected: Self::SIZE, actual: bytes.len() }
        })?;

        if header.magic.get() != Self::MAGIC {
            return Err(ProtocolError::InvalidMagic(header.magic.get()));
        }
        if header.version != Self::VERSION {
            return Err(ProtocolError::UnsupportedVersion(header.version));
        }
        if Opcode::from_u8(header.opcode).is_none() {
            return Err(ProtocolError::UnknownOpcode(header.opcode));
        }
        let size = header.payload_size();
        if size > Self::MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge { size, max: Self::MAX_PAYLOAD_SIZE });
        }

        Ok(header)
    }

    /// Wire representation.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out.copy_from_slice(self.as_bytes());
        out
    }

    /// Raw opcode byte.
    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    /// Decoded opcode, `None` for unknown values.
    pub fn opcode_enum(&self) -> Option<Opcode> {
        Opcode::from_u8(self.opcode)
    }

    /// Protocol version.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Declared payload length in bytes.
    pub fn payload_size(&self) -> usize {
        self.payload_size.get() as usize
    }

    /// Record the payload length.
    pub fn set_payload_size(&mut self, size: u32) {
        self.payload_size = U32::new(size);
    }
}
