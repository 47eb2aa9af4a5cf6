//! Frame opcodes.

/// Frame type carried in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Token handed from a peer to its successor
    TokenPass = 0x01,
    /// Receiver's acknowledgement of a `TokenPass`
    TokenAck = 0x02,
}

impl Opcode {
    /// Map a raw byte to an opcode, `None` if unknown.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::TokenPass),
            0x02 => Some(Self::TokenAck),
            _ => None,
        }
    }

    /// Raw byte for the header.
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}
