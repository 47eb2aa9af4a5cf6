//! Complete frames: header plus raw payload bytes.

use bytes::Bytes;

use crate::{
    errors::{ProtocolError, Result},
    header::FrameHeader,
};

/// A header and its (still encoded) payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame header; `payload_size` always matches `payload.len()`
    pub header: FrameHeader,
    /// CBOR-encoded payload
    pub payload: Bytes,
}

impl Frame {
    /// Build a frame, stamping the payload length into the header.
    pub fn new(mut header: FrameHeader, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        header.set_payload_size(payload.len() as u32);
        Self { header, payload }
    }

    /// Total encoded length.
    pub fn encoded_len(&self) -> usize {
        FrameHeader::SIZE + self.payload.len()
    }

    /// Append the wire encoding to `dst`.
    ///
    /// # Errors
    ///
    /// `PayloadTooLarge` if the payload exceeds the protocol limit.
    pub fn encode(&self, dst: &mut Vec<u8>) -> Result<()> {
        if self.payload.len() > FrameHeader::MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: self.payload.len(),
                max: FrameHeader::MAX_PAYLOAD_SIZE,
            });
        }

        dst.reserve(self.encoded_len());
        dst.extend_from_slice(&self.header.to_bytes());
        dst.extend_from_slice(&self.payload);
        Ok(())
    }

    /// Decode one frame from the front of `bytes`.
    ///
    /// Bytes after the declared payload are ignored.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let header = FrameHeader::from_bytes(bytes)?;
        let end = FrameHeader::SIZE + header.payload_size();
        if bytes.len() < end {
            return Err(ProtocolError::FrameTooShort { expected: end, actual: bytes.len() });
        }

        Ok(Self { header, payload: Bytes::copy_from_slice(&bytes[FrameHeader::SIZE..end]) })
    }
}
