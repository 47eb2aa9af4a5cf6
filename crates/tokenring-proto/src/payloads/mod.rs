//! Typed payloads and their CBOR encoding.

mod token;

pub use token::{TokenAck, TokenPass};

use crate::{
    errors::{ProtocolError, Result},
    frame::Frame,
    header::FrameHeader,
    opcodes::Opcode,
};

/// Decoded frame payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Token handoff request
    TokenPass(TokenPass),
    /// Token handoff acknowledgement
    TokenAck(TokenAck),
}

impl Payload {
    /// Opcode this payload is framed with.
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::TokenPass(_) => Opcode::TokenPass,
            Self::TokenAck(_) => Opcode::TokenAck,
        }
    }

    /// Encode into a complete frame.
    pub fn into_frame(self) -> Result<Frame> {
        let mut buf = Vec::new();
        let encoded = match &self {
            Self::TokenPass(pass) => ciborium::into_writer(pass, &mut buf),
            Self::TokenAck(ack) => ciborium::into_writer(ack, &mut buf),
        };
        encoded.map_err(|e| ProtocolError::CborEncode(e.to_string()))?;

        if buf.len() > FrameHeader::MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: buf.len(),
                max: FrameHeader::MAX_PAYLOAD_SIZE,
            });
        }

        Ok(Frame::new(FrameHeader::new(self.opcode()), buf))
    }

    /// Decode the payload of `frame` according to its opcode.
    pub fn from_frame(frame: Frame) -> Result<Self> {
        let bytes: &[u8] = frame.payload.as_ref();
        match frame.header.opcode_enum() {
            Some(Opcode::TokenPass) => ciborium::from_reader(bytes)
                .map(Self::TokenPass)
                .map_err(|e| ProtocolError::CborDecode(e.to_string())),
            Some(Opcode::TokenAck) => ciborium::from_reader(bytes)
                .map(Self::TokenAck)
                .map_err(|e| ProtocolError::CborDecode(e.to_string())),
            None => Err(ProtocolError::UnknownOpcode(frame.header.opcode())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PeerId;

    #[test]
    fn token_pass_survives_framing() {
        let payload = Payload::TokenPass(TokenPass::new(PeerId(7), "passing on token"));
        let frame = payload.clone().into_frame().unwrap();

        assert_eq!(frame.header.opcode_enum(), Some(Opcode::TokenPass));
        assert_eq!(frame.header.payload_size(), frame.payload.len());
        assert_eq!(Payload::from_frame(frame).unwrap(), payload);
    }

    #[test]
    fn mismatched_payload_is_rejected() {
        // An ack body framed as a pass lacks `sender_id`
        let ack_frame = Payload::TokenAck(TokenAck::new("ok")).into_frame().unwrap();
        let relabelled = Frame::new(FrameHeader::new(Opcode::TokenPass), ack_frame.payload);

        assert!(matches!(Payload::from_frame(relabelled), Err(ProtocolError::CborDecode(_))));
    }

    #[test]
    fn oversized_reason_is_rejected() {
        let reason = "x".repeat(FrameHeader::MAX_PAYLOAD_SIZE);
        let result = Payload::TokenPass(TokenPass::new(PeerId(1), reason)).into_frame();
        assert!(matches!(result, Err(ProtocolError::PayloadTooLarge { .. })));
    }
}
