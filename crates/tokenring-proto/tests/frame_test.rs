//! Frame encoding tests against exact wire bytes.

use hex_literal::hex;
use proptest::prelude::*;
use tokenring_proto::{
    Frame, FrameHeader, Opcode, Payload, PeerId, ProtocolError, TokenAck, TokenPass,
};

#[test]
fn header_wire_layout() {
    let frame = Frame::new(FrameHeader::new(Opcode::TokenAck), vec![0u8; 5]);
    let mut buf = Vec::new();
    frame.encode(&mut buf).unwrap();

    assert_eq!(buf[..FrameHeader::SIZE], hex!("544b524e 01 02 0000 00000005"));
    assert_eq!(buf.len(), FrameHeader::SIZE + 5);
}

#[test]
fn token_pass_decodes_from_stream_bytes() {
    let pass = TokenPass::new(PeerId(5001), "Passing on token");
    let frame = Payload::TokenPass(pass.clone()).into_frame().unwrap();

    let mut buf = Vec::new();
    frame.encode(&mut buf).unwrap();
    // Bytes after the frame belong to the next frame and must be ignored
    buf.extend_from_slice(&[0xde, 0xad]);

    let decoded = Frame::decode(&buf).unwrap();
    assert_eq!(decoded, frame);
    assert_eq!(Payload::from_frame(decoded).unwrap(), Payload::TokenPass(pass));
}

#[test]
fn ack_and_empty_reason_survive_framing() {
    let ack = Payload::TokenAck(TokenAck::new("Token has successfully been passed"));
    let frame = ack.clone().into_frame().unwrap();
    assert_eq!(Payload::from_frame(frame).unwrap(), ack);

    let pass = Payload::TokenPass(TokenPass::new(PeerId(2), ""));
    let frame = pass.clone().into_frame().unwrap();
    assert_eq!(Payload::from_frame(frame).unwrap(), pass);
}

#[test]
fn garbage_is_rejected_before_payload() {
    let result = Frame::decode(b"GET / HTTP/1.1\r\n");
    assert!(matches!(result, Err(ProtocolError::InvalidMagic(_))));
}

proptest! {
    #[test]
    fn decode_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = Frame::decode(&bytes);
    }

    #[test]
    fn decode_accepts_valid_header_prefix(
        opcode in prop_oneof![Just(Opcode::TokenPass), Just(Opcode::TokenAck)],
        payload in prop::collection::vec(any::<u8>(), 0..128),
    ) {
        let frame = Frame::new(FrameHeader::new(opcode), payload.clone());
        let mut buf = Vec::new();
        frame.encode(&mut buf).unwrap();

        let decoded = Frame::decode(&buf).unwrap();
        prop_assert_eq!(decoded.header.opcode_enum(), Some(opcode));
        prop_assert_eq!(decoded.payload.as_ref(), payload.as_slice());
    }
}
