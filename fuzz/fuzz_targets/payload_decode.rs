//! Valid headers with arbitrary CBOR bodies.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tokenring_proto::{Frame, FrameHeader, Opcode, Payload};

#[derive(Debug, Arbitrary)]
struct Input {
    ack: bool,
    body: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let opcode = if input.ack { Opcode::TokenAck } else { Opcode::TokenPass };
    let frame = Frame::new(FrameHeader::new(opcode), input.body);

    if let Ok(payload) = Payload::from_frame(frame) {
        assert_eq!(payload.opcode(), opcode);
        assert!(payload.into_frame().is_ok());
    }
});
