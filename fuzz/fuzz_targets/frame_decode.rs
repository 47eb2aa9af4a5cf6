//! Arbitrary bytes must never panic the frame decoder, and anything it
//! accepts must re-encode to the same bytes.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tokenring_proto::Frame;

fuzz_target!(|data: &[u8]| {
    let Ok(frame) = Frame::decode(data) else {
        return;
    };

    let mut encoded = Vec::new();
    if frame.encode(&mut encoded).is_ok() {
        assert_eq!(&data[..encoded.len()], encoded.as_slice());
    }
});
