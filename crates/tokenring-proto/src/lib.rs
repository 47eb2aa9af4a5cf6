//! Wire format for the token ring protocol.
//!
//! Frames consist of a fixed 12-byte header (zero-copy binary) followed by a
//! variable-length CBOR payload. The header carries the opcode and payload
//! length, so a receiver can reject garbage before touching the payload.
//!
//! There is exactly one request ([`TokenPass`]) and one response
//! ([`TokenAck`]). A peer opens a connection to its successor, writes a
//! `TokenPass` frame and waits for the matching `TokenAck`.
//!
//! # Security
//!
//! All header parsing uses compile-time verified layouts via `zerocopy`. We
//! enforce a 64 KiB payload limit on both encode and decode. Peers are not
//! authenticated.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod errors;
pub mod frame;
pub mod header;
pub mod ids;
pub mod opcodes;
pub mod payloads;

pub use errors::{ProtocolError, Result};
pub use frame::Frame;
pub use header::FrameHeader;
pub use ids::PeerId;
pub use opcodes::Opcode;
pub use payloads::{Payload, TokenAck, TokenPass};
