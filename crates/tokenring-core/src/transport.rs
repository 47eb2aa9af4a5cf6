//! Token transport contract and frame I/O.
//!
//! [`TokenTransport`] is the synchronous request/response used to move the
//! token to a successor. Production runs it over TCP, simulation over turmoil,
//! unit tests in-process. The stream helpers below are shared by all
//! stream-based implementations and by the inbound side
//! ([`crate::serve_connection`]).
//!
//! The contract the state machine relies on: `pass` returns `Ok` only once the
//! receiver has taken possession. Any error means possession stays with the
//! sender.

use std::io;

use async_trait::async_trait;
use tokenring_proto::{Frame, FrameHeader, Payload, PeerId, TokenAck, TokenPass};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::TransportError;

/// Moves the token from this peer to another.
#[async_trait]
pub trait TokenTransport: Send + Sync + 'static {
    /// Deliver `token` to `to` and wait for its acknowledgement.
    ///
    /// Runs to completion; there is no cancellation. Deployments may impose a
    /// timeout, surfaced as [`TransportError::Timeout`].
    async fn pass(&self, to: PeerId, token: TokenPass) -> Result<TokenAck, TransportError>;
}

/// Write one frame and flush.
pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin + Send,
{
    let mut buf = Vec::with_capacity(frame.encoded_len());
    frame.encode(&mut buf)?;
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame.
///
/// Returns `Ok(None)` if the stream ends before a complete header.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Frame>, TransportError>
where
    R: AsyncRead + Unpin + Send,
{
    let mut header_buf = [0u8; FrameHeader::SIZE];
    match reader.read_exact(&mut header_buf).await {
        Ok(_) => {},
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let header = FrameHeader::from_bytes(&header_buf)?;
    let mut payload = vec![0u8; header.payload_size()];
    reader.read_exact(&mut payload).await?;

    Ok(Some(Frame::new(header, payload)))
}

/// Client side of a handoff: send `token`, wait for the ack.
pub async fn exchange_token<S>(stream: &mut S, token: TokenPass) -> Result<TokenAck, TransportError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let frame = Payload::TokenPass(token).into_frame()?;
    write_frame(stream, &frame).await?;

    let Some(reply) = read_frame(stream).await? else {
        return Err(TransportError::ClosedBeforeAck);
    };

    match Payload::from_frame(reply)? {
        Payload::TokenAck(ack) => Ok(ack),
        other => Err(TransportError::UnexpectedPayload(other.opcode())),
    }
}
