//! Error types for ring configuration, the peer state machine, transport and
//! sinks.
//!
//! Nothing here is swallowed silently: the runtime logs every error where it
//! is handled and counts it in [`crate::PeerStats`].

use std::{io, time::Duration};

use thiserror::Error;
use tokenring_proto::{Opcode, PeerId, ProtocolError};

use crate::token::PeerPhase;

/// Invalid ring configuration, rejected once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RingError {
    /// A ring needs at least two members to circulate a token
    #[error("ring needs at least 2 members, got {count}")]
    TooFewMembers {
        /// Number of members supplied
        count: usize,
    },

    /// Same identity listed twice
    #[error("peer {0} appears more than once in the ring")]
    DuplicateMember(PeerId),

    /// The local peer (or designated holder) is not in the ring
    #[error("peer {0} is not a member of the ring")]
    NotMember(PeerId),
}

/// Broad classification used for logging and operator alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The state machine was driven outside its transition table
    LocalInvariantViolation,
    /// A remote peer broke ring discipline; ring safety may be compromised
    ProtocolViolation,
    /// The token could not be delivered; possession was retained
    TransportFailure,
    /// A critical-section entry could not be recorded
    SinkFailure,
}

/// Errors surfaced by the peer state machine and runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeerError {
    /// Operation attempted without the state it requires
    #[error("local invariant violated: {operation} attempted while {phase:?}")]
    LocalInvariantViolation {
        /// Operation that was rejected
        operation: &'static str,
        /// Phase the peer was in
        phase: PeerPhase,
    },

    /// A second pass was attempted before the first was confirmed or aborted
    #[error("local invariant violated: handoff to {to} already in flight")]
    HandoffInFlight {
        /// Destination of the pending handoff
        to: PeerId,
    },

    /// Handoff confirmation or abort with no matching pending handoff
    #[error("local invariant violated: no handoff to {to} in flight")]
    NoHandoffInFlight {
        /// Destination named by the caller
        to: PeerId,
    },

    /// Token received while already holding one
    #[error("protocol violation: peer {local} received a duplicate token from {from}")]
    DuplicateToken {
        /// Receiving peer
        local: PeerId,
        /// Sender of the duplicate
        from: PeerId,
    },

    /// Token received from a peer other than the ring predecessor
    #[error(
        "protocol violation: peer {local} received a token from {from}, expected predecessor {expected}"
    )]
    UnexpectedSender {
        /// Receiving peer
        local: PeerId,
        /// Actual sender
        from: PeerId,
        /// Declared predecessor
        expected: PeerId,
    },

    /// Token could not be delivered to the successor
    #[error("transport failure passing token to {to}: {reason}")]
    TransportFailure {
        /// Intended receiver
        to: PeerId,
        /// Underlying transport error
        reason: String,
    },
}

impl PeerError {
    /// Classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::LocalInvariantViolation { .. }
            | Self::HandoffInFlight { .. }
            | Self::NoHandoffInFlight { .. } => ErrorKind::LocalInvariantViolation,
            Self::DuplicateToken { .. } | Self::UnexpectedSender { .. } => {
                ErrorKind::ProtocolViolation
            },
            Self::TransportFailure { .. } => ErrorKind::TransportFailure,
        }
    }

    /// Whether ring safety may already be compromised upstream.
    pub fn is_protocol_violation(&self) -> bool {
        self.kind() == ErrorKind::ProtocolViolation
    }
}

/// Failure delivering a token or reading its acknowledgement.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No network address is known for the destination
    #[error("no route to peer {0}")]
    UnknownPeer(PeerId),

    /// Destination could not be reached
    #[error("peer {peer} unreachable: {source}")]
    Unreachable {
        /// Destination
        peer: PeerId,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Destination refused the token
    #[error("peer {peer} rejected the token: {reason}")]
    Rejected {
        /// Destination
        peer: PeerId,
        /// Why the token was refused
        reason: String,
    },

    /// Connection closed before an acknowledgement arrived
    #[error("connection closed before acknowledgement")]
    ClosedBeforeAck,

    /// Frame of the wrong type for this point in the exchange
    #[error("unexpected {0:?} frame")]
    UnexpectedPayload(Opcode),

    /// Deployment-imposed deadline elapsed
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Malformed frame
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Stream I/O failure
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

/// Failure appending to the critical-section sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Backing storage rejected the write
    #[error("failed to write critical section entry: {0}")]
    Io(#[from] io::Error),

    /// Sink refused the entry (test doubles, closed sinks)
    #[error("critical section sink unavailable: {0}")]
    Unavailable(String),
}

/// Failure serving an inbound connection.
#[derive(Debug, Error)]
pub enum ServeError {
    /// Stream or framing failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The state machine refused the token; no ack was sent
    #[error("token rejected: {0}")]
    Rejected(#[from] PeerError),
}
