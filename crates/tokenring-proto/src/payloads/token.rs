//! Token handoff payload types.

use serde::{Deserialize, Serialize};

use crate::ids::PeerId;

/// Token handed to the next peer in the ring
///
/// # Protocol Flow
///
/// The current holder opens a connection to its successor and sends a
/// `TokenPass`. The successor takes possession and replies with a
/// [`TokenAck`]. Until that ack arrives the sender still considers itself the
/// holder, so a lost or refused pass never loses the token.
///
/// The token deliberately carries no sequence number or epoch: duplicate
/// detection relies on the receiver's local possession flag only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPass {
    /// Identity of the peer releasing the token
    pub sender_id: PeerId,

    /// Free-form, application-defined reason (may be empty)
    #[serde(default)]
    pub reason: String,
}

impl TokenPass {
    /// Token from `sender_id` with the given reason.
    pub fn new(sender_id: PeerId, reason: impl Into<String>) -> Self {
        Self { sender_id, reason: reason.into() }
    }
}

/// Receipt confirming a [`TokenPass`] was accepted
///
/// The message is informational; only the arrival of the ack matters to the
/// sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAck {
    /// Human-readable acknowledgement
    pub message: String,
}

impl TokenAck {
    /// Ack carrying `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}
