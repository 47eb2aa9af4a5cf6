//! Synchronous in-process ring.
//!
//! Drives real [`PeerStateMachine`]s without any runtime: a tick executes the
//! returned actions immediately, delivering the token straight into the
//! successor's state machine. Outbound links can be severed to model failed
//! handoffs. Used by scenario tests and as the real side of model-based tests.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use tokenring_core::{
    PeerAction, PeerConfig, PeerError, PeerId, PeerSnapshot, PeerStateMachine, RingError,
    RingTopology, SinkEntry, TokenAck, TokenPass,
};

/// Error driving a [`LocalRing`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocalRingError {
    /// Identity not in the ring
    #[error("peer {0} is not in the ring")]
    UnknownPeer(PeerId),

    /// State machine refused the operation
    #[error(transparent)]
    Peer(#[from] PeerError),
}

/// Result of ticking one peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalTick {
    /// No token, or nothing to do
    Idle,
    /// Token acknowledged by the successor
    Passed {
        /// Successor
        to: PeerId,
        /// Whether the peer entered the critical section first
        entered: bool,
    },
    /// Handoff failed; the peer kept the token
    PassFailed {
        /// Intended successor
        to: PeerId,
        /// Whether the peer entered the critical section first
        entered: bool,
        /// Why the handoff failed
        reason: String,
    },
}

/// Ring of state machines sharing one in-memory sink.
#[derive(Debug, Clone)]
pub struct LocalRing {
    members: Vec<PeerId>,
    peers: BTreeMap<PeerId, PeerStateMachine>,
    severed: BTreeSet<PeerId>,
    entries: Vec<SinkEntry>,
}

impl LocalRing {
    /// Build a ring over `members` in ring order.
    pub fn new(
        members: Vec<PeerId>,
        initial_holder: Option<PeerId>,
        config: &PeerConfig,
    ) -> Result<Self, RingError> {
        let first = members.first().copied().ok_or(RingError::TooFewMembers { count: 0 })?;
        let mut base = RingTopology::new(members.clone(), first)?;
        if let Some(holder) = initial_holder {
            base = base.with_initial_holder(holder)?;
        }

        let mut peers = BTreeMap::new();
        for &member in &members {
            let topology = base.for_member(member)?;
            peers.insert(member, PeerStateMachine::new(topology, config.clone()));
        }

        Ok(Self { members, peers, severed: BTreeSet::new(), entries: Vec::new() })
    }

    /// Members in ring order.
    pub fn members(&self) -> &[PeerId] {
        &self.members
    }

    /// State machine of `peer`.
    pub fn peer(&self, peer: PeerId) -> Option<&PeerStateMachine> {
        self.peers.get(&peer)
    }

    /// Snapshot of every peer, in ring order.
    pub fn snapshots(&self) -> Vec<PeerSnapshot> {
        self.members.iter().filter_map(|m| self.peers.get(m)).map(PeerStateMachine::snapshot).collect()
    }

    /// Peers that own the token (hold it with no handoff in flight).
    pub fn owners(&self) -> Vec<PeerId> {
        self.snapshots().into_iter().filter(PeerSnapshot::owns_token).map(|s| s.local).collect()
    }

    /// Critical-section records, in entry order.
    pub fn entries(&self) -> &[SinkEntry] {
        &self.entries
    }

    /// Record that `peer` wants to enter.
    pub fn request_entry(&mut self, peer: PeerId) -> Result<(), LocalRingError> {
        self.peer_mut(peer)?.request_entry();
        Ok(())
    }

    /// Make every handoff from `peer` fail until [`Self::restore`].
    pub fn sever(&mut self, peer: PeerId) {
        self.severed.insert(peer);
    }

    /// Undo [`Self::sever`].
    pub fn restore(&mut self, peer: PeerId) {
        self.severed.remove(&peer);
    }

    /// Whether handoffs from `peer` currently fail.
    pub fn is_severed(&self, peer: PeerId) -> bool {
        self.severed.contains(&peer)
    }

    /// Deliver a token to `to` as if sent by `from`, bypassing the ring.
    pub fn inject_token(&mut self, to: PeerId, from: PeerId) -> Result<TokenAck, LocalRingError> {
        let token = TokenPass::new(from, "injected");
        Ok(self.peer_mut(to)?.receive_token(&token)?)
    }

    /// Tick `peer` and execute its actions.
    pub fn tick(&mut self, peer: PeerId) -> Result<LocalTick, LocalRingError> {
        let actions = self.peer_mut(peer)?.tick()?;

        let mut entered = false;
        let mut outcome = LocalTick::Idle;

        for action in actions {
            match action {
                PeerAction::EnterCriticalSection { sequence } => {
                    entered = true;
                    self.entries.push(SinkEntry::new(peer, format!("entry {sequence}")));
                },
                PeerAction::PassToken { to, token } => {
                    outcome = self.deliver(peer, to, &token, entered)?;
                },
            }
        }

        Ok(outcome)
    }

    /// Tick every member once, in ring order starting from the first member.
    pub fn round(&mut self) -> Result<Vec<LocalTick>, LocalRingError> {
        let members = self.members.clone();
        members.into_iter().map(|m| self.tick(m)).collect()
    }

    fn deliver(
        &mut self,
        from: PeerId,
        to: PeerId,
        token: &TokenPass,
        entered: bool,
    ) -> Result<LocalTick, LocalRingError> {
        let received = if self.severed.contains(&from) {
            Err(format!("link from {from} severed"))
        } else {
            self.peer_mut(to)?.receive_token(token).map_err(|e| e.to_string())
        };

        let sender = self.peer_mut(from)?;
        match received {
            Ok(ack) => {
                sender.complete_pass(to, &ack)?;
                Ok(LocalTick::Passed { to, entered })
            },
            Err(reason) => {
                sender.abort_pass(to)?;
                Ok(LocalTick::PassFailed { to, entered, reason })
            },
        }
    }

    fn peer_mut(&mut self, peer: PeerId) -> Result<&mut PeerStateMachine, LocalRingError> {
        self.peers.get_mut(&peer).ok_or(LocalRingError::UnknownPeer(peer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring() -> LocalRing {
        LocalRing::new(vec![PeerId(1), PeerId(2), PeerId(3)], None, &PeerConfig::default()).unwrap()
    }

    #[test]
    fn round_moves_token_all_the_way() {
        let mut ring = ring();
        let ticks = ring.round().unwrap();

        // Ticking in ring order carries the token around once
        assert_eq!(ticks[0], LocalTick::Passed { to: PeerId(2), entered: false });
        assert_eq!(ticks[1], LocalTick::Passed { to: PeerId(3), entered: false });
        assert_eq!(ticks[2], LocalTick::Passed { to: PeerId(1), entered: false });
        assert_eq!(ring.owners(), vec![PeerId(1)]);
    }

    #[test]
    fn severed_link_keeps_token() {
        let mut ring = ring();
        ring.sever(PeerId(1));

        let tick = ring.tick(PeerId(1)).unwrap();
        assert!(matches!(tick, LocalTick::PassFailed { to: PeerId(2), entered: false, .. }));
        assert_eq!(ring.owners(), vec![PeerId(1)]);

        ring.restore(PeerId(1));
        assert!(!ring.is_severed(PeerId(1)));
        assert_eq!(ring.tick(PeerId(1)).unwrap(), LocalTick::Passed { to: PeerId(2), entered: false });
    }

    #[test]
    fn unknown_peer_is_reported() {
        let mut ring = ring();
        assert_eq!(ring.tick(PeerId(9)), Err(LocalRingError::UnknownPeer(PeerId(9))));
    }
}
