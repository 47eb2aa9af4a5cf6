//! World state for scenario execution.
//!
//! Wraps the [`LocalRing`] being driven and records what happened at every
//! step, so oracles can check properties over the whole run and not just the
//! final state.

use tokenring_core::{PeerId, PeerSnapshot, SinkEntry};

use crate::local::{LocalRing, LocalTick};

/// Something observable that happened during a scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RingEvent {
    /// A peer's tick finished
    Ticked {
        /// Peer that ticked
        peer: PeerId,
        /// What the tick did
        outcome: LocalTick,
    },
    /// A token was injected outside the ring
    Injected {
        /// Receiving peer
        to: PeerId,
        /// Claimed sender
        from: PeerId,
        /// Whether the receiver accepted it
        accepted: bool,
    },
    /// Handoffs from a peer were cut
    Severed(PeerId),
    /// Handoffs from a peer were restored
    Restored(PeerId),
}

/// Ring plus execution history.
#[derive(Debug, Clone)]
pub struct RingWorld {
    ring: LocalRing,
    events: Vec<RingEvent>,
    owner_counts: Vec<usize>,
}

impl RingWorld {
    /// World around a freshly built ring.
    pub fn new(ring: LocalRing) -> Self {
        let initial = ring.owners().len();
        Self { ring, events: Vec::new(), owner_counts: vec![initial] }
    }

    /// Ring being driven.
    pub fn ring(&self) -> &LocalRing {
        &self.ring
    }

    /// Mutable ring, for the scenario runner.
    pub(crate) fn ring_mut(&mut self) -> &mut LocalRing {
        &mut self.ring
    }

    /// Record `event` and sample the owner count.
    pub(crate) fn record(&mut self, event: RingEvent) {
        self.events.push(event);
        self.owner_counts.push(self.ring.owners().len());
    }

    /// Snapshot of `peer`.
    pub fn snapshot(&self, peer: PeerId) -> Option<PeerSnapshot> {
        self.ring.peer(peer).map(|p| p.snapshot())
    }

    /// Current token owners.
    pub fn owners(&self) -> Vec<PeerId> {
        self.ring.owners()
    }

    /// Critical-section records, in order.
    pub fn entries(&self) -> &[SinkEntry] {
        self.ring.entries()
    }

    /// Everything that happened, in order.
    pub fn events(&self) -> &[RingEvent] {
        &self.events
    }

    /// Highest number of simultaneous owners seen after any step.
    pub fn max_owners_seen(&self) -> usize {
        self.owner_counts.iter().copied().max().unwrap_or(0)
    }

    /// Lowest number of simultaneous owners seen after any step.
    pub fn min_owners_seen(&self) -> usize {
        self.owner_counts.iter().copied().min().unwrap_or(0)
    }

    /// Peers in the order they acquired the token through the ring.
    pub fn acquisitions(&self) -> Vec<PeerId> {
        self.events
            .iter()
            .filter_map(|event| match event {
                RingEvent::Ticked { outcome: LocalTick::Passed { to, .. }, .. } => Some(*to),
                _ => None,
            })
            .collect()
    }
}
