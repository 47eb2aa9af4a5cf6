//! Reference model of a token ring.
//!
//! The model tracks the ring as a single holder index plus per-peer intent,
//! which is the obviously-correct description of the protocol. Model-based
//! tests run the same [`Operation`] sequence against the model and a
//! [`LocalRing`] of real state machines and require identical results.
//!
//! Peers are addressed by index `0..size`; index `i` is [`PeerId`] `i + 1` on
//! the real side.

use arbitrary::Arbitrary;
use tokenring_core::{PeerConfig, PeerId, RingError};

use crate::local::{LocalRing, LocalTick};

/// One step applied to both model and real ring.
#[derive(Debug, Clone, PartialEq, Eq, Arbitrary)]
pub enum Operation {
    /// Peer asks to enter the critical section
    RequestEntry {
        /// Peer index
        peer: u8,
    },
    /// Peer runs its decision step
    Tick {
        /// Peer index
        peer: u8,
    },
    /// Handoffs from this peer start failing
    Sever {
        /// Peer index
        peer: u8,
    },
    /// Handoffs from this peer work again
    Restore {
        /// Peer index
        peer: u8,
    },
}

impl Operation {
    /// Same operation with its peer index reduced modulo `size`.
    pub fn clamp(self, size: usize) -> Self {
        let wrap = |peer: u8| (usize::from(peer) % size.max(1)) as u8;
        match self {
            Self::RequestEntry { peer } => Self::RequestEntry { peer: wrap(peer) },
            Self::Tick { peer } => Self::Tick { peer: wrap(peer) },
            Self::Sever { peer } => Self::Sever { peer: wrap(peer) },
            Self::Restore { peer } => Self::Restore { peer: wrap(peer) },
        }
    }
}

/// Observable result of an [`Operation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    /// Operation applied, nothing to report
    Ok,
    /// Tick with nothing to do
    Idle,
    /// Token handed to `to`
    Passed {
        /// Successor index
        to: u8,
        /// Entered the critical section first
        entered: bool,
    },
    /// Handoff to `to` failed; token kept
    PassFailed {
        /// Successor index
        to: u8,
        /// Entered the critical section first
        entered: bool,
    },
    /// Real implementation returned an error the model never produces
    Error(String),
}

/// Reference ring.
#[derive(Debug, Clone)]
pub struct ModelRing {
    holder: usize,
    entered_this_visit: bool,
    wants_entry: Vec<bool>,
    severed: Vec<bool>,
    entries: Vec<u8>,
}

impl ModelRing {
    /// Ring of `size` peers; peer 0 holds the token.
    pub fn new(size: usize) -> Self {
        Self {
            holder: 0,
            entered_this_visit: false,
            wants_entry: vec![false; size],
            severed: vec![false; size],
            entries: Vec::new(),
        }
    }

    /// Number of peers.
    pub fn size(&self) -> usize {
        self.wants_entry.len()
    }

    /// Index of the peer holding the token.
    pub fn holder(&self) -> u8 {
        self.holder as u8
    }

    /// Whether `peer` has an unserved request.
    pub fn wants_entry(&self, peer: u8) -> bool {
        self.wants_entry.get(usize::from(peer)).copied().unwrap_or(false)
    }

    /// Peers that entered, in order.
    pub fn entries(&self) -> &[u8] {
        &self.entries
    }

    /// Apply `op`. Out-of-range peers are ignored.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        match *op {
            Operation::RequestEntry { peer } => {
                if let Some(wants) = self.wants_entry.get_mut(usize::from(peer)) {
                    *wants = true;
                }
                OperationResult::Ok
            },
            Operation::Sever { peer } | Operation::Restore { peer } => {
                if let Some(severed) = self.severed.get_mut(usize::from(peer)) {
                    *severed = matches!(op, Operation::Sever { .. });
                }
                OperationResult::Ok
            },
            Operation::Tick { peer } => self.tick(usize::from(peer)),
        }
    }

    fn tick(&mut self, peer: usize) -> OperationResult {
        if peer != self.holder {
            return OperationResult::Idle;
        }

        let entered = self.wants_entry[peer] && !self.entered_this_visit;
        if entered {
            self.wants_entry[peer] = false;
            self.entered_this_visit = true;
            self.entries.push(peer as u8);
        }

        let to = (peer + 1) % self.size();
        if self.severed[peer] {
            return OperationResult::PassFailed { to: to as u8, entered };
        }

        self.holder = to;
        self.entered_this_visit = false;
        OperationResult::Passed { to: to as u8, entered }
    }
}

/// Real ring addressed by model indices.
#[derive(Debug, Clone)]
pub struct RealRing {
    ring: LocalRing,
}

impl RealRing {
    /// Ring of `size` state machines with identities `1..=size`.
    pub fn new(size: usize) -> Result<Self, RingError> {
        let members = (1..=size as u64).map(PeerId).collect();
        Ok(Self { ring: LocalRing::new(members, None, &PeerConfig::default())? })
    }

    /// Underlying ring.
    pub fn ring(&self) -> &LocalRing {
        &self.ring
    }

    /// Apply `op` to the real state machines.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        let result = match *op {
            Operation::RequestEntry { peer } => {
                self.ring.request_entry(Self::id(peer)).map(|()| OperationResult::Ok)
            },
            Operation::Sever { peer } => {
                self.ring.sever(Self::id(peer));
                Ok(OperationResult::Ok)
            },
            Operation::Restore { peer } => {
                self.ring.restore(Self::id(peer));
                Ok(OperationResult::Ok)
            },
            Operation::Tick { peer } => self.ring.tick(Self::id(peer)).map(|tick| match tick {
                LocalTick::Idle => OperationResult::Idle,
                LocalTick::Passed { to, entered } => {
                    OperationResult::Passed { to: Self::index(to), entered }
                },
                LocalTick::PassFailed { to, entered, .. } => {
                    OperationResult::PassFailed { to: Self::index(to), entered }
                },
            }),
        };

        result.unwrap_or_else(|e| OperationResult::Error(e.to_string()))
    }

    /// Model index of the single token owner, if exactly one exists.
    pub fn holder(&self) -> Option<u8> {
        match self.ring.owners().as_slice() {
            [owner] => Some(Self::index(*owner)),
            _ => None,
        }
    }

    /// Model indices of the peers that entered, in order.
    pub fn entries(&self) -> Vec<u8> {
        self.ring.entries().iter().map(|e| Self::index(e.peer)).collect()
    }

    fn id(index: u8) -> PeerId {
        PeerId(u64::from(index) + 1)
    }

    fn index(peer: PeerId) -> u8 {
        (peer.get() - 1) as u8
    }
}
