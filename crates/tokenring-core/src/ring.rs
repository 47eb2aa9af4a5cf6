//! Ring topology.
//!
//! An ordered, fixed set of members where each member's successor is the next
//! entry, wrapping from the last back to the first. The topology is validated
//! once at construction and never changes afterwards.

use std::collections::HashSet;

use tokenring_proto::PeerId;

use crate::error::RingError;

/// Fixed ring membership as seen from one peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingTopology {
    members: Vec<PeerId>,
    position: usize,
    initial_holder: PeerId,
}

impl RingTopology {
    /// Smallest ring in which passing a token is meaningful.
    pub const MIN_MEMBERS: usize = 2;

    /// Validate `members` (in ring order) as seen from `local`.
    ///
    /// The first member is the designated bootstrap holder; see
    /// [`Self::with_initial_holder`] to choose another.
    ///
    /// # Errors
    ///
    /// Rejects fewer than [`Self::MIN_MEMBERS`] members, duplicate
    /// identities, and a `local` identity that is not a member.
    pub fn new(members: Vec<PeerId>, local: PeerId) -> Result<Self, RingError> {
        if members.len() < Self::MIN_MEMBERS {
            return Err(RingError::TooFewMembers { count: members.len() });
        }

        let mut seen = HashSet::with_capacity(members.len());
        for member in &members {
            if !seen.insert(*member) {
                return Err(RingError::DuplicateMember(*member));
            }
        }

        let position =
            members.iter().position(|m| *m == local).ok_or(RingError::NotMember(local))?;
        let initial_holder = members[0];

        Ok(Self { members, position, initial_holder })
    }

    /// Designate `holder` as the peer seeded with the token at startup.
    pub fn with_initial_holder(mut self, holder: PeerId) -> Result<Self, RingError> {
        if !self.members.contains(&holder) {
            return Err(RingError::NotMember(holder));
        }
        self.initial_holder = holder;
        Ok(self)
    }

    /// The peer this topology was built for.
    pub fn local(&self) -> PeerId {
        self.members[self.position]
    }

    /// Where this peer sends the token.
    pub fn successor(&self) -> PeerId {
        self.members[(self.position + 1) % self.members.len()]
    }

    /// The only peer that should ever send this peer the token.
    pub fn predecessor(&self) -> PeerId {
        self.members[(self.position + self.members.len() - 1) % self.members.len()]
    }

    /// Successor of any member, `None` for non-members.
    pub fn successor_of(&self, peer: PeerId) -> Option<PeerId> {
        let index = self.index_of(peer)?;
        Some(self.members[(index + 1) % self.members.len()])
    }

    /// Predecessor of any member, `None` for non-members.
    pub fn predecessor_of(&self, peer: PeerId) -> Option<PeerId> {
        let index = self.index_of(peer)?;
        Some(self.members[(index + self.members.len() - 1) % self.members.len()])
    }

    /// Peer seeded with the token at ring startup.
    pub fn initial_holder(&self) -> PeerId {
        self.initial_holder
    }

    /// Whether the local peer starts with the token.
    pub fn starts_with_token(&self) -> bool {
        self.local() == self.initial_holder
    }

    /// Members in ring order.
    pub fn members(&self) -> &[PeerId] {
        &self.members
    }

    /// Ring size.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false; a validated ring has at least two members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether `peer` is a member.
    pub fn contains(&self, peer: PeerId) -> bool {
        self.index_of(peer).is_some()
    }

    /// Same ring, seen from another member.
    pub fn for_member(&self, peer: PeerId) -> Result<Self, RingError> {
        let position = self.index_of(peer).ok_or(RingError::NotMember(peer))?;
        Ok(Self { members: self.members.clone(), position, initial_holder: self.initial_holder })
    }

    fn index_of(&self, peer: PeerId) -> Option<usize> {
        self.members.iter().position(|m| *m == peer)
    }
}
