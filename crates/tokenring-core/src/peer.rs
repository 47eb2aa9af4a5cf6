//! Peer state machine for ring-token mutual exclusion.
//!
//! # Architecture: Action-Based State Machine
//!
//! - Methods never perform I/O
//! - [`PeerStateMachine::tick`] returns `Result<Vec<PeerAction>, PeerError>`
//! - The driver executes actions (append to the sink, send the token) and
//!   reports the handoff outcome back with [`PeerStateMachine::complete_pass`]
//!   or [`PeerStateMachine::abort_pass`]
//!
//! # State Machine
//!
//! ```text
//!                 RequestEntry
//!      ┌──────┐ ───────────────> ┌─────────┐
//!      │ Idle │                  │ Waiting │
//!      └──────┘ <───┐            └─────────┘
//!         │         │ Tick:           │
//!         │ Receive │ [enter,] pass   │ ReceiveToken
//!         │ Token   │                 ▼
//!         ▼         │            ┌──────────┐
//!    ┌─────────┐    ├─────────── │ Eligible │
//!    │ Holding │ ───┘            └──────────┘
//!    └─────────┘
//! ```
//!
//! # Handoff
//!
//! Passing is two-phase so possession is never cleared optimistically:
//!
//! 1. `tick` (or `pass_token`) marks a handoff in flight and emits
//!    [`PeerAction::PassToken`]. The peer still holds the token.
//! 2. On acknowledgement the driver calls `complete_pass`, which clears
//!    possession. On failure it calls `abort_pass`, which keeps it.
//!
//! While a handoff is in flight `tick` is a no-op, and a peer that already
//! entered during the current possession does not enter again until it has
//! released the token, even if the pass failed and must be retried.

use tokenring_proto::{PeerId, TokenAck, TokenPass};

use crate::{
    error::PeerError,
    ring::RingTopology,
    token::{PeerPhase, TokenState},
};

/// Actions returned by the peer state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerAction {
    /// Append one record to the critical-section sink
    EnterCriticalSection {
        /// 1-based count of entries this peer has made
        sequence: u64,
    },

    /// Send the token to the successor and report the outcome
    PassToken {
        /// Successor receiving the token
        to: PeerId,
        /// Token message to send
        token: TokenPass,
    },
}

/// Which senders a peer accepts the token from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReceivePolicy {
    /// Only the ring predecessor may hand over the token
    #[default]
    PredecessorOnly,
    /// Any sender is accepted
    AnySender,
}

/// Peer configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerConfig {
    /// Sender check applied to inbound tokens
    pub receive_policy: ReceivePolicy,
    /// Reason text attached to every token this peer passes
    pub pass_reason: String,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self { receive_policy: ReceivePolicy::default(), pass_reason: "passing on token".into() }
    }
}

/// Counters for observation and tests. Not protocol state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeerStats {
    /// Tokens accepted from another peer
    pub tokens_received: u64,
    /// Critical-section entries performed
    pub entries: u64,
    /// Confirmed handoffs
    pub passes: u64,
    /// Handoffs that failed; possession was retained
    pub failed_passes: u64,
    /// Inbound tokens refused (duplicate or unexpected sender)
    pub rejected_tokens: u64,
    /// Entries the sink failed to record
    pub sink_failures: u64,
}

/// Point-in-time view of a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerSnapshot {
    /// Peer identity
    pub local: PeerId,
    /// Possession and intent
    pub token: TokenState,
    /// Destination of an unconfirmed handoff
    pub pass_in_flight: Option<PeerId>,
    /// Counters
    pub stats: PeerStats,
}

impl PeerSnapshot {
    /// Derived phase.
    pub fn phase(&self) -> PeerPhase {
        self.token.phase()
    }

    /// Holds the token and is not in the middle of releasing it.
    ///
    /// During a handoff the receiver may already hold the token while the
    /// sender waits for the ack; only the receiver counts as the owner.
    pub fn owns_token(&self) -> bool {
        self.token.has_token() && self.pass_in_flight.is_none()
    }
}

/// Peer state machine
///
/// Owns the peer's [`TokenState`] exclusively. Pure: no I/O, no clock.
#[derive(Debug, Clone)]
pub struct PeerStateMachine {
    topology: RingTopology,
    config: PeerConfig,
    token: TokenState,
    pass_in_flight: Option<PeerId>,
    entered_this_visit: bool,
    stats: PeerStats,
}

impl PeerStateMachine {
    /// Create a peer, seeded with the token if it is the ring's designated
    /// initial holder.
    pub fn new(topology: RingTopology, config: PeerConfig) -> Self {
        let token = TokenState::new(topology.starts_with_token());
        Self {
            topology,
            config,
            token,
            pass_in_flight: None,
            entered_this_visit: false,
            stats: PeerStats::default(),
        }
    }

    /// This peer's identity.
    pub fn local(&self) -> PeerId {
        self.topology.local()
    }

    /// Ring as seen from this peer.
    pub fn topology(&self) -> &RingTopology {
        &self.topology
    }

    /// Possession and intent.
    pub fn token_state(&self) -> TokenState {
        self.token
    }

    /// Derived phase.
    pub fn phase(&self) -> PeerPhase {
        self.token.phase()
    }

    /// Destination of an unconfirmed handoff.
    pub fn pass_in_flight(&self) -> Option<PeerId> {
        self.pass_in_flight
    }

    /// Counters.
    pub fn stats(&self) -> PeerStats {
        self.stats
    }

    /// Point-in-time view.
    pub fn snapshot(&self) -> PeerSnapshot {
        PeerSnapshot {
            local: self.local(),
            token: self.token,
            pass_in_flight: self.pass_in_flight,
            stats: self.stats,
        }
    }

    /// Record the wish to enter the critical section on the next possession.
    ///
    /// Valid in any phase. Calling it again before being served changes
    /// nothing.
    pub fn request_entry(&mut self) {
        if !self.token.wants_entry() {
            tracing::debug!(peer = %self.local(), "entry requested");
        }
        self.token.set_wants_entry(true);
    }

    /// Take possession of a token handed over by `pass.sender_id`.
    ///
    /// # Errors
    ///
    /// - `DuplicateToken` if this peer already holds the token. The second
    ///   token is refused; the single-token invariant is already broken
    ///   upstream.
    /// - `UnexpectedSender` if the policy is [`ReceivePolicy::PredecessorOnly`]
    ///   and the sender is not this peer's predecessor.
    ///
    /// No protocol state changes on error.
    pub fn receive_token(&mut self, pass: &TokenPass) -> Result<TokenAck, PeerError> {
        let local = self.local();
        let from = pass.sender_id;

        if self.token.has_token() {
            self.stats.rejected_tokens += 1;
            return Err(PeerError::DuplicateToken { local, from });
        }

        if self.config.receive_policy == ReceivePolicy::PredecessorOnly {
            let expected = self.topology.predecessor();
            if from != expected {
                self.stats.rejected_tokens += 1;
                return Err(PeerError::UnexpectedSender { local, from, expected });
            }
        }

        self.token.set_has_token(true);
        self.stats.tokens_received += 1;
        tracing::debug!(peer = %local, %from, reason = %pass.reason, "token received");

        Ok(TokenAck::new(format!("token accepted by peer {local}")))
    }

    /// Decide what to do with the current state.
    ///
    /// Without the token, or while a handoff is in flight, nothing happens.
    /// With the token: if entry was requested (and not already served during
    /// this possession) emit exactly one `EnterCriticalSection`, then always
    /// emit `PassToken`.
    pub fn tick(&mut self) -> Result<Vec<PeerAction>, PeerError> {
        if self.pass_in_flight.is_some() || !self.token.has_token() {
            return Ok(Vec::new());
        }

        let mut actions = Vec::with_capacity(2);

        if self.token.wants_entry() && !self.entered_this_visit {
            self.token.set_wants_entry(false);
            self.entered_this_visit = true;
            self.stats.entries += 1;
            actions.push(PeerAction::EnterCriticalSection { sequence: self.stats.entries });
        }

        actions.push(self.pass_token()?);
        Ok(actions)
    }

    /// Start handing the token to the successor.
    ///
    /// Possession is retained until [`Self::complete_pass`].
    ///
    /// # Errors
    ///
    /// `LocalInvariantViolation` without the token, `HandoffInFlight` if a
    /// pass is already pending. Nothing is mutated on error.
    pub fn pass_token(&mut self) -> Result<PeerAction, PeerError> {
        if !self.token.has_token() {
            return Err(PeerError::LocalInvariantViolation {
                operation: "pass_token",
                phase: self.phase(),
            });
        }
        if let Some(to) = self.pass_in_flight {
            return Err(PeerError::HandoffInFlight { to });
        }

        let to = self.topology.successor();
        self.pass_in_flight = Some(to);

        Ok(PeerAction::PassToken {
            to,
            token: TokenPass::new(self.local(), self.config.pass_reason.clone()),
        })
    }

    /// The successor acknowledged the token; release possession.
    pub fn complete_pass(&mut self, to: PeerId, ack: &TokenAck) -> Result<(), PeerError> {
        self.take_in_flight(to)?;

        self.token.set_has_token(false);
        self.entered_this_visit = false;
        self.stats.passes += 1;
        tracing::debug!(peer = %self.local(), %to, ack = %ack.message, "token handed off");

        Ok(())
    }

    /// The handoff failed; keep possession so the token is not lost.
    pub fn abort_pass(&mut self, to: PeerId) -> Result<(), PeerError> {
        self.take_in_flight(to)?;

        self.stats.failed_passes += 1;
        tracing::debug!(peer = %self.local(), %to, "handoff aborted, token retained");

        Ok(())
    }

    /// Count an entry the sink failed to record.
    pub fn record_sink_failure(&mut self) {
        self.stats.sink_failures += 1;
    }

    fn take_in_flight(&mut self, to: PeerId) -> Result<(), PeerError> {
        match self.pass_in_flight {
            Some(pending) if pending == to => {
                self.pass_in_flight = None;
                Ok(())
            },
            _ => Err(PeerError::NoHandoffInFlight { to }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(local: u64, policy: ReceivePolicy) -> PeerStateMachine {
        let members = vec![PeerId(1), PeerId(2), PeerId(3)];
        let topology = RingTopology::new(members, PeerId(local)).unwrap();
        PeerStateMachine::new(
            topology,
            PeerConfig { receive_policy: policy, ..PeerConfig::default() },
        )
    }

    fn from(sender: u64) -> TokenPass {
        TokenPass::new(PeerId(sender), "test")
    }

    #[test]
    fn only_initial_holder_is_seeded() {
        assert_eq!(peer(1, ReceivePolicy::default()).phase(), PeerPhase::Holding);
        assert_eq!(peer(2, ReceivePolicy::default()).phase(), PeerPhase::Idle);
        assert_eq!(peer(3, ReceivePolicy::default()).phase(), PeerPhase::Idle);
    }

    #[test]
    fn idle_request_then_receive_becomes_eligible() {
        let mut p = peer(2, ReceivePolicy::default());

        p.request_entry();
        assert_eq!(p.phase(), PeerPhase::Waiting);

        let ack = p.receive_token(&from(1)).unwrap();
        assert!(ack.message.contains("peer 2"));
        assert_eq!(p.phase(), PeerPhase::Eligible);
    }

    #[test]
    fn idle_receive_becomes_holding() {
        let mut p = peer(2, ReceivePolicy::default());
        p.receive_token(&from(1)).unwrap();
        assert_eq!(p.phase(), PeerPhase::Holding);
        assert_eq!(p.stats().tokens_received, 1);
    }

    #[test]
    fn tick_without_token_is_noop() {
        let mut idle = peer(2, ReceivePolicy::default());
        assert!(idle.tick().unwrap().is_empty());
        assert_eq!(idle.phase(), PeerPhase::Idle);

        let mut waiting = peer(3, ReceivePolicy::default());
        waiting.request_entry();
        assert!(waiting.tick().unwrap().is_empty());
        assert_eq!(waiting.phase(), PeerPhase::Waiting);
    }

    #[test]
    fn holding_tick_passes_without_entering() {
        let mut p = peer(1, ReceivePolicy::default());

        let actions = p.tick().unwrap();
        assert_eq!(
            actions,
            vec![PeerAction::PassToken {
                to: PeerId(2),
                token: TokenPass::new(PeerId(1), "passing on token"),
            }]
        );

        // Possession retained until the ack
        assert!(p.token_state().has_token());
        assert_eq!(p.pass_in_flight(), Some(PeerId(2)));

        p.complete_pass(PeerId(2), &TokenAck::new("ok")).unwrap();
        assert_eq!(p.phase(), PeerPhase::Idle);
        assert_eq!(p.stats().entries, 0);
        assert_eq!(p.stats().passes, 1);
    }

    #[test]
    fn eligible_tick_enters_once_then_passes() {
        let mut p = peer(1, ReceivePolicy::default());
        p.request_entry();

        let actions = p.tick().unwrap();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0], PeerAction::EnterCriticalSection { sequence: 1 });
        assert!(matches!(actions[1], PeerAction::PassToken { to: PeerId(2), .. }));
        assert!(!p.token_state().wants_entry());

        p.complete_pass(PeerId(2), &TokenAck::new("ok")).unwrap();
        assert_eq!(p.phase(), PeerPhase::Idle);
    }

    #[test]
    fn tick_during_handoff_is_noop() {
        let mut p = peer(1, ReceivePolicy::default());
        p.tick().unwrap();
        p.request_entry();

        assert!(p.tick().unwrap().is_empty());
        assert!(p.token_state().wants_entry());
    }

    #[test]
    fn failed_pass_keeps_token_and_does_not_reenter() {
        let mut p = peer(1, ReceivePolicy::default());
        p.request_entry();
        p.tick().unwrap();

        p.abort_pass(PeerId(2)).unwrap();
        assert!(p.token_state().has_token());
        assert_eq!(p.pass_in_flight(), None);
        assert_eq!(p.stats().failed_passes, 1);

        // A fresh request while still holding waits for the next possession
        p.request_entry();
        let retry = p.tick().unwrap();
        assert_eq!(retry.len(), 1);
        assert!(matches!(retry[0], PeerAction::PassToken { .. }));
        assert_eq!(p.stats().entries, 1);

        p.complete_pass(PeerId(2), &TokenAck::new("ok")).unwrap();
        assert_eq!(p.phase(), PeerPhase::Waiting);
    }

    #[test]
    fn pass_without_token_is_rejected_without_mutation() {
        let mut p = peer(2, ReceivePolicy::default());
        p.request_entry();
        let before = p.snapshot();

        let result = p.pass_token();
        assert_eq!(
            result,
            Err(PeerError::LocalInvariantViolation {
                operation: "pass_token",
                phase: PeerPhase::Waiting
            })
        );
        assert_eq!(p.snapshot(), before);
    }

    #[test]
    fn second_pass_while_in_flight_is_rejected() {
        let mut p = peer(1, ReceivePolicy::default());
        p.pass_token().unwrap();
        assert_eq!(p.pass_token(), Err(PeerError::HandoffInFlight { to: PeerId(2) }));
    }

    #[test]
    fn completing_unknown_handoff_is_rejected() {
        let mut p = peer(1, ReceivePolicy::default());
        let ack = TokenAck::new("ok");
        assert_eq!(
            p.complete_pass(PeerId(2), &ack),
            Err(PeerError::NoHandoffInFlight { to: PeerId(2) })
        );

        p.pass_token().unwrap();
        assert_eq!(
            p.complete_pass(PeerId(3), &ack),
            Err(PeerError::NoHandoffInFlight { to: PeerId(3) })
        );
        assert!(p.token_state().has_token());
    }

    #[test]
    fn duplicate_token_is_refused() {
        let mut p = peer(2, ReceivePolicy::default());
        p.receive_token(&from(1)).unwrap();
        p.request_entry();
        let before = p.token_state();

        let result = p.receive_token(&from(1));
        assert_eq!(result, Err(PeerError::DuplicateToken { local: PeerId(2), from: PeerId(1) }));
        assert_eq!(p.token_state(), before);
        assert_eq!(p.stats().entries, 0);
        assert_eq!(p.stats().rejected_tokens, 1);
    }

    #[test]
    fn predecessor_only_refuses_other_senders() {
        let mut p = peer(2, ReceivePolicy::PredecessorOnly);
        let result = p.receive_token(&from(3));
        assert_eq!(
            result,
            Err(PeerError::UnexpectedSender {
                local: PeerId(2),
                from: PeerId(3),
                expected: PeerId(1)
            })
        );
        assert!(!p.token_state().has_token());
    }

    #[test]
    fn any_sender_policy_accepts_other_senders() {
        let mut p = peer(2, ReceivePolicy::AnySender);
        p.receive_token(&from(3)).unwrap();
        assert!(p.token_state().has_token());
    }

    #[test]
    fn request_entry_is_idempotent() {
        let mut p = peer(3, ReceivePolicy::default());
        p.request_entry();
        let once = p.snapshot();
        p.request_entry();
        assert_eq!(p.snapshot(), once);
        assert!(p.token_state().wants_entry());
    }
}
