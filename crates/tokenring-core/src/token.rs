//! Per-peer token possession and entry intent.
//!
//! A plain record. It enforces nothing on its own; every transition goes
//! through [`crate::PeerStateMachine`], which owns it exclusively.

/// Whether this peer holds the token and whether it wants to enter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenState {
    has_token: bool,
    wants_entry: bool,
}

/// Phase derived from [`TokenState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerPhase {
    /// No token, no request
    Idle,
    /// No token, entry requested
    Waiting,
    /// Token held, no request
    Holding,
    /// Token held, entry requested
    Eligible,
}

impl TokenState {
    /// State seeded at ring startup.
    pub fn new(has_token: bool) -> Self {
        Self { has_token, wants_entry: false }
    }

    /// Whether this peer holds the token.
    pub fn has_token(&self) -> bool {
        self.has_token
    }

    /// Whether this peer has an unserved entry request.
    pub fn wants_entry(&self) -> bool {
        self.wants_entry
    }

    /// Record possession.
    pub fn set_has_token(&mut self, has_token: bool) {
        self.has_token = has_token;
    }

    /// Record entry intent.
    pub fn set_wants_entry(&mut self, wants_entry: bool) {
        self.wants_entry = wants_entry;
    }

    /// Derived phase.
    pub fn phase(&self) -> PeerPhase {
        match (self.has_token, self.wants_entry) {
            (false, false) => PeerPhase::Idle,
            (false, true) => PeerPhase::Waiting,
            (true, false) => PeerPhase::Holding,
            (true, true) => PeerPhase::Eligible,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_follows_flags() {
        let mut state = TokenState::default();
        assert_eq!(state.phase(), PeerPhase::Idle);

        state.set_wants_entry(true);
        assert_eq!(state.phase(), PeerPhase::Waiting);

        state.set_has_token(true);
        assert_eq!(state.phase(), PeerPhase::Eligible);

        state.set_wants_entry(false);
        assert_eq!(state.phase(), PeerPhase::Holding);
        assert!(state.has_token());
        assert!(!state.wants_entry());
    }

    #[test]
    fn seeded_state_never_wants_entry() {
        assert_eq!(TokenState::new(true).phase(), PeerPhase::Holding);
        assert_eq!(TokenState::new(false).phase(), PeerPhase::Idle);
    }
}
