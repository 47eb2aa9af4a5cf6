//! Scenario builder API.
//!
//! Declarative construction of ring scenarios that enforce the Oracle
//! Pattern: a scenario cannot run until an oracle is attached.

use tokenring_core::{PeerConfig, PeerId, ReceivePolicy};

use crate::{
    local::{LocalRing, LocalRingError},
    scenario::{OracleFn, RingEvent, RingWorld},
};

/// One scripted step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Peer asks to enter the critical section
    RequestEntry(PeerId),
    /// Peer runs one decision step
    Tick(PeerId),
    /// Tick every member in ring order, this many times
    Rounds(usize),
    /// Handoffs from the peer start failing
    Sever(PeerId),
    /// Handoffs from the peer work again
    Restore(PeerId),
    /// Deliver a token to `to` claiming to come from `from`
    InjectToken {
        /// Receiver
        to: PeerId,
        /// Claimed sender
        from: PeerId,
    },
}

/// Scenario builder.
///
/// Defaults to a three-member ring `1 -> 2 -> 3` with peer 1 holding the
/// token. Call `.oracle()` to get a [`RunnableScenario`].
pub struct RingScenario {
    name: String,
    members: Vec<PeerId>,
    initial_holder: Option<PeerId>,
    config: PeerConfig,
    steps: Vec<Step>,
}

impl RingScenario {
    /// New scenario with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: vec![PeerId(1), PeerId(2), PeerId(3)],
            initial_holder: None,
            config: PeerConfig::default(),
            steps: Vec::new(),
        }
    }

    /// Ring members in ring order.
    pub fn members(mut self, members: impl IntoIterator<Item = u64>) -> Self {
        self.members = members.into_iter().map(PeerId).collect();
        self
    }

    /// Peer seeded with the token (defaults to the first member).
    pub fn initial_holder(mut self, holder: u64) -> Self {
        self.initial_holder = Some(PeerId(holder));
        self
    }

    /// Sender check applied by every peer.
    pub fn receive_policy(mut self, policy: ReceivePolicy) -> Self {
        self.config.receive_policy = policy;
        self
    }

    /// Append an arbitrary step.
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Append [`Step::RequestEntry`].
    pub fn request_entry(self, peer: u64) -> Self {
        self.step(Step::RequestEntry(PeerId(peer)))
    }

    /// Append [`Step::Tick`].
    pub fn tick(self, peer: u64) -> Self {
        self.step(Step::Tick(PeerId(peer)))
    }

    /// Append [`Step::Rounds`].
    pub fn rounds(self, rounds: usize) -> Self {
        self.step(Step::Rounds(rounds))
    }

    /// Append [`Step::Sever`].
    pub fn sever(self, peer: u64) -> Self {
        self.step(Step::Sever(PeerId(peer)))
    }

    /// Append [`Step::Restore`].
    pub fn restore(self, peer: u64) -> Self {
        self.step(Step::Restore(PeerId(peer)))
    }

    /// Append [`Step::InjectToken`].
    pub fn inject_token(self, to: u64, from: u64) -> Self {
        self.step(Step::InjectToken { to: PeerId(to), from: PeerId(from) })
    }

    /// Set the oracle function and return a runnable scenario.
    ///
    /// The oracle is mandatory - you cannot run a scenario without
    /// verification.
    pub fn oracle(self, oracle: OracleFn) -> RunnableScenario {
        RunnableScenario { scenario: self, oracle }
    }
}

/// A scenario with an oracle function that can be executed.
pub struct RunnableScenario {
    scenario: RingScenario,
    oracle: OracleFn,
}

impl RunnableScenario {
    /// Execute every step, then run the oracle on the resulting world.
    ///
    /// Refused tokens and failed handoffs are recorded, not treated as
    /// failures; the oracle decides whether they were expected.
    pub fn run(self) -> Result<(), String> {
        let RingScenario { name, members, initial_holder, config, steps } = self.scenario;

        let ring = LocalRing::new(members, initial_holder, &config)
            .map_err(|e| format!("Scenario '{name}': invalid ring: {e}"))?;
        let mut world = RingWorld::new(ring);

        for (index, step) in steps.iter().enumerate() {
            execute(&mut world, step)
                .map_err(|e| format!("Scenario '{name}': step {index} ({step:?}) failed: {e}"))?;
        }

        (self.oracle)(&world).map_err(|e| format!("Scenario '{name}': oracle failed: {e}"))
    }
}

fn execute(world: &mut RingWorld, step: &Step) -> Result<(), LocalRingError> {
    match *step {
        Step::RequestEntry(peer) => world.ring_mut().request_entry(peer),
        Step::Tick(peer) => tick(world, peer),
        Step::Rounds(rounds) => {
            let members = world.ring().members().to_vec();
            for _ in 0..rounds {
                for &peer in &members {
                    tick(world, peer)?;
                }
            }
            Ok(())
        },
        Step::Sever(peer) => {
            world.ring_mut().sever(peer);
            world.record(RingEvent::Severed(peer));
            Ok(())
        },
        Step::Restore(peer) => {
            world.ring_mut().restore(peer);
            world.record(RingEvent::Restored(peer));
            Ok(())
        },
        Step::InjectToken { to, from } => {
            let accepted = match world.ring_mut().inject_token(to, from) {
                Ok(_) => true,
                Err(LocalRingError::Peer(error)) if error.is_protocol_violation() => false,
                Err(other) => return Err(other),
            };
            world.record(RingEvent::Injected { to, from, accepted });
            Ok(())
        },
    }
}

fn tick(world: &mut RingWorld, peer: PeerId) -> Result<(), LocalRingError> {
    let outcome = world.ring_mut().tick(peer)?;
    world.record(RingEvent::Ticked { peer, outcome });
    Ok(())
}
