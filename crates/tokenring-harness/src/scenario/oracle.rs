//! Reusable oracles.

use std::collections::BTreeSet;

use tokenring_core::PeerId;

use crate::{
    local::LocalTick,
    scenario::{OracleFn, RingEvent, RingWorld},
};

/// At most one peer owned the token after every step, and exactly one does
/// at the end.
pub fn single_token_owner() -> OracleFn {
    Box::new(|world: &RingWorld| {
        if world.max_owners_seen() > 1 {
            return Err(format!("{} peers owned the token at once", world.max_owners_seen()));
        }
        match world.owners().as_slice() {
            [_] => Ok(()),
            owners => Err(format!("expected one token owner at the end, found {owners:?}")),
        }
    })
}

/// The token was never lost: some peer owned it after every step.
pub fn token_never_lost() -> OracleFn {
    Box::new(|world: &RingWorld| {
        if world.min_owners_seen() == 0 {
            return Err("token had no owner after some step".into());
        }
        Ok(())
    })
}

/// Every member acquired the token through the ring at least once.
pub fn every_peer_received_token() -> OracleFn {
    Box::new(|world: &RingWorld| {
        let acquired: BTreeSet<PeerId> = world.acquisitions().into_iter().collect();
        let missing: Vec<PeerId> =
            world.ring().members().iter().copied().filter(|m| !acquired.contains(m)).collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!("peers never received the token: {missing:?}"))
        }
    })
}

/// Tokens moved only from each peer to its successor.
pub fn acquisitions_follow_ring_order() -> OracleFn {
    Box::new(|world: &RingWorld| {
        let members = world.ring().members();
        for event in world.events() {
            if let RingEvent::Ticked { peer, outcome: LocalTick::Passed { to, .. } } = event {
                let position = members.iter().position(|m| m == peer);
                let expected = position.map(|i| members[(i + 1) % members.len()]);
                if expected != Some(*to) {
                    return Err(format!("{peer} passed to {to}, expected {expected:?}"));
                }
            }
        }
        Ok(())
    })
}

/// No injected token was accepted while the ring already had one.
pub fn no_duplicate_accepted() -> OracleFn {
    Box::new(|world: &RingWorld| {
        let accepted: Vec<&RingEvent> = world
            .events()
            .iter()
            .filter(|e| matches!(e, RingEvent::Injected { accepted: true, .. }))
            .collect();
        if accepted.is_empty() {
            Ok(())
        } else {
            Err(format!("injected tokens were accepted: {accepted:?}"))
        }
    })
}

/// Every oracle must pass.
pub fn all_of(oracles: Vec<OracleFn>) -> OracleFn {
    Box::new(move |world: &RingWorld| {
        for oracle in &oracles {
            oracle(world)?;
        }
        Ok(())
    })
}
