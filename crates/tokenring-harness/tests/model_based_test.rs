//! Model-based property tests.
//!
//! These tests generate random operation sequences and verify that a ring of
//! real state machines behaves identically to the reference model, and that
//! the ring-wide safety properties hold after every operation.
//!
//! # Architecture
//!
//! ```text
//! proptest generates: Vec<Operation>
//!                          │
//!           ┌──────────────┼──────────────┐
//!           ▼              ▼              ▼
//!       ModelRing      RealRing        Compare
//!      (reference)   (LocalRing)       Results
//! ```

use proptest::prelude::*;
use tokenring_core::{PeerConfig, PeerId, RingTopology};
use tokenring_harness::{ModelRing, Operation, OperationResult, RealRing};

fn operation_strategy(max_peers: u8) -> impl Strategy<Value = Operation> {
    let peer = 0..max_peers;

    prop_oneof![
        2 => peer.clone().prop_map(|peer| Operation::RequestEntry { peer }),
        6 => peer.clone().prop_map(|peer| Operation::Tick { peer }),
        1 => peer.clone().prop_map(|peer| Operation::Sever { peer }),
        1 => peer.prop_map(|peer| Operation::Restore { peer }),
    ]
}

proptest! {
    /// Results must match operation by operation.
    #[test]
    fn prop_model_matches_real(
        size in 2..6usize,
        ops in prop::collection::vec(operation_strategy(6), 0..100)
    ) {
        let mut model = ModelRing::new(size);
        let mut real = RealRing::new(size).unwrap();

        for (i, op) in ops.into_iter().enumerate() {
            let op = op.clamp(size);
            let model_result = model.apply(&op);
            let real_result = real.apply(&op);

            prop_assert_eq!(
                &model_result, &real_result,
                "Divergence at operation {}: {:?}", i, op
            );
            prop_assert_eq!(real.holder(), Some(model.holder()));
        }

        prop_assert_eq!(real.entries(), model.entries().to_vec());
    }

    /// Exactly one owner after every operation, and a failed pass never moves
    /// the token.
    #[test]
    fn prop_single_owner_and_no_loss(
        size in 2..6usize,
        ops in prop::collection::vec(operation_strategy(6), 0..100)
    ) {
        let mut real = RealRing::new(size).unwrap();

        for op in ops {
            let op = op.clamp(size);
            let before = real.holder();
            let result = real.apply(&op);

            prop_assert_eq!(real.ring().owners().len(), 1);
            if let OperationResult::PassFailed { .. } = result {
                prop_assert_eq!(real.holder(), before);
            }
            prop_assert!(!matches!(result, OperationResult::Error(_)), "{:?}", result);
        }
    }

    /// An entry is always followed by a pass attempt in the same tick, and no
    /// peer enters twice during one possession.
    #[test]
    fn prop_entry_released_within_tick(
        size in 2..6usize,
        ops in prop::collection::vec(operation_strategy(6), 0..100)
    ) {
        let mut real = RealRing::new(size).unwrap();
        let mut entered_since_release = vec![false; size];

        for op in ops {
            let op = op.clamp(size);
            match real.apply(&op) {
                OperationResult::Passed { entered, .. } => {
                    if let Operation::Tick { peer } = op {
                        let slot = &mut entered_since_release[usize::from(peer)];
                        prop_assert!(!(entered && *slot), "peer {} entered twice in one visit", peer);
                        *slot = false;
                    }
                },
                OperationResult::PassFailed { entered, .. } => {
                    if let Operation::Tick { peer } = op {
                        let slot = &mut entered_since_release[usize::from(peer)];
                        prop_assert!(!(entered && *slot), "peer {} entered twice in one visit", peer);
                        *slot |= entered;
                    }
                },
                _ => {},
            }
        }
    }

    /// Requesting twice is the same as requesting once.
    #[test]
    fn prop_request_entry_idempotent(size in 2..6usize, peer in 0..6u8) {
        let peer = peer % size as u8;
        let mut once = RealRing::new(size).unwrap();
        let mut twice = RealRing::new(size).unwrap();

        once.apply(&Operation::RequestEntry { peer });
        twice.apply(&Operation::RequestEntry { peer });
        twice.apply(&Operation::RequestEntry { peer });

        let id = PeerId(u64::from(peer) + 1);
        let a = once.ring().peer(id).unwrap().snapshot();
        let b = twice.ring().peer(id).unwrap().snapshot();
        prop_assert_eq!(a, b);
        prop_assert!(twice.ring().peer(id).unwrap().token_state().wants_entry());
    }

    /// Walking the successor chain N times returns to the start.
    #[test]
    fn prop_ring_closure(size in 2..16u64, start in 0..16u64) {
        let members: Vec<PeerId> = (0..size).map(|i| PeerId(i * 7 + 3)).collect();
        let local = members[(start % size) as usize];
        let topology = RingTopology::new(members, local).unwrap();

        let mut current = local;
        for _ in 0..size {
            current = topology.successor_of(current).unwrap();
        }
        prop_assert_eq!(current, local);
    }
}

#[test]
fn peer_config_default_is_predecessor_only() {
    // The model assumes the default policy refuses forged tokens
    assert_eq!(PeerConfig::default().receive_policy, tokenring_core::ReceivePolicy::PredecessorOnly);
}
