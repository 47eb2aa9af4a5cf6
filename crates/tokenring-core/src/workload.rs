//! Workload policies.
//!
//! A workload decides when a peer wants the critical section, how long the
//! driver waits between steps, and what a peer writes when it enters. It is
//! injected into the runtime and never seen by the state machine, so
//! deterministic doubles can replace randomness in tests.

use std::{collections::VecDeque, time::Duration};

use tokenring_proto::PeerId;

use crate::env::Environment;

/// Decides when the local peer requests entry and how fast the driver runs.
pub trait WorkloadPolicy: Send + 'static {
    /// Whether to request critical-section entry before the next tick.
    fn should_request_entry(&mut self) -> bool;

    /// Delay before the next driver step.
    fn next_action_delay(&mut self) -> Duration;

    /// Record written for the `sequence`-th entry of `peer`.
    fn entry_payload(&mut self, peer: PeerId, sequence: u64) -> String {
        format!("entry {sequence} from peer {peer}")
    }
}

/// Parameters for [`RandomWorkload`].
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadConfig {
    /// Upper bound of the uniform delay between steps (inclusive)
    pub max_delay: Duration,
    /// Probability in `[0, 1]` of requesting entry at each step
    pub request_probability: f64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self { max_delay: Duration::from_secs(9), request_probability: 0.2 }
    }
}

/// Randomized workload drawing from the [`Environment`].
#[derive(Debug, Clone)]
pub struct RandomWorkload<E> {
    env: E,
    config: WorkloadConfig,
}

impl<E: Environment> RandomWorkload<E> {
    /// Workload driven by `env`'s randomness.
    pub fn new(env: E, config: WorkloadConfig) -> Self {
        Self { env, config }
    }

    /// Uniform sample in `[0, 1)`.
    fn unit_sample(&self) -> f64 {
        // 53 random bits fill an f64 mantissa exactly
        (self.env.random_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

impl<E: Environment> WorkloadPolicy for RandomWorkload<E> {
    fn should_request_entry(&mut self) -> bool {
        self.unit_sample() < self.config.request_probability
    }

    fn next_action_delay(&mut self) -> Duration {
        let max_millis = self.config.max_delay.as_millis() as u64;
        if max_millis == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(self.env.random_u64() % max_millis.saturating_add(1))
    }
}

/// Deterministic workload replaying a fixed script of request decisions.
///
/// Once the script runs out the peer stops requesting entry.
#[derive(Debug, Clone, Default)]
pub struct ScriptedWorkload {
    requests: VecDeque<bool>,
    delay: Duration,
}

impl ScriptedWorkload {
    /// Replay `requests`, one decision per step, with a fixed `delay`.
    pub fn new(requests: impl IntoIterator<Item = bool>, delay: Duration) -> Self {
        Self { requests: requests.into_iter().collect(), delay }
    }

    /// Never request entry; just circulate the token.
    pub fn passive(delay: Duration) -> Self {
        Self::new([], delay)
    }

    /// Decisions not yet consumed.
    pub fn remaining(&self) -> usize {
        self.requests.len()
    }
}

impl WorkloadPolicy for ScriptedWorkload {
    fn should_request_entry(&mut self) -> bool {
        self.requests.pop_front().unwrap_or(false)
    }

    fn next_action_delay(&mut self) -> Duration {
        self.delay
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicU64, Ordering},
        },
        time::Instant,
    };

    use super::*;

    /// Counter-based environment: each draw returns the next value.
    #[derive(Clone, Default)]
    struct CountingEnv {
        next: Arc<AtomicU64>,
    }

    impl CountingEnv {
        fn starting_at(value: u64) -> Self {
            Self { next: Arc::new(AtomicU64::new(value)) }
        }
    }

    impl Environment for CountingEnv {
        fn now(&self) -> Instant {
            Instant::now()
        }

        async fn sleep(&self, _duration: Duration) {}

        fn random_bytes(&self, buffer: &mut [u8]) {
            let value = self.next.fetch_add(1, Ordering::SeqCst).to_le_bytes();
            for (dst, src) in buffer.iter_mut().zip(value.iter().cycle()) {
                *dst = *src;
            }
        }
    }

    #[test]
    fn scripted_workload_replays_then_goes_quiet() {
        let mut workload = ScriptedWorkload::new([true, false, true], Duration::from_millis(5));

        let decisions: Vec<bool> = (0..5).map(|_| workload.should_request_entry()).collect();
        assert_eq!(decisions, vec![true, false, true, false, false]);
        assert_eq!(workload.next_action_delay(), Duration::from_millis(5));
        assert_eq!(workload.remaining(), 0);
    }

    #[test]
    fn random_delay_stays_within_bound() {
        let config = WorkloadConfig { max_delay: Duration::from_millis(10), request_probability: 0.5 };
        let mut workload = RandomWorkload::new(CountingEnv::starting_at(0), config);

        for _ in 0..100 {
            assert!(workload.next_action_delay() <= Duration::from_millis(10));
        }
    }

    #[test]
    fn unbounded_max_delay_does_not_overflow() {
        let config =
            WorkloadConfig { max_delay: Duration::from_millis(u64::MAX), request_probability: 0.5 };
        let mut workload = RandomWorkload::new(CountingEnv::starting_at(u64::MAX - 1), config);

        assert_eq!(workload.next_action_delay(), Duration::from_millis(u64::MAX - 1));
        assert_eq!(workload.next_action_delay(), Duration::ZERO);
    }

    #[test]
    fn zero_max_delay_never_sleeps() {
        let config = WorkloadConfig { max_delay: Duration::ZERO, request_probability: 0.0 };
        let mut workload = RandomWorkload::new(CountingEnv::default(), config);
        assert_eq!(workload.next_action_delay(), Duration::ZERO);
    }

    #[test]
    fn probability_extremes() {
        let never = WorkloadConfig { request_probability: 0.0, ..WorkloadConfig::default() };
        let mut workload = RandomWorkload::new(CountingEnv::starting_at(0), never);
        assert!((0..50).all(|_| !workload.should_request_entry()));

        let always = WorkloadConfig { request_probability: 1.0, ..WorkloadConfig::default() };
        let mut workload = RandomWorkload::new(CountingEnv::starting_at(u64::MAX - 100), always);
        assert!((0..50).all(|_| workload.should_request_entry()));
    }

    #[test]
    fn default_payload_names_peer_and_sequence() {
        let mut workload = ScriptedWorkload::passive(Duration::ZERO);
        assert_eq!(workload.entry_payload(PeerId(3), 2), "entry 2 from peer 3");
    }
}
