//! Environment abstraction for deterministic testing.
//!
//! The driver and workload policies never read the clock, sleep, or draw
//! randomness directly. Production supplies the system clock and thread RNG;
//! simulation supplies virtual time and a seeded RNG so runs are
//! reproducible.

use std::{
    future::Future,
    time::{Duration, Instant},
};

/// Source of time and randomness.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Current time.
    fn now(&self) -> Instant;

    /// Suspend for `duration`.
    ///
    /// Under simulation this advances virtual time instead of blocking.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;

    /// Fill `buffer` with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_le_bytes(bytes)
    }
}
