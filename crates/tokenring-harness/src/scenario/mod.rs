//! Scenario testing with mandatory oracles.
//!
//! A scenario describes a ring and a script of steps (requests, ticks,
//! severed links, injected tokens). Running it requires an oracle that checks
//! the final [`RingWorld`], so no scenario passes without verification.
//!
//! ```text
//! RingScenario::new("name")
//!     .members([1, 2, 3])
//!     .request_entry(2)
//!     .rounds(2)
//!     .oracle(oracle::single_token_owner())
//!     .run()
//! ```

mod builder;
pub mod oracle;
mod world;

pub use builder::{RingScenario, RunnableScenario, Step};
pub use world::{RingEvent, RingWorld};

/// Verification run against the final world state.
pub type OracleFn = Box<dyn Fn(&RingWorld) -> Result<(), String>>;
