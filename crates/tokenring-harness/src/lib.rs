//! Deterministic simulation harness for token ring testing.
//!
//! - [`local`]: synchronous in-process ring of real state machines
//! - [`model`]: reference model and operations for model-based tests
//! - [`scenario`]: scripted scenarios with mandatory oracles
//! - [`sim_env`] / [`sim_transport`]: turmoil-backed environment and
//!   transport for running real peer runtimes over a simulated network

pub mod local;
pub mod model;
pub mod scenario;
pub mod sim_env;
pub mod sim_transport;

pub use local::{LocalRing, LocalRingError, LocalTick};
pub use model::{ModelRing, Operation, OperationResult, RealRing};
pub use sim_env::SimEnv;
pub use sim_transport::{SimTransport, TOKEN_PORT, host_name};
