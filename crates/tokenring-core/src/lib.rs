//! Token ring protocol core logic
//!
//! Pure state machine logic for ring-token mutual exclusion, decoupled from
//! I/O so it can be driven identically by production runtimes, deterministic
//! unit tests, and network simulation.
//!
//! # Architecture
//!
//! The [`peer::PeerStateMachine`] never performs I/O. Its transitions return
//! declarative [`peer::PeerAction`]s (enter the critical section, pass the
//! token) that a driver executes. The generic [`runtime::PeerRuntime`] is that
//! driver: it owns a transport, a sink, a workload policy and an environment,
//! and serializes every access to the state machine through one per-peer lock
//! that is never held across a network round trip.
//!
//! ```text
//!   workload ──> RequestEntry ─┐
//!                              ▼
//!   driver ───> Tick ──> PeerStateMachine ──> [EnterCriticalSection, PassToken]
//!                              ▲                      │             │
//!   inbound ──> ReceiveToken ──┘                 sink.append   transport.pass
//! ```
//!
//! # Components
//!
//! - [`ring`]: Ring topology (successor, predecessor, validation)
//! - [`token`]: Per-peer token possession and entry intent
//! - [`peer`]: Peer state machine (request, receive, tick, handoff)
//! - [`runtime`]: Driver loop and inbound connection handling
//! - [`mod@env`]: Environment abstraction (time, RNG)
//! - [`transport`]: Token transport contract and frame I/O
//! - [`sink`]: Critical-section sink contract
//! - [`workload`]: Policies deciding when to request entry
//! - [`error`]: Error types

pub mod env;
pub mod error;
pub mod peer;
pub mod ring;
pub mod runtime;
pub mod sink;
pub mod token;
pub mod transport;
pub mod workload;

pub use env::Environment;
pub use error::{ErrorKind, PeerError, RingError, ServeError, SinkError, TransportError};
pub use peer::{PeerAction, PeerConfig, PeerSnapshot, PeerStateMachine, PeerStats, ReceivePolicy};
pub use ring::RingTopology;
pub use runtime::{PeerHandle, PeerRuntime, StepOutcome, serve_connection};
pub use sink::{CriticalSectionSink, MemorySink, SinkEntry};
pub use token::{PeerPhase, TokenState};
pub use tokenring_proto::{PeerId, TokenAck, TokenPass};
pub use transport::TokenTransport;
pub use workload::{RandomWorkload, ScriptedWorkload, WorkloadConfig, WorkloadPolicy};
