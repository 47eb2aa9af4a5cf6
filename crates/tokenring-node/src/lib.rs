//! Token ring peer process
//!
//! Production wiring for one peer of a token ring: clap configuration, a TCP
//! [`transport::TcpTransport`], a [`sink::FileSink`] shared by all peers on a
//! host, and the [`node::Node`] that ties them to the core runtime.
//!
//! ```text
//!   tokenring-node --id 5001 --peer 5001=127.0.0.1:5001 \
//!                  --peer 5002=127.0.0.1:5002 --peer 5003=127.0.0.1:5003
//! ```

pub mod config;
pub mod env;
pub mod error;
pub mod node;
pub mod sink;
pub mod transport;

pub use config::{Args, ConfigError, NodeConfig, PeerAddr};
pub use env::SystemEnv;
pub use error::NodeError;
pub use node::{Node, serve};
pub use sink::FileSink;
pub use transport::TcpTransport;
