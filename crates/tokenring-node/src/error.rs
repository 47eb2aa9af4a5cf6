//! Node-level errors.

use std::io;

use thiserror::Error;
use tokenring_core::{PeerError, SinkError, TransportError};

use crate::config::ConfigError;

/// Anything that stops the node process.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Invalid command line
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Listen address could not be bound
    #[error("failed to listen on {addr}: {source}")]
    Bind {
        /// Requested address
        addr: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Critical-section file could not be prepared
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// Successor never became reachable
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Peer stopped on a local invariant violation
    #[error(transparent)]
    Peer(#[from] PeerError),

    /// Other I/O failure
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}
