//! TCP token transport.
//!
//! One connection per handoff: connect to the successor, send the
//! `TokenPass` frame, wait for the `TokenAck`, hang up. Addresses are fixed
//! for the ring's lifetime.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokenring_core::{
    PeerId, TokenAck, TokenPass, TokenTransport, TransportError, transport::exchange_token,
};
use tokio::net::TcpStream;

/// [`TokenTransport`] over plain TCP.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    addresses: Arc<HashMap<PeerId, String>>,
    timeout: Option<Duration>,
}

impl TcpTransport {
    /// Transport that reaches each peer at its listed address.
    pub fn new(addresses: HashMap<PeerId, String>) -> Self {
        Self { addresses: Arc::new(addresses), timeout: None }
    }

    /// Bound every handoff by `timeout`.
    ///
    /// A handoff that times out after the receiver accepted leaves both peers
    /// holding the token; keep the deadline well above the network round trip.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn address(&self, peer: PeerId) -> Result<&str, TransportError> {
        self.addresses.get(&peer).map(String::as_str).ok_or(TransportError::UnknownPeer(peer))
    }

    async fn connect(&self, peer: PeerId) -> Result<TcpStream, TransportError> {
        let addr = self.address(peer)?;
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| TransportError::Unreachable { peer, source })?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    async fn deliver(&self, to: PeerId, token: TokenPass) -> Result<TokenAck, TransportError> {
        let mut stream = self.connect(to).await?;
        exchange_token(&mut stream, token).await
    }

    /// Block until `peer` accepts connections, retrying every `retry`.
    ///
    /// Run once at bootstrap so the ring only starts when the successor is
    /// listening.
    pub async fn wait_until_reachable(
        &self,
        peer: PeerId,
        retry: Duration,
    ) -> Result<(), TransportError> {
        loop {
            match self.connect(peer).await {
                Ok(_) => return Ok(()),
                Err(TransportError::Unreachable { source, .. }) => {
                    tracing::debug!(%peer, error = %source, "successor not reachable yet");
                    tokio::time::sleep(retry).await;
                },
                Err(other) => return Err(other),
            }
        }
    }
}

#[async_trait]
impl TokenTransport for TcpTransport {
    async fn pass(&self, to: PeerId, token: TokenPass) -> Result<TokenAck, TransportError> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.deliver(to, token))
                .await
                .map_err(|_| TransportError::Timeout(limit))?,
            None => self.deliver(to, token).await,
        }
    }
}
