//! Token transport over turmoil's simulated TCP.
//!
//! Each ring member runs on its own turmoil host named after its identity
//! (see [`host_name`]) and accepts tokens on [`TOKEN_PORT`]. Partitions and
//! repairs between hosts are applied with `turmoil::partition` and
//! `turmoil::repair`.

use std::{net::Ipv4Addr, time::Duration};

use async_trait::async_trait;
use tokenring_core::{
    PeerHandle, PeerId, TokenAck, TokenPass, TokenTransport, TransportError, serve_connection,
    transport::exchange_token,
};
use turmoil::net::{TcpListener, TcpStream};

/// Port every simulated peer listens on.
pub const TOKEN_PORT: u16 = 7000;

/// Turmoil host name for `peer`.
pub fn host_name(peer: PeerId) -> String {
    format!("peer-{peer}")
}

/// [`TokenTransport`] dialing turmoil hosts.
///
/// Every handoff is bounded by a timeout so a partition shows up as a failed
/// pass instead of a hang.
#[derive(Debug, Clone, Copy)]
pub struct SimTransport {
    timeout: Duration,
}

impl SimTransport {
    /// Default handoff deadline.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

    /// Transport with the default deadline.
    pub fn new() -> Self {
        Self { timeout: Self::DEFAULT_TIMEOUT }
    }

    /// Transport with a custom deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn deliver(&self, to: PeerId, token: TokenPass) -> Result<TokenAck, TransportError> {
        let mut stream = TcpStream::connect(format!("{}:{TOKEN_PORT}", host_name(to)))
            .await
            .map_err(|source| TransportError::Unreachable { peer: to, source })?;
        exchange_token(&mut stream, token).await
    }
}

impl Default for SimTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenTransport for SimTransport {
    async fn pass(&self, to: PeerId, token: TokenPass) -> Result<TokenAck, TransportError> {
        tokio::time::timeout(self.timeout, self.deliver(to, token))
            .await
            .map_err(|_| TransportError::Timeout(self.timeout))?
    }
}

/// Accept tokens for `handle` on [`TOKEN_PORT`] until the host stops.
pub async fn serve(handle: PeerHandle) -> std::io::Result<()> {
    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, TOKEN_PORT)).await?;

    loop {
        let (stream, remote) = listener.accept().await?;
        let handle = handle.clone();
        tokio::spawn(async move {
            if let Err(error) = serve_connection(stream, handle).await {
                tracing::warn!(%remote, %error, "simulated connection dropped");
            }
        });
    }
}
