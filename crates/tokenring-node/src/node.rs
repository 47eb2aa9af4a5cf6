//! Node assembly: sink, listener, inbound server, and outbound driver.

use std::{io, net::SocketAddr};

use tokenring_core::{
    PeerHandle, PeerRuntime, PeerStateMachine, RandomWorkload, serve_connection,
};
use tokio::net::TcpListener;

use crate::{
    config::NodeConfig, env::SystemEnv, error::NodeError, sink::FileSink,
    transport::TcpTransport,
};

/// A bound, ready-to-run peer.
#[derive(Debug)]
pub struct Node {
    config: NodeConfig,
    listener: TcpListener,
    handle: PeerHandle,
    sink: FileSink,
}

impl Node {
    /// Bind the configured listen address and prepare the sink.
    pub async fn bind(config: NodeConfig) -> Result<Self, NodeError> {
        let listener = TcpListener::bind(&config.listen)
            .await
            .map_err(|source| NodeError::Bind { addr: config.listen.clone(), source })?;
        Self::with_listener(config, listener).await
    }

    /// Use an already-bound listener.
    pub async fn with_listener(config: NodeConfig, listener: TcpListener) -> Result<Self, NodeError> {
        let local = config.local();

        if config.truncate_sink {
            FileSink::truncate(&config.sink_path).await?;
            tracing::info!(peer = %local, path = %config.sink_path.display(), "critical section log reset");
        }
        let sink = FileSink::open(&config.sink_path).await?;

        let machine = PeerStateMachine::new(config.topology.clone(), config.peer.clone());
        let handle = PeerHandle::new(machine);

        Ok(Self { config, listener, handle, sink })
    }

    /// Address tokens are accepted on.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Shared handle to this node's state machine.
    pub fn handle(&self) -> &PeerHandle {
        &self.handle
    }

    /// Serve inbound tokens, wait for the successor, then drive the peer.
    ///
    /// Runs until the peer stops on a local invariant violation.
    pub async fn run(self) -> Result<(), NodeError> {
        let Self { config, listener, handle, sink } = self;
        let local = config.local();
        let successor = config.topology.successor();

        tracing::info!(
            peer = %local,
            addr = %listener.local_addr()?,
            %successor,
            holder = config.topology.starts_with_token(),
            "listening"
        );
        let server = tokio::spawn(serve(listener, handle.clone()));

        let transport = TcpTransport::new(config.addresses.clone()).with_timeout(config.pass_timeout);
        transport.wait_until_reachable(successor, config.connect_retry).await?;
        tracing::info!(peer = %local, %successor, "successor reachable, ring running");

        let env = SystemEnv;
        let workload = RandomWorkload::new(env, config.workload.clone());
        let runtime = PeerRuntime::new(handle, transport, sink, workload, env);

        let error = runtime.run().await;
        server.abort();
        Err(error.into())
    }
}

/// Accept loop: one task per inbound connection.
///
/// Accept errors are logged and the loop continues.
pub async fn serve(listener: TcpListener, handle: PeerHandle) {
    loop {
        let (stream, remote) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(error) => {
                tracing::warn!(peer = %handle.local(), %error, "accept failed");
                continue;
            },
        };

        let handle = handle.clone();
        tokio::spawn(async move {
            if let Err(error) = stream.set_nodelay(true) {
                tracing::debug!(%remote, %error, "failed to set TCP_NODELAY");
            }
            match serve_connection(stream, handle).await {
                Ok(accepted) => tracing::trace!(%remote, accepted, "connection closed"),
                Err(error) => tracing::warn!(%remote, %error, "connection dropped"),
            }
        });
    }
}
