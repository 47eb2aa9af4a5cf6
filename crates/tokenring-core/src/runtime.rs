//! Async driver for a single peer.
//!
//! [`PeerHandle`] is the shared, lock-guarded view of one
//! [`PeerStateMachine`]. The outbound loop ([`PeerRuntime`]) and every inbound
//! connection ([`serve_connection`]) go through the same handle, so each
//! operation runs atomically against the peer's state. The lock is released
//! before any sink write or network send and re-acquired to apply the result.

use std::sync::Arc;

use tokenring_proto::{Payload, PeerId, TokenAck, TokenPass};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::Mutex,
};

use crate::{
    env::Environment,
    error::{ErrorKind, PeerError, ServeError, TransportError},
    peer::{PeerAction, PeerSnapshot, PeerStateMachine},
    sink::CriticalSectionSink,
    transport::{TokenTransport, read_frame, write_frame},
    workload::WorkloadPolicy,
};

/// Cloneable handle to one peer's state machine.
#[derive(Debug, Clone)]
pub struct PeerHandle {
    local: PeerId,
    machine: Arc<Mutex<PeerStateMachine>>,
}

impl PeerHandle {
    /// Wrap `machine` for shared use.
    pub fn new(machine: PeerStateMachine) -> Self {
        Self { local: machine.local(), machine: Arc::new(Mutex::new(machine)) }
    }

    /// Peer identity.
    pub fn local(&self) -> PeerId {
        self.local
    }

    /// See [`PeerStateMachine::request_entry`].
    pub async fn request_entry(&self) {
        self.machine.lock().await.request_entry();
    }

    /// See [`PeerStateMachine::receive_token`].
    ///
    /// Refusals are logged at error level: a refused token means ring
    /// discipline is already broken somewhere. The one exception is a token
    /// coming back from the peer we are still handing it to. In a two-member
    /// ring the successor may pass it back before its ack reaches us; the
    /// refusal only makes it retry, so it is logged as a warning.
    pub async fn receive_token(&self, pass: &TokenPass) -> Result<TokenAck, PeerError> {
        let (result, returned_before_ack) = {
            let mut machine = self.machine.lock().await;
            let returned_before_ack = machine.pass_in_flight() == Some(pass.sender_id);
            (machine.receive_token(pass), returned_before_ack)
        };

        match &result {
            Err(error) if returned_before_ack => {
                tracing::warn!(
                    peer = %self.local,
                    from = %pass.sender_id,
                    %error,
                    "token returned before ack, sender will retry"
                );
            },
            Err(error) => {
                tracing::error!(peer = %self.local, from = %pass.sender_id, %error, "refusing token");
            },
            Ok(_) => {},
        }
        result
    }

    /// See [`PeerStateMachine::tick`].
    pub async fn tick(&self) -> Result<Vec<PeerAction>, PeerError> {
        self.machine.lock().await.tick()
    }

    /// See [`PeerStateMachine::pass_token`].
    pub async fn pass_token(&self) -> Result<PeerAction, PeerError> {
        self.machine.lock().await.pass_token()
    }

    /// See [`PeerStateMachine::complete_pass`].
    pub async fn complete_pass(&self, to: PeerId, ack: &TokenAck) -> Result<(), PeerError> {
        self.machine.lock().await.complete_pass(to, ack)
    }

    /// See [`PeerStateMachine::abort_pass`].
    pub async fn abort_pass(&self, to: PeerId) -> Result<(), PeerError> {
        self.machine.lock().await.abort_pass(to)
    }

    /// See [`PeerStateMachine::record_sink_failure`].
    pub async fn record_sink_failure(&self) {
        self.machine.lock().await.record_sink_failure();
    }

    /// Point-in-time view of the peer.
    pub async fn snapshot(&self) -> PeerSnapshot {
        self.machine.lock().await.snapshot()
    }
}

/// What one tick accomplished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Nothing to do: no token, or a handoff already in flight
    Idle,
    /// Token handed to the successor
    Passed {
        /// Successor that acknowledged
        to: PeerId,
        /// Whether the peer entered the critical section first
        entered: bool,
    },
}

/// Outbound driver: decides, enters, and passes.
///
/// Generic over transport, sink, workload, and environment so the same loop
/// runs in production, in turmoil, and in plain unit tests.
pub struct PeerRuntime<T, S, W, E> {
    handle: PeerHandle,
    transport: T,
    sink: S,
    workload: W,
    env: E,
}

impl<T, S, W, E> PeerRuntime<T, S, W, E>
where
    T: TokenTransport,
    S: CriticalSectionSink,
    W: WorkloadPolicy,
    E: Environment,
{
    /// Driver for the peer behind `handle`.
    pub fn new(handle: PeerHandle, transport: T, sink: S, workload: W, env: E) -> Self {
        Self { handle, transport, sink, workload, env }
    }

    /// Handle shared with the inbound side.
    pub fn handle(&self) -> &PeerHandle {
        &self.handle
    }

    /// Consult the workload, then tick.
    pub async fn step(&mut self) -> Result<StepOutcome, PeerError> {
        if self.workload.should_request_entry() {
            self.handle.request_entry().await;
        }
        self.tick().await
    }

    /// Run the state machine's tick and execute the resulting actions.
    ///
    /// A sink failure is logged and counted; the token is still passed. A
    /// transport failure aborts the handoff, so the token stays here and the
    /// next tick retries.
    ///
    /// # Errors
    ///
    /// `TransportFailure` if the successor did not acknowledge, or a local
    /// invariant violation if the handle was driven concurrently from
    /// elsewhere.
    pub async fn tick(&mut self) -> Result<StepOutcome, PeerError> {
        let local = self.handle.local();
        let actions = self.handle.tick().await?;

        let mut entered = false;
        let mut outcome = StepOutcome::Idle;

        for action in actions {
            match action {
                PeerAction::EnterCriticalSection { sequence } => {
                    entered = true;
                    let payload = self.workload.entry_payload(local, sequence);
                    match self.sink.append(local, &payload).await {
                        Ok(()) => tracing::info!(peer = %local, sequence, "entered critical section"),
                        Err(error) => {
                            tracing::warn!(peer = %local, sequence, %error, "critical section entry not recorded");
                            self.handle.record_sink_failure().await;
                        },
                    }
                },
                PeerAction::PassToken { to, token } => match self.transport.pass(to, token).await {
                    Ok(ack) => {
                        self.handle.complete_pass(to, &ack).await?;
                        outcome = StepOutcome::Passed { to, entered };
                    },
                    Err(error) => {
                        tracing::warn!(peer = %local, %to, %error, "token handoff failed, keeping token");
                        self.handle.abort_pass(to).await?;
                        return Err(PeerError::TransportFailure { to, reason: error.to_string() });
                    },
                },
            }
        }

        Ok(outcome)
    }

    /// Drive the peer forever: sleep the workload's delay, then step.
    ///
    /// Transport failures are retried on the next step. Returns only when the
    /// state machine reports a local invariant violation, which means the
    /// handle was misused and the process should stop.
    pub async fn run(mut self) -> PeerError {
        loop {
            let delay = self.workload.next_action_delay();
            self.env.sleep(delay).await;

            match self.step().await {
                Ok(StepOutcome::Passed { to, entered }) => {
                    tracing::debug!(peer = %self.handle.local(), %to, entered, "step complete");
                },
                Ok(StepOutcome::Idle) => {},
                Err(error) if error.kind() == ErrorKind::LocalInvariantViolation => {
                    tracing::error!(peer = %self.handle.local(), %error, "stopping peer");
                    return error;
                },
                Err(_) => {},
            }
        }
    }
}

/// Serve one inbound connection: accept tokens and acknowledge them.
///
/// Reads `TokenPass` frames until the peer hangs up. A refused token closes
/// the connection without an ack, which the sender sees as a failed pass.
/// Returns the number of tokens accepted.
pub async fn serve_connection<S>(mut stream: S, handle: PeerHandle) -> Result<u64, ServeError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let mut accepted = 0;

    while let Some(frame) = read_frame(&mut stream).await? {
        let pass = match Payload::from_frame(frame).map_err(TransportError::from)? {
            Payload::TokenPass(pass) => pass,
            other => return Err(TransportError::UnexpectedPayload(other.opcode()).into()),
        };

        let ack = handle.receive_token(&pass).await?;
        let reply = Payload::TokenAck(ack).into_frame().map_err(TransportError::from)?;
        write_frame(&mut stream, &reply).await?;
        accepted += 1;
    }

    Ok(accepted)
}

#[cfg(test)]
mod tests {
    use tokenring_proto::Opcode;

    use super::*;
    use crate::{
        peer::{PeerConfig, ReceivePolicy},
        ring::RingTopology,
        token::PeerPhase,
        transport::exchange_token,
    };

    fn handle(local: u64) -> PeerHandle {
        let topology =
            RingTopology::new(vec![PeerId(1), PeerId(2), PeerId(3)], PeerId(local)).unwrap();
        PeerHandle::new(PeerStateMachine::new(topology, PeerConfig::default()))
    }

    #[tokio::test]
    async fn serve_acks_token_from_predecessor() {
        let receiver = handle(2);
        let (mut client, server) = tokio::io::duplex(1024);
        let task = tokio::spawn(serve_connection(server, receiver.clone()));

        let ack = exchange_token(&mut client, TokenPass::new(PeerId(1), "go")).await.unwrap();
        drop(client);

        assert_eq!(ack.message, "token accepted by peer 2");
        assert_eq!(task.await.unwrap().unwrap(), 1);
        assert_eq!(receiver.snapshot().await.phase(), PeerPhase::Holding);
    }

    #[tokio::test]
    async fn serve_closes_without_ack_on_refusal() {
        let receiver = handle(2);
        let (mut client, server) = tokio::io::duplex(1024);
        let task = tokio::spawn(serve_connection(server, receiver.clone()));

        let result = exchange_token(&mut client, TokenPass::new(PeerId(3), "skip")).await;
        assert!(matches!(result, Err(TransportError::ClosedBeforeAck)));

        let served = task.await.unwrap();
        assert!(matches!(served, Err(ServeError::Rejected(PeerError::UnexpectedSender { .. }))));

        let snapshot = receiver.snapshot().await;
        assert!(!snapshot.token.has_token());
        assert_eq!(snapshot.stats.rejected_tokens, 1);
    }

    #[tokio::test]
    async fn serve_rejects_ack_frames() {
        let (mut client, server) = tokio::io::duplex(1024);
        let task = tokio::spawn(serve_connection(server, handle(2)));

        let stray = Payload::TokenAck(TokenAck::new("?")).into_frame().unwrap();
        write_frame(&mut client, &stray).await.unwrap();

        let served = task.await.unwrap();
        assert!(matches!(
            served,
            Err(ServeError::Transport(TransportError::UnexpectedPayload(Opcode::TokenAck)))
        ));
    }

    #[tokio::test]
    async fn token_returned_before_ack_is_refused_then_retried() {
        let topology = RingTopology::new(vec![PeerId(1), PeerId(2)], PeerId(1)).unwrap();
        let sender = PeerHandle::new(PeerStateMachine::new(topology, PeerConfig::default()));

        // Handoff to 2 is pending when 2 already sends the token back
        let PeerAction::PassToken { to, .. } = sender.pass_token().await.unwrap() else {
            panic!("expected a pass");
        };
        assert_eq!(to, PeerId(2));

        let early = sender.receive_token(&TokenPass::new(PeerId(2), "back")).await;
        assert!(matches!(early, Err(PeerError::DuplicateToken { .. })));

        sender.complete_pass(to, &TokenAck::new("late ack")).await.unwrap();
        let snapshot = sender.snapshot().await;
        assert!(!snapshot.token.has_token());
        assert_eq!(snapshot.stats.rejected_tokens, 1);

        // The successor's retry now lands
        sender.receive_token(&TokenPass::new(PeerId(2), "back")).await.unwrap();
        assert!(sender.snapshot().await.owns_token());
    }

    #[tokio::test]
    async fn handle_clones_share_state() {
        let topology = RingTopology::new(vec![PeerId(1), PeerId(2)], PeerId(2)).unwrap();
        let config = PeerConfig { receive_policy: ReceivePolicy::AnySender, ..PeerConfig::default() };
        let a = PeerHandle::new(PeerStateMachine::new(topology, config));
        let b = a.clone();

        a.request_entry().await;
        b.receive_token(&TokenPass::new(PeerId(1), "")).await.unwrap();

        assert_eq!(a.snapshot().await.phase(), PeerPhase::Eligible);
        assert_eq!(a.local(), PeerId(2));
    }
}
