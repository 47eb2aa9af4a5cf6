//! Command-line arguments and validated node configuration.

use std::{collections::HashMap, path::PathBuf, str::FromStr, time::Duration};

use clap::Parser;
use thiserror::Error;
use tokenring_core::{PeerConfig, PeerId, ReceivePolicy, RingError, RingTopology, WorkloadConfig};

/// Token ring peer
#[derive(Parser, Debug)]
#[command(name = "tokenring-node")]
#[command(about = "Run one peer of a token ring")]
pub struct Args {
    /// This peer's identity; must appear among the --peer entries
    #[arg(long)]
    pub id: u64,

    /// Ring member as ID=ADDR, repeated in ring order
    #[arg(long = "peer", value_name = "ID=ADDR", required = true)]
    pub peers: Vec<PeerAddr>,

    /// Peer that starts with the token [default: first --peer]
    #[arg(long)]
    pub initial_holder: Option<u64>,

    /// Address to accept tokens on [default: own --peer address]
    #[arg(long)]
    pub listen: Option<String>,

    /// Critical-section output file
    #[arg(long, default_value = "critical_section.log")]
    pub sink: PathBuf,

    /// Keep existing sink contents when this peer starts with the token
    #[arg(long)]
    pub keep_sink: bool,

    /// Accept the token from any peer, not just the ring predecessor
    #[arg(long)]
    pub accept_any_sender: bool,

    /// Upper bound of the random delay between steps, in milliseconds
    #[arg(long, default_value_t = 9000)]
    pub max_delay_ms: u64,

    /// Chance of requesting critical-section entry at each step
    #[arg(long, default_value_t = 0.2)]
    pub request_probability: f64,

    /// Reason text attached to every token this peer passes
    #[arg(long, default_value = "passing on token")]
    pub pass_reason: String,

    /// Give up on a handoff after this many milliseconds (retried later)
    #[arg(long)]
    pub pass_timeout_ms: Option<u64>,

    /// Delay between attempts to reach the successor at startup
    #[arg(long, default_value_t = 500)]
    pub connect_retry_ms: u64,

    /// Write logs to this file (truncated at startup) instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// One `ID=ADDR` ring member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerAddr {
    /// Member identity
    pub id: PeerId,
    /// Host and port the member listens on
    pub addr: String,
}

impl FromStr for PeerAddr {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidPeer(s.to_owned());

        let (id, addr) = s.split_once('=').ok_or_else(invalid)?;
        let id = id.trim().parse::<u64>().map_err(|_| invalid())?;
        let addr = addr.trim();
        if addr.is_empty() {
            return Err(invalid());
        }

        Ok(Self { id: PeerId(id), addr: addr.to_owned() })
    }
}

/// Invalid command line.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `--peer` value not of the form `ID=ADDR`
    #[error("invalid peer {0:?}, expected ID=ADDR")]
    InvalidPeer(String),

    /// Ring membership rejected
    #[error(transparent)]
    Ring(#[from] RingError),

    /// Probability outside `[0, 1]`
    #[error("request probability must be between 0 and 1, got {0}")]
    InvalidProbability(f64),
}

/// Validated node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Ring as seen from this node
    pub topology: RingTopology,
    /// Listen address of every member
    pub addresses: HashMap<PeerId, String>,
    /// Address this node accepts tokens on
    pub listen: String,
    /// State machine settings
    pub peer: PeerConfig,
    /// Random workload settings
    pub workload: WorkloadConfig,
    /// Critical-section output file
    pub sink_path: PathBuf,
    /// Empty the sink before the ring starts
    pub truncate_sink: bool,
    /// Per-handoff deadline
    pub pass_timeout: Option<Duration>,
    /// Startup reachability retry interval
    pub connect_retry: Duration,
}

impl NodeConfig {
    /// Validate `args`.
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&args.request_probability) {
            return Err(ConfigError::InvalidProbability(args.request_probability));
        }

        let local = PeerId(args.id);
        let members: Vec<PeerId> = args.peers.iter().map(|p| p.id).collect();
        let mut topology = RingTopology::new(members, local)?;
        if let Some(holder) = args.initial_holder {
            topology = topology.with_initial_holder(PeerId(holder))?;
        }

        let addresses: HashMap<PeerId, String> =
            args.peers.iter().map(|p| (p.id, p.addr.clone())).collect();
        let listen = match &args.listen {
            Some(listen) => listen.clone(),
            None => addresses.get(&local).cloned().ok_or(RingError::NotMember(local))?,
        };

        let receive_policy = if args.accept_any_sender {
            ReceivePolicy::AnySender
        } else {
            ReceivePolicy::PredecessorOnly
        };

        // Only the initial holder resets the shared sink, once, before any entry
        let truncate_sink = topology.starts_with_token() && !args.keep_sink;

        Ok(Self {
            topology,
            addresses,
            listen,
            peer: PeerConfig { receive_policy, pass_reason: args.pass_reason.clone() },
            workload: WorkloadConfig {
                max_delay: Duration::from_millis(args.max_delay_ms),
                request_probability: args.request_probability,
            },
            sink_path: args.sink.clone(),
            truncate_sink,
            pass_timeout: args.pass_timeout_ms.map(Duration::from_millis),
            connect_retry: Duration::from_millis(args.connect_retry_ms),
        })
    }

    /// This node's identity.
    pub fn local(&self) -> PeerId {
        self.topology.local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let base = [
            "tokenring-node",
            "--id",
            "5002",
            "--peer",
            "5001=127.0.0.1:5001",
            "--peer",
            "5002=127.0.0.1:5002",
            "--peer",
            "5003=127.0.0.1:5003",
        ];
        Args::try_parse_from(base.iter().chain(extra)).unwrap()
    }

    #[test]
    fn defaults_follow_ring_order() {
        let config = NodeConfig::from_args(&args(&[])).unwrap();

        assert_eq!(config.local(), PeerId(5002));
        assert_eq!(config.topology.successor(), PeerId(5003));
        assert_eq!(config.topology.initial_holder(), PeerId(5001));
        assert_eq!(config.listen, "127.0.0.1:5002");
        assert_eq!(config.peer.receive_policy, ReceivePolicy::PredecessorOnly);
        assert_eq!(config.workload, WorkloadConfig::default());
        assert_eq!(config.sink_path, PathBuf::from("critical_section.log"));
        assert!(!config.truncate_sink);
        assert_eq!(config.pass_timeout, None);
    }

    #[test]
    fn initial_holder_truncates_sink_unless_kept() {
        let config = NodeConfig::from_args(&args(&["--initial-holder", "5002"])).unwrap();
        assert!(config.topology.starts_with_token());
        assert!(config.truncate_sink);

        let kept = NodeConfig::from_args(&args(&["--initial-holder", "5002", "--keep-sink"])).unwrap();
        assert!(!kept.truncate_sink);
    }

    #[test]
    fn overrides_are_applied() {
        let config = NodeConfig::from_args(&args(&[
            "--listen",
            "0.0.0.0:6000",
            "--accept-any-sender",
            "--max-delay-ms",
            "10",
            "--pass-timeout-ms",
            "250",
        ]))
        .unwrap();

        assert_eq!(config.listen, "0.0.0.0:6000");
        assert_eq!(config.peer.receive_policy, ReceivePolicy::AnySender);
        assert_eq!(config.workload.max_delay, Duration::from_millis(10));
        assert_eq!(config.pass_timeout, Some(Duration::from_millis(250)));
    }

    #[test]
    fn peer_addr_parsing() {
        assert_eq!(
            "7=localhost:7000".parse::<PeerAddr>().unwrap(),
            PeerAddr { id: PeerId(7), addr: "localhost:7000".into() }
        );
        assert!("7".parse::<PeerAddr>().is_err());
        assert!("x=host:1".parse::<PeerAddr>().is_err());
        assert!("7=".parse::<PeerAddr>().is_err());
    }

    #[test]
    fn invalid_rings_are_rejected() {
        let single = Args::try_parse_from(["tokenring-node", "--id", "1", "--peer", "1=a:1"]).unwrap();
        assert!(matches!(
            NodeConfig::from_args(&single),
            Err(ConfigError::Ring(RingError::TooFewMembers { count: 1 }))
        ));

        assert!(matches!(
            NodeConfig::from_args(&args(&["--initial-holder", "9"])),
            Err(ConfigError::Ring(RingError::NotMember(PeerId(9))))
        ));

        assert!(matches!(
            NodeConfig::from_args(&args(&["--request-probability", "1.5"])),
            Err(ConfigError::InvalidProbability(_))
        ));
    }
}
