//! Token ring node binary
//!
//! Parses arguments, installs the tracing subscriber, and runs one peer
//! until it fails or receives Ctrl-C.

use std::sync::Mutex;

use clap::Parser;
use tokenring_node::{Args, Node, NodeConfig, NodeError};
use tracing_subscriber::EnvFilter;

fn init_tracing(args: &Args) -> Result<(), NodeError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    match &args.log_file {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        },
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
        },
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_tracing(&args)?;

    let config = NodeConfig::from_args(&args)?;
    let node = Node::bind(config).await?;

    tokio::select! {
        result = node.run() => {
            if let Err(error) = &result {
                tracing::error!(%error, "node stopped");
            }
            result?;
        },
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("shutting down");
        },
    }

    Ok(())
}
