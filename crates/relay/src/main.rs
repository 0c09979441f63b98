// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tether-relay: WebSocket relay server for tether channels.
//!
//! Answers `ping` envelopes with `pong` and fans every other envelope out to
//! the other connected clients. Holds no state beyond the open connections.

mod server;
mod state;

use clap::Parser;
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// tether-relay: WebSocket relay for tether channels
#[derive(Parser, Debug)]
#[command(name = "tether-relay")]
#[command(about = "WebSocket relay server for tether channels")]
struct Args {
    /// Address to bind the server to
    #[arg(short, long, default_value = "127.0.0.1:7891")]
    bind: SocketAddr,

    /// Also send every relayed envelope back to its sender
    #[arg(long)]
    echo: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn setup_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();
    setup_logging(args.verbose);

    info!("Starting tether-relay");
    info!("  Bind address: {}", args.bind);
    info!("  Echo: {}", args.echo);

    let state = state::RelayState::new(args.echo);

    tokio::select! {
        result = server::run(args.bind, state) => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }

    Ok(())
}
