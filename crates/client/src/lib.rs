// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tether - A resilient real-time channel client.
//!
//! This crate keeps a long-lived WebSocket connection to a server and gives
//! the application a fire-and-forget way to talk over it.
//!
//! # Main Components
//!
//! - [`Channel`] - The facade: connect, send, subscribe, inspect
//! - [`ChannelConfig`] - Reconnection, cache and routing options
//! - [`channel`] - Cache, outbound queue, dispatcher and transport building blocks
//! - [`Error`] - Error types for all operations
//!
//! # Usage
//!
//! ```rust,ignore
//! use tether::{event, Channel, ChannelConfig};
//!
//! let channel = Channel::new(ChannelConfig::new("ws://localhost:7891"))?;
//! channel.on(event::RECONNECT_FAILED, |_| eprintln!("server is gone"));
//! channel.on("agent_response", |event| println!("{:?}", event.envelope()));
//!
//! // Callbacks that call back into the channel hold a weak reference.
//! let weak = channel.downgrade();
//! channel.on(event::CONNECTED, move |_| {
//!     if let Some(channel) = weak.upgrade() {
//!         channel.send("hello", serde_json::Value::Null);
//!     }
//! });
//!
//! // Sent right away when connected, queued otherwise.
//! channel.send("ping", serde_json::json!({"n": 1}));
//! channel.connect().await?;
//! ```

mod cli;
mod commands;

pub mod channel;
pub mod config;
pub mod env;
pub mod error;
pub mod logging;

pub use channel::{
    event, CacheStats, Channel, ChannelEvent, ConnectionState, SendOptions, Subscription,
    WeakChannel,
};
pub use cli::{Cli, Command};
pub use config::ChannelConfig;
pub use error::{Error, Result};
pub use tether_core::{CloseFrame, Envelope};

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use clap::CommandFactory;
use clap_complete::generate;

use commands::send::SendArgs;

/// Run a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "tether", &mut std::io::stdout());
            Ok(())
        }
        Command::Config { url } => {
            let config = config::resolve(config_path, url)?;
            print!("{}", config.to_toml()?);
            Ok(())
        }
        Command::Listen { url, types } => {
            let config = load(config_path, url, cli.verbose)?;
            block_on(commands::listen::run(config, types))
        }
        Command::Send {
            kind,
            payload,
            url,
            wait,
            timeout,
            cache,
        } => {
            let payload = commands::send::parse_payload(payload.as_deref())?;
            let config = load(config_path, url, cli.verbose)?;
            let args = SendArgs {
                kind,
                payload,
                wait,
                timeout: Duration::from_secs(timeout),
                cache,
            };
            block_on(commands::send::run(config, args))
        }
    }
}

/// Resolve and validate the config, then set up logging for a networked command.
fn load(path: Option<&Path>, url: Option<String>, verbose: bool) -> Result<ChannelConfig> {
    let config = config::resolve(path, url)?;
    config.validate()?;
    logging::init(verbose || config.enable_logging);
    Ok(config)
}

fn block_on<F: Future<Output = Result<()>>>(future: F) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Io(std::io::Error::other(format!("tokio: {}", e))))?;
    rt.block_on(future)
}
