// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

const QUICKSTART_HELP: &str = "\
Get started:
  tether listen --url ws://localhost:7891        Print every inbound envelope
  tether send ping '{\"n\":1}' --wait pong         Send and wait for the reply
  tether config                                   Show the resolved configuration";

#[derive(Parser)]
#[command(name = "tether")]
#[command(version)]
#[command(about = "A resilient real-time channel client")]
#[command(
    long_about = "A resilient real-time channel client.\n\n\
    Keeps a WebSocket connection alive, queues messages while offline and\n\
    replays them in order on reconnect."
)]
#[command(after_help = QUICKSTART_HELP)]
pub struct Cli {
    /// Config file (default: $TETHER_CONFIG, then the per-user config file)
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Log lifecycle and traffic to stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Connect and print inbound envelopes as JSON lines
    #[command(after_help = "Examples:\n  \
        tether listen --url ws://localhost:7891          Print every envelope\n  \
        tether listen -t agent_response -t system_status  Only these types")]
    Listen {
        /// Server URL (overrides the config file and $TETHER_URL)
        #[arg(long)]
        url: Option<String>,

        /// Only print envelopes of this type (repeatable)
        #[arg(long = "type", short = 't', value_name = "TYPE")]
        types: Vec<String>,
    },

    /// Send one envelope, optionally waiting for a reply
    #[command(after_help = "Examples:\n  \
        tether send ping                           Send a ping with a null payload\n  \
        tether send ping '{\"n\":1}' --wait pong     Print the first pong\n  \
        tether send note '\"hi\"' --cache -v         Cache locally and log traffic")]
    Send {
        /// Envelope type
        kind: String,

        /// Payload as JSON (default: null)
        payload: Option<String>,

        /// Server URL (overrides the config file and $TETHER_URL)
        #[arg(long)]
        url: Option<String>,

        /// Wait for one envelope of this type and print it
        #[arg(long, value_name = "TYPE")]
        wait: Option<String>,

        /// Seconds to wait for the reply
        #[arg(long, default_value_t = 10)]
        timeout: u64,

        /// Also memoize the sent envelope in the local cache
        #[arg(long)]
        cache: bool,
    },

    /// Print the resolved configuration as TOML
    Config {
        /// Server URL (overrides the config file and $TETHER_URL)
        #[arg(long)]
        url: Option<String>,
    },

    /// Generate shell completions
    #[command(after_help = "Examples:\n  \
        tether completion bash > ~/.local/share/bash-completion/completions/tether\n  \
        tether completion zsh > ~/.zfunc/_tether")]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
