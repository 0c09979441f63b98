// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use tracing::{info, warn};

use super::print_envelope;
use crate::channel::{event, Channel, ChannelEvent};
use crate::config::ChannelConfig;
use crate::error::{Error, Result};

/// Returns true if an envelope of `kind` passes the `--type` filter.
pub fn matches_filter(types: &[String], kind: &str) -> bool {
    types.is_empty() || types.iter().any(|t| t == kind)
}

/// Print inbound envelopes until Ctrl-C or until reconnection gives up.
pub async fn run(config: ChannelConfig, types: Vec<String>) -> Result<()> {
    let channel = Channel::new(config)?;
    let mut messages = channel.subscribe(event::MESSAGE);
    let mut failed = channel.subscribe(event::RECONNECT_FAILED);

    if let Err(e) = channel.connect().await {
        warn!(error = %e, "initial connection failed, retrying in the background");
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let result = loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("interrupted");
                break Ok(());
            }
            event = failed.recv() => {
                let attempts = match event {
                    Some(ChannelEvent::ReconnectFailed { attempts }) => attempts,
                    _ => channel.config().reconnect_attempts,
                };
                break Err(Error::ReconnectFailed(attempts));
            }
            event = messages.recv() => match event {
                Some(ChannelEvent::Message(envelope)) => {
                    if matches_filter(&types, envelope.kind()) {
                        if let Err(e) = print_envelope(&envelope) {
                            break Err(e);
                        }
                    }
                }
                Some(_) => {}
                None => break Ok(()),
            },
        }
    };

    channel.close().await;
    result
}

#[cfg(test)]
#[path = "listen_tests.rs"]
mod tests;
