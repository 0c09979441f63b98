// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use serde_json::Value;
use tether_core::Envelope;
use tokio::sync::mpsc;

use super::{print_envelope, print_line};
use crate::channel::{Channel, ChannelEvent, SendOptions};
use crate::config::ChannelConfig;
use crate::error::{Error, Result};

/// Arguments of `tether send`.
#[derive(Debug, Clone)]
pub struct SendArgs {
    pub kind: String,
    pub payload: Value,
    /// Envelope type to wait for after sending.
    pub wait: Option<String>,
    pub timeout: Duration,
    pub cache: bool,
}

/// Parse the payload argument. A missing payload is `null`.
pub fn parse_payload(raw: Option<&str>) -> Result<Value> {
    match raw {
        None => Ok(Value::Null),
        Some(raw) => Ok(serde_json::from_str(raw)?),
    }
}

/// Connect, send one envelope, and optionally print the first reply of the
/// requested type.
pub async fn run(config: ChannelConfig, args: SendArgs) -> Result<()> {
    let channel = Channel::new(config)?;
    let mut replies = args.wait.as_deref().map(|kind| channel.subscribe(kind));

    channel.connect().await?;
    let options = SendOptions {
        cache: args.cache,
        ttl: None,
    };
    let id = channel.send_with(&args.kind, args.payload, options);

    let (Some(kind), Some(replies)) = (args.wait, replies.as_mut()) else {
        channel.close().await;
        return print_line(&id);
    };

    let reply = tokio::time::timeout(args.timeout, first_envelope(replies)).await;
    channel.close().await;

    match reply {
        Ok(Some(envelope)) => print_envelope(&envelope),
        Ok(None) => Err(Error::ConnectionCancelled),
        Err(_) => Err(Error::Timeout {
            kind,
            secs: args.timeout.as_secs(),
        }),
    }
}

async fn first_envelope(rx: &mut mpsc::UnboundedReceiver<ChannelEvent>) -> Option<Envelope> {
    while let Some(event) = rx.recv().await {
        if let ChannelEvent::Message(envelope) = event {
            return Some(envelope);
        }
    }
    None
}

#[cfg(test)]
#[path = "send_tests.rs"]
mod tests;
