// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for channel module tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tether_core::{ClockSource, Envelope, ManualClock, SystemClock};
use tokio::sync::mpsc;

use super::client::Channel;
use super::events::ChannelEvent;
use super::transport_tests::MockNetwork;
use crate::config::ChannelConfig;

/// How long a test waits for something before giving up.
const WAIT: Duration = Duration::from_secs(120);

/// Config with a short retry schedule and no background sweep.
pub fn test_config() -> ChannelConfig {
    ChannelConfig {
        reconnect_attempts: 3,
        reconnect_interval_ms: 1000,
        cleanup_interval_ms: 0,
        ..ChannelConfig::new("ws://mock.test")
    }
}

/// A channel on the mock network with the system clock.
pub fn make_channel(network: &MockNetwork, config: ChannelConfig) -> Channel {
    Channel::with_transport(config, network.factory(), Arc::new(SystemClock))
}

/// A channel on the mock network driven by a manual clock.
pub fn make_channel_with_clock(
    network: &MockNetwork,
    config: ChannelConfig,
    clock: &ManualClock,
) -> Channel {
    let clock: Arc<dyn ClockSource> = Arc::new(clock.clone());
    Channel::with_transport(config, network.factory(), clock)
}

/// An inbound envelope as a server would send it.
pub fn server_envelope(kind: &str, payload: Value) -> Envelope {
    Envelope::new(kind, payload, &SystemClock)
}

/// Wait for the next event on a subscription.
pub async fn next_event(rx: &mut mpsc::UnboundedReceiver<ChannelEvent>) -> ChannelEvent {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("subscription closed")
}

/// Poll until `condition` holds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while !condition() {
        if tokio::time::Instant::now() >= deadline {
            panic!("condition not met in time");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
