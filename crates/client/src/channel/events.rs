// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Events delivered to channel subscribers.

use tether_core::{CloseFrame, Envelope};

pub const MESSAGE: &str = "message";
pub const CONNECTED: &str = "connected";
pub const DISCONNECTED: &str = "disconnected";
pub const RECONNECTED: &str = "reconnected";
pub const RECONNECT_FAILED: &str = "reconnect_failed";
pub const ERROR: &str = "error";

/// Something a subscriber can be told about.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// The transport opened.
    Connected,
    /// The transport opened again after `attempts` reconnection attempts.
    Reconnected { attempts: u32 },
    /// The transport closed. Code `1000` means the close was intentional.
    Disconnected(CloseFrame),
    /// Reconnection gave up after `attempts` attempts.
    ReconnectFailed { attempts: u32 },
    /// A transport-level error. Never fatal on its own.
    Error { message: String },
    /// An inbound envelope.
    Message(Envelope),
}

impl ChannelEvent {
    /// The lifecycle event name, or `"message"` for inbound envelopes.
    pub fn name(&self) -> &'static str {
        match self {
            ChannelEvent::Connected => CONNECTED,
            ChannelEvent::Reconnected { .. } => RECONNECTED,
            ChannelEvent::Disconnected(_) => DISCONNECTED,
            ChannelEvent::ReconnectFailed { .. } => RECONNECT_FAILED,
            ChannelEvent::Error { .. } => ERROR,
            ChannelEvent::Message(_) => MESSAGE,
        }
    }

    /// The inbound envelope, if this is a message event.
    pub fn envelope(&self) -> Option<&Envelope> {
        match self {
            ChannelEvent::Message(envelope) => Some(envelope),
            _ => None,
        }
    }
}
