// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Resilient real-time channel.
//!
//! Keeps a long-lived WebSocket connection to a server, buffers outbound
//! envelopes while disconnected, memoizes inbound envelopes and fans
//! everything out to subscribers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Channel   │────►│ Connection  │────►│  Transport  │
//! │  (facade)   │     │   (task)    │◄────│   (trait)   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!    │       │               │
//!    ▼       ▼               ▼
//! ┌───────┐ ┌───────┐ ┌─────────────┐
//! │ Queue │ │ Cache │ │ Dispatcher  │
//! └───────┘ └───────┘ └─────────────┘
//! ```
//!
//! # Features
//!
//! - Outbound queue replayed in order on every (re)connect
//! - Fixed-interval reconnection with a bounded attempt count
//! - TTL cache with lazy expiry, periodic sweep and an entry cap
//! - Typed lifecycle events plus per-type message events
//! - Injectable transport and clock for testing

mod cache;
mod client;
mod connection;
mod dispatch;
mod events;
mod queue;
mod transport;

pub use cache::{CacheStats, TtlCache};
pub use client::{Channel, ConnectionState, SendOptions, WeakChannel};
pub use dispatch::{Callback, Dispatcher, Subscription};
pub use events::ChannelEvent;
pub use queue::OutboundQueue;
pub use transport::{
    Transport, TransportError, TransportEvent, TransportFactory, TransportFuture,
    TransportResult, WebSocketTransport,
};

/// Event names emitted by a channel.
///
/// Inbound envelopes are also emitted under their own `type`.
pub mod event {
    pub use super::events::{
        CONNECTED, DISCONNECTED, ERROR, MESSAGE, RECONNECTED, RECONNECT_FAILED,
    };
}

#[cfg(test)]
mod test_helpers;


#[cfg(test)]
mod client_tests;
