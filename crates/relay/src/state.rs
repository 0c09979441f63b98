// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Relay state shared by every connection.
//!
//! Holds the broadcast channel used for fanout and a few counters.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

/// Buffered frames per subscriber before a slow peer starts lagging.
const BROADCAST_CAPACITY: usize = 1024;

/// A frame being fanned out, tagged with the peer that sent it.
#[derive(Debug, Clone)]
pub struct Relayed {
    pub from: u64,
    pub frame: String,
}

/// Shared relay state.
#[derive(Clone)]
pub struct RelayState {
    inner: Arc<RelayStateInner>,
}

struct RelayStateInner {
    /// Broadcast channel for fanning frames out to peers.
    broadcast_tx: broadcast::Sender<Relayed>,
    /// Also deliver a frame back to its sender.
    echo: bool,
    next_peer: AtomicU64,
    connected: AtomicUsize,
    relayed: AtomicU64,
}

/// One registered connection. Unregisters itself when dropped.
pub struct Peer {
    pub id: u64,
    pub rx: broadcast::Receiver<Relayed>,
    state: RelayState,
}

impl Drop for Peer {
    fn drop(&mut self) {
        self.state.inner.connected.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RelayState {
    pub fn new(echo: bool) -> Self {
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        RelayState {
            inner: Arc::new(RelayStateInner {
                broadcast_tx,
                echo,
                next_peer: AtomicU64::new(1),
                connected: AtomicUsize::new(0),
                relayed: AtomicU64::new(0),
            }),
        }
    }

    /// Register a new connection and subscribe it to broadcasts.
    pub fn register(&self) -> Peer {
        let id = self.inner.next_peer.fetch_add(1, Ordering::SeqCst);
        self.inner.connected.fetch_add(1, Ordering::SeqCst);
        Peer {
            id,
            rx: self.inner.broadcast_tx.subscribe(),
            state: self.clone(),
        }
    }

    /// Fan a frame out to every subscriber.
    pub fn publish(&self, from: u64, frame: String) {
        self.inner.relayed.fetch_add(1, Ordering::SeqCst);
        // No subscribers is not an error
        let _ = self.inner.broadcast_tx.send(Relayed { from, frame });
    }

    /// Returns true if `relayed` should be delivered to `peer`.
    pub fn should_deliver(&self, relayed: &Relayed, peer: u64) -> bool {
        relayed.from != peer || self.inner.echo
    }

    /// Number of open connections.
    pub fn connected(&self) -> usize {
        self.inner.connected.load(Ordering::SeqCst)
    }

    /// Number of frames published since start.
    pub fn relayed(&self) -> u64 {
        self.inner.relayed.load(Ordering::SeqCst)
    }
}
