// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound queue for envelopes sent while disconnected.
//!
//! The queue is in-memory only. On connect, queued envelopes are flushed to
//! the server in order: the connection peeks the front, transmits it, and
//! pops it only once the transport accepted it, so a flush interrupted by a
//! dropped connection resumes exactly where it stopped.

use std::collections::VecDeque;

use tether_core::Envelope;

/// FIFO buffer of envelopes awaiting transmission.
#[derive(Debug, Default)]
pub struct OutboundQueue {
    items: VecDeque<Envelope>,
}

impl OutboundQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an envelope to the back.
    pub fn push(&mut self, envelope: Envelope) {
        self.items.push_back(envelope);
    }

    /// The next envelope to flush, without removing it.
    pub fn front(&self) -> Option<&Envelope> {
        self.items.front()
    }

    /// Remove the front envelope after it was transmitted.
    pub fn pop_front(&mut self) -> Option<Envelope> {
        self.items.pop_front()
    }

    /// Put envelopes back at the front, keeping their relative order.
    ///
    /// Used for envelopes that were handed to a live connection but never
    /// made it onto the wire.
    pub fn requeue_front(&mut self, envelopes: Vec<Envelope>) {
        for envelope in envelopes.into_iter().rev() {
            self.items.push_front(envelope);
        }
    }

    /// Drop every queued envelope. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.items.len();
        self.items.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Copy of the queued envelopes, front first.
    pub fn snapshot(&self) -> Vec<Envelope> {
        self.items.iter().cloned().collect()
    }
}
