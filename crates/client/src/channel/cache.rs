// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Time-bounded cache for recent envelopes and responses.
//!
//! Expiry is checked lazily on every read, so a stale entry is never
//! returned even if [`TtlCache::sweep`] has not run. Sweeping only reclaims
//! memory. The entry cap keeps the cache bounded when nobody sweeps.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tether_core::ClockSource;
use tracing::debug;

/// A cached value with its insertion time and lifetime.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    data: V,
    /// Insertion time in milliseconds since Unix epoch.
    timestamp: u64,
    /// Lifetime in milliseconds.
    ttl: u64,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: u64) -> bool {
        now.saturating_sub(self.timestamp) > self.ttl
    }
}

/// Size and keys of a cache, as reported to callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    /// Keys in sorted order.
    pub keys: Vec<String>,
}

/// Key-value cache where every entry carries its own TTL.
pub struct TtlCache<V> {
    entries: HashMap<String, CacheEntry<V>>,
    default_ttl: u64,
    max_entries: usize,
    clock: Arc<dyn ClockSource>,
}

impl<V: Clone> TtlCache<V> {
    /// Create a cache. `max_entries` is clamped to at least one.
    pub fn new(default_ttl: Duration, max_entries: usize, clock: Arc<dyn ClockSource>) -> Self {
        TtlCache {
            entries: HashMap::new(),
            default_ttl: duration_ms(default_ttl),
            max_entries: max_entries.max(1),
            clock,
        }
    }

    /// Get a live entry, deleting it instead if it has expired.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let now = self.clock.now_ms();
        let expired = self.entries.get(key)?.is_expired(now);
        if expired {
            self.entries.remove(key);
            return None;
        }
        self.entries.get(key).map(|entry| entry.data.clone())
    }

    /// Insert or overwrite an entry. `ttl` defaults to the cache default.
    pub fn set(&mut self, key: impl Into<String>, data: V, ttl: Option<Duration>) {
        let key = key.into();
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            self.make_room();
        }

        let entry = CacheEntry {
            data,
            timestamp: self.clock.now_ms(),
            ttl: ttl.map_or(self.default_ttl, duration_ms),
        };
        self.entries.insert(key, entry);
    }

    /// Remove an entry, returning its data if it was still live.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        let now = self.clock.now_ms();
        self.entries
            .remove(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.data)
    }

    /// Delete every expired entry. Returns how many were removed.
    pub fn sweep(&mut self) -> usize {
        let now = self.clock.now_ms();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored entries, including expired ones not yet reclaimed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len(),
            keys: self.keys(),
        }
    }

    /// Free one slot: drop expired entries first, then the oldest live one.
    fn make_room(&mut self) {
        let swept = self.sweep();
        if swept > 0 || self.entries.len() < self.max_entries {
            return;
        }

        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.timestamp)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            debug!(key = %key, max_entries = self.max_entries, "cache full, evicting oldest entry");
            self.entries.remove(&key);
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
