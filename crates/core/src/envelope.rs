// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The wire unit exchanged over a channel.
//!
//! An envelope is serialized as a single JSON text frame:
//!
//! ```json
//! {"type":"ping","payload":{"n":1},"timestamp":1700000000000,"id":"1700000000000_k3j9x0a1b"}
//! ```
//!
//! The `type` drives both dispatch routing and cache classification on the
//! receiving side. The payload is never interpreted by the channel.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clock::ClockSource;
use crate::error::{Error, Result};
use crate::id::generate_id;

/// Prefix of the cache key under which a sent envelope is memoized.
pub const CACHE_KEY_PREFIX: &str = "msg_";

/// A typed message with a producer-assigned timestamp and id.
///
/// Fields are private so the id cannot change once assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
    timestamp: u64,
    id: String,
}

impl Envelope {
    /// Creates an envelope stamped with the clock's current time and a fresh id.
    pub fn new(kind: impl Into<String>, payload: Value, clock: &dyn ClockSource) -> Self {
        let timestamp = clock.now_ms();
        Envelope {
            kind: kind.into(),
            payload,
            timestamp,
            id: generate_id(timestamp),
        }
    }

    /// Creates an envelope from already-assigned parts.
    pub fn from_parts(
        kind: impl Into<String>,
        payload: Value,
        timestamp: u64,
        id: impl Into<String>,
    ) -> Result<Self> {
        let envelope = Envelope {
            kind: kind.into(),
            payload,
            timestamp,
            id: id.into(),
        };
        envelope.validate()?;
        Ok(envelope)
    }

    /// The envelope type.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Producer send time in milliseconds since Unix epoch.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Consumes the envelope, returning its payload.
    pub fn into_payload(self) -> Value {
        self.payload
    }

    /// Key under which this envelope is cached when the sender asks for it.
    pub fn cache_key(&self) -> String {
        format!("{}{}", CACHE_KEY_PREFIX, self.id)
    }

    /// The envelope as a JSON value, as stored in the cache.
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "type": self.kind,
            "payload": self.payload,
            "timestamp": self.timestamp,
            "id": self.id,
        })
    }

    /// Serializes the envelope to a JSON text frame.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses and validates a JSON text frame.
    pub fn from_json(s: &str) -> Result<Self> {
        let envelope: Envelope = serde_json::from_str(s)?;
        envelope.validate()?;
        Ok(envelope)
    }

    fn validate(&self) -> Result<()> {
        if self.kind.is_empty() {
            return Err(Error::InvalidEnvelope("type must not be empty".to_string()));
        }
        if self.id.is_empty() {
            return Err(Error::InvalidEnvelope("id must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
