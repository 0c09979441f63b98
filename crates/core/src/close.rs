// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket close codes and frames.
//!
//! Code `1000` is the only intentional close. Every other code means the
//! connection was lost and the client should try to get it back.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Normal closure, sent by an explicit disconnect.
pub const NORMAL_CLOSURE: u16 = 1000;

/// The remote endpoint is going away (server shutdown, page navigation).
pub const GOING_AWAY: u16 = 1001;

/// Reserved code for a connection that dropped without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Close code and reason reported when a connection ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseFrame {
    pub code: u16,
    pub reason: String,
}

impl CloseFrame {
    /// Creates a close frame.
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        CloseFrame {
            code,
            reason: reason.into(),
        }
    }

    /// The frame an explicit disconnect sends.
    pub fn normal(reason: impl Into<String>) -> Self {
        Self::new(NORMAL_CLOSURE, reason)
    }

    /// The frame reported when the transport failed without a close handshake.
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self::new(ABNORMAL_CLOSURE, reason)
    }

    /// Returns true if this close was requested by the application.
    pub fn is_intentional(&self) -> bool {
        self.code == NORMAL_CLOSURE
    }
}

impl fmt::Display for CloseFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reason.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{} ({})", self.code, self.reason)
        }
    }
}

#[cfg(test)]
#[path = "close_tests.rs"]
mod tests;
