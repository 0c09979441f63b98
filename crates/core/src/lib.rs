// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tether-core: Shared types for the tether channel client and relay.
//!
//! This crate provides the wire envelope, envelope id generation, clock
//! sources and WebSocket close codes used by both the `tether` client and
//! the `tether-relay` server.

pub mod clock;
pub mod close;
pub mod envelope;
pub mod error;
pub mod id;

pub use clock::{ClockSource, ManualClock, SystemClock};
pub use close::{CloseFrame, ABNORMAL_CLOSURE, GOING_AWAY, NORMAL_CLOSURE};
pub use envelope::Envelope;
pub use error::{Error, Result};
