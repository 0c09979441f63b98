// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Envelope id generation.

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of the random suffix appended to the timestamp.
const SUFFIX_LEN: usize = 9;

/// Generate an envelope ID from a timestamp.
/// Format: {timestamp_ms}_{suffix} where suffix is 9 random lowercase alphanumerics
pub fn generate_id(timestamp_ms: u64) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{}_{}", timestamp_ms, suffix)
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
