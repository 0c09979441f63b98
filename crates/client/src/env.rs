// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.
//!
//! All runtime environment variables read by the CLI are defined here
//! with typed accessor functions.

use std::path::PathBuf;

/// Environment variable names.
pub mod vars {
    pub const TETHER_URL: &str = "TETHER_URL";
    pub const TETHER_CONFIG: &str = "TETHER_CONFIG";
}

/// Returns the value of `TETHER_URL` if set and non-empty.
pub fn url() -> Option<String> {
    std::env::var(vars::TETHER_URL)
        .ok()
        .filter(|s| !s.is_empty())
}

/// Returns the value of `TETHER_CONFIG` if set.
pub fn config_path() -> Option<PathBuf> {
    std::env::var(vars::TETHER_CONFIG).ok().map(PathBuf::from)
}
