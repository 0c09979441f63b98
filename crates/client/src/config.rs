// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Channel configuration.
//!
//! Configuration is plain TOML, for example:
//!
//! ```toml
//! url = "ws://localhost:7891"
//! reconnect_attempts = 5
//! reconnect_interval_ms = 3000
//! cache_ttl_ms = 300000
//! cacheable_types = ["agent_response", "system_status"]
//! ```
//!
//! Every key except `url` has a default.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::env;
use crate::error::{Error, Result};

const CONFIG_DIR_NAME: &str = "tether";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Options for one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Server URL (`ws://...` or `wss://...`).
    #[serde(default)]
    pub url: String,
    /// Reconnection attempts after an unintentional close before giving up (default: 5).
    #[serde(default = "default_reconnect_attempts")]
    pub reconnect_attempts: u32,
    /// Fixed delay between reconnection attempts in milliseconds (default: 3000).
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
    /// Default cache TTL in milliseconds (default: 300000).
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,
    /// Interval of the background cache sweep in milliseconds (default: 60000). 0 = disabled.
    #[serde(default = "default_cleanup_interval_ms")]
    pub cleanup_interval_ms: u64,
    /// Maximum number of cache entries (default: 1000).
    #[serde(default = "default_max_cache_entries")]
    pub max_cache_entries: usize,
    /// Inbound envelope types whose payload is cached under the envelope id.
    #[serde(default = "default_cacheable_types")]
    pub cacheable_types: Vec<String>,
    /// Turn on debug logging in the CLI.
    #[serde(default)]
    pub enable_logging: bool,
}

fn default_reconnect_attempts() -> u32 {
    5
}

fn default_reconnect_interval_ms() -> u64 {
    3000
}

fn default_cache_ttl_ms() -> u64 {
    300_000
}

fn default_cleanup_interval_ms() -> u64 {
    60_000
}

fn default_max_cache_entries() -> usize {
    1000
}

fn default_cacheable_types() -> Vec<String> {
    vec!["agent_response".to_string(), "system_status".to_string()]
}

impl Default for ChannelConfig {
    fn default() -> Self {
        ChannelConfig {
            url: String::new(),
            reconnect_attempts: default_reconnect_attempts(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
            cache_ttl_ms: default_cache_ttl_ms(),
            cleanup_interval_ms: default_cleanup_interval_ms(),
            max_cache_entries: default_max_cache_entries(),
            cacheable_types: default_cacheable_types(),
            enable_logging: false,
        }
    }
}

impl ChannelConfig {
    /// Creates a config for the given URL with every other option at its default.
    pub fn new(url: impl Into<String>) -> Self {
        ChannelConfig {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Loads a config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: ChannelConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Writes the config to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Renders the config as TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks the options a WebSocket channel depends on.
    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(Error::Config(
                "url must not be empty\n  hint: pass --url or set TETHER_URL".to_string(),
            ));
        }
        if !self.url.starts_with("ws://") && !self.url.starts_with("wss://") {
            return Err(Error::Config(format!(
                "invalid url '{}': must start with ws:// or wss://",
                self.url
            )));
        }
        if self.max_cache_entries == 0 {
            return Err(Error::Config(
                "max_cache_entries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    /// The sweep interval, or `None` when periodic sweeping is disabled.
    pub fn cleanup_interval(&self) -> Option<Duration> {
        (self.cleanup_interval_ms > 0).then(|| Duration::from_millis(self.cleanup_interval_ms))
    }

    /// Returns true if inbound envelopes of this type are cached.
    pub fn is_cacheable(&self, kind: &str) -> bool {
        self.cacheable_types.iter().any(|t| t == kind)
    }
}

/// Returns the per-user config file location (`<config_dir>/tether/config.toml`).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Resolves the configuration the CLI runs with.
///
/// Resolution order for the file:
/// 1. `explicit` (the `--config` flag); it must exist
/// 2. `TETHER_CONFIG`; it must exist
/// 3. The per-user config file, if present
/// 4. Built-in defaults
///
/// The URL override (the `--url` flag, then `TETHER_URL`) replaces the file's `url`.
pub fn resolve(explicit: Option<&Path>, url: Option<String>) -> Result<ChannelConfig> {
    let mut config = match explicit.map(Path::to_path_buf).or_else(env::config_path) {
        Some(path) => ChannelConfig::load(&path)?,
        None => match default_config_path().filter(|p| p.exists()) {
            Some(path) => ChannelConfig::load(&path)?,
            None => ChannelConfig::default(),
        },
    };

    if let Some(url) = url.or_else(env::url) {
        config.url = url;
    }

    Ok(config)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
