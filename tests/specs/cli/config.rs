// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! `tether config` resolution: flags, environment and config files.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A command isolated from the caller's environment and per-user config.
fn tether(home: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("tether");
    cmd.env_remove("TETHER_URL")
        .env_remove("TETHER_CONFIG")
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"));
    cmd
}

#[test]
fn defaults_are_printed() {
    let home = TempDir::new().unwrap();
    tether(&home)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("reconnect_attempts = 5"))
        .stdout(predicate::str::contains("reconnect_interval_ms = 3000"))
        .stdout(predicate::str::contains("cache_ttl_ms = 300000"))
        .stdout(predicate::str::contains("agent_response"));
}

#[test]
fn url_flag_overrides() {
    let home = TempDir::new().unwrap();
    tether(&home)
        .args(["config", "--url", "ws://flag.test:1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("url = \"ws://flag.test:1\""));
}

#[test]
fn url_from_environment() {
    let home = TempDir::new().unwrap();
    tether(&home)
        .env("TETHER_URL", "ws://env.test:2")
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("url = \"ws://env.test:2\""));
}

#[test]
fn flag_beats_environment() {
    let home = TempDir::new().unwrap();
    tether(&home)
        .env("TETHER_URL", "ws://env.test:2")
        .args(["config", "--url", "ws://flag.test:1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ws://flag.test:1"))
        .stdout(predicate::str::contains("env.test").not());
}

#[test]
fn config_file_is_loaded() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("channel.toml");
    std::fs::write(
        &path,
        "url = \"ws://file.test:3\"\nreconnect_attempts = 9\n",
    )
    .unwrap();

    tether(&home)
        .arg("-c")
        .arg(&path)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("ws://file.test:3"))
        .stdout(predicate::str::contains("reconnect_attempts = 9"))
        .stdout(predicate::str::contains("reconnect_interval_ms = 3000"));
}

#[test]
fn config_file_from_environment() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("channel.toml");
    std::fs::write(&path, "url = \"ws://file.test:4\"\n").unwrap();

    tether(&home)
        .env("TETHER_CONFIG", &path)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("ws://file.test:4"));
}

#[test]
fn missing_config_file_fails() {
    let home = TempDir::new().unwrap();
    tether(&home)
        .args(["-c", "/nonexistent/tether.toml", "config"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn malformed_config_file_fails() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("broken.toml");
    std::fs::write(&path, "url = [not toml").unwrap();

    tether(&home)
        .arg("--config")
        .arg(&path)
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("config parse error"));
}
