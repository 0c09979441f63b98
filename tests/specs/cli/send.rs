// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! `tether send` argument handling and failures that need no server.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use yare::parameterized;

fn tether(home: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("tether");
    cmd.env_remove("TETHER_URL")
        .env_remove("TETHER_CONFIG")
        .env_remove("RUST_LOG")
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"));
    cmd
}

/// A ws:// URL on a port nothing listens on.
fn closed_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("ws://127.0.0.1:{}", port)
}

#[test]
fn send_requires_type() {
    let home = TempDir::new().unwrap();
    tether(&home).arg("send").assert().failure();
}

#[parameterized(
    bare_word = { "hello" },
    unclosed_object = { "{\"a\":" },
    trailing_comma = { "[1,]" },
)]
fn invalid_payload_fails(payload: &str) {
    let home = TempDir::new().unwrap();
    tether(&home)
        .args(["send", "ping", payload, "--url", "ws://127.0.0.1:1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("json error"));
}

#[test]
fn missing_url_fails_with_hint() {
    let home = TempDir::new().unwrap();
    tether(&home)
        .args(["send", "ping"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("url must not be empty"))
        .stderr(predicate::str::contains("hint"));
}

#[parameterized(
    http = { "http://localhost:7891" },
    bare = { "localhost:7891" },
)]
fn non_websocket_url_fails(url: &str) {
    let home = TempDir::new().unwrap();
    tether(&home)
        .args(["send", "ping", "--url", url])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must start with ws:// or wss://"));
}

#[test]
fn unreachable_server_fails() {
    let home = TempDir::new().unwrap();
    tether(&home)
        .args(["send", "ping", "{}", "--url", &closed_url()])
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("transport error"));
}

#[test]
fn listen_unreachable_server_fails() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("channel.toml");
    std::fs::write(
        &path,
        format!("url = \"{}\"\nreconnect_attempts = 0\n", closed_url()),
    )
    .unwrap();

    tether(&home)
        .arg("-c")
        .arg(&path)
        .arg("listen")
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .failure()
        .stderr(predicate::str::contains("reconnection failed after 0 attempts"));
}
