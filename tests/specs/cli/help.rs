// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Help, version and completion output.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use yare::parameterized;

fn tether() -> Command {
    cargo_bin_cmd!("tether")
}

#[test]
fn help_lists_commands() {
    tether()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("listen"))
        .stdout(predicate::str::contains("send"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("completion"));
}

#[test]
fn help_shows_quickstart() {
    tether()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Get started:"));
}

#[test]
fn no_arguments_is_an_error() {
    tether()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn version_flag_prints_version() {
    tether()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[parameterized(
    listen = { "listen" },
    send = { "send" },
    config = { "config" },
    completion = { "completion" },
)]
fn command_supports_help_flag(cmd: &str) {
    tether()
        .args([cmd, "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn send_help_shows_options() {
    tether()
        .args(["send", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--wait"))
        .stdout(predicate::str::contains("--timeout"))
        .stdout(predicate::str::contains("--cache"));
}

#[test]
fn unknown_command_fails() {
    tether()
        .arg("nonexistent")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[parameterized(
    bash = { "bash" },
    zsh = { "zsh" },
    fish = { "fish" },
)]
fn completion_generates_script(shell: &str) {
    let output = tether().args(["completion", shell]).output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("tether"));
    assert!(stdout.contains("listen"));
}

#[test]
fn completion_invalid_shell_fails() {
    tether().args(["completion", "nosh"]).assert().failure();
}
