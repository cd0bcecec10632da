// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI integration tests against an in-process daemon

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(deprecated)]

mod common;

use assert_cmd::Command;
use common::TestDaemon;
use predicates::prelude::*;

const SET_A: &str = r#"{"key":"a","value":"1"}"#;
const SET_B: &str = r#"{"key":"b","value":"2"}"#;

#[test]
fn help_lists_commands() {
    Command::cargo_bin("pairlog")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("do"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("log"));
}

#[test]
fn do_prints_assigned_version() {
    let daemon = TestDaemon::start();

    daemon
        .cli()
        .args(["do", "set", SET_A])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""version": 1"#));
    daemon
        .cli()
        .args(["do", "set", SET_B])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""version": 2"#));
}

#[test]
fn log_committed_and_record_show_payloads() {
    let daemon = TestDaemon::start();
    daemon.cli().args(["do", "set", SET_A]).assert().success();
    daemon.cli().args(["do", "set", SET_B]).assert().success();

    daemon
        .cli()
        .args(["--output", "text", "log", "committed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("version: 2"))
        .stdout(predicate::str::contains(SET_B));
    daemon
        .cli()
        .args(["--output", "text", "log", "record", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains(SET_A));
}

#[test]
fn explicit_wrong_version_fails_with_server_message() {
    let daemon = TestDaemon::start();

    daemon
        .cli()
        .args(["do", "set", SET_A, "--version", "4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("preparing invalid version"));
}

#[test]
fn empty_log_has_nothing_prepared() {
    let daemon = TestDaemon::start();

    daemon
        .cli()
        .args(["log", "prepared"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("server returned 404"));
}

#[test]
fn status_reports_committed_version() {
    let daemon = TestDaemon::start();
    daemon.cli().args(["do", "set", SET_A]).assert().success();

    daemon
        .cli()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""committed": 1"#))
        .stdout(predicate::str::contains(r#""peer_configured": false"#));
}

#[test]
fn compact_reports_ok() {
    let daemon = TestDaemon::start();

    daemon
        .cli()
        .args(["--output", "text", "log", "compact", "--keep", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ok"));
}

#[test]
fn token_is_sent_when_given() {
    let daemon = TestDaemon::start_with(Some("sekrit"));

    daemon
        .cli()
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid token"));
    daemon
        .cli()
        .args(["--token", "sekrit", "status"])
        .assert()
        .success();
}

#[test]
fn unreachable_server_is_explained() {
    Command::cargo_bin("pairlog")
        .unwrap()
        .env_remove("PAIRLOG_SERVER")
        .args(["--server", "http://127.0.0.1:9", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot reach http://127.0.0.1:9"));
}
