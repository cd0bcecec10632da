// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test utilities for CLI integration tests.

#![allow(dead_code)]

use assert_cmd::Command;
use pairlog_daemon::{startup, Config};
use std::thread::JoinHandle;
use tempfile::TempDir;
use tokio::sync::oneshot;

/// A pairlogd instance served from its own thread and runtime, so tests can
/// drive the CLI binary synchronously.
pub struct TestDaemon {
    pub url: String,
    _dir: TempDir,
    stop: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl TestDaemon {
    pub fn start() -> Self {
        Self::start_with(None)
    }

    pub fn start_with(token: Option<&str>) -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let config = Config {
            listen: "127.0.0.1:0".parse().unwrap(),
            data_dir: dir.path().to_path_buf(),
            token: token.map(str::to_string),
            ..Config::default()
        };

        let (addr_tx, addr_rx) = std::sync::mpsc::channel();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let thread = std::thread::spawn(move || {
            let rt = tokio::runtime::Runtime::new().expect("Failed to build runtime");
            rt.block_on(async move {
                let daemon = startup(&config).await.expect("Failed to start daemon");
                addr_tx
                    .send(daemon.local_addr().expect("no local address"))
                    .expect("test went away");
                daemon
                    .run(async {
                        let _ = stop_rx.await;
                    })
                    .await
                    .expect("daemon failed");
            });
        });
        let addr = addr_rx.recv().expect("daemon did not start");

        Self {
            url: format!("http://{}", addr),
            _dir: dir,
            stop: Some(stop_tx),
            thread: Some(thread),
        }
    }

    /// The CLI pointed at this daemon
    pub fn cli(&self) -> Command {
        let mut cmd = Command::cargo_bin("pairlog").unwrap();
        cmd.env_remove("PAIRLOG_TOKEN")
            .env_remove("PAIRLOG_SERVER")
            .args(["--server", &self.url]);
        cmd
    }
}

impl Drop for TestDaemon {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
