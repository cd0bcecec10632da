// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pairlog_core::LogPayload;
use pairlog_engine::kv::set_op;
use tempfile::TempDir;

fn config_in(dir: &TempDir) -> Config {
    Config {
        listen: "127.0.0.1:0".parse().unwrap(),
        data_dir: dir.path().to_path_buf(),
        ..Config::default()
    }
}

async fn write(daemon: &Daemon, key: &str, value: &str) -> u64 {
    daemon
        .orchestrator()
        .execute(LogPayload::new(0, set_op(key, value)), true)
        .await
        .unwrap()
}

#[tokio::test]
async fn startup_creates_layout_and_pid_file() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);

    let daemon = startup(&config).await.unwrap();

    assert!(config.log_file().exists());
    assert!(config.object_root().join("pairlog").join("LOG").is_dir());
    let pid = std::fs::read_to_string(config.lock_path()).unwrap();
    assert_eq!(pid.trim(), std::process::id().to_string());
    assert_ne!(daemon.local_addr().unwrap().port(), 0);
}

#[tokio::test]
async fn second_daemon_on_same_data_dir_is_refused() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let _first = startup(&config).await.unwrap();

    let err = startup(&config).await.err().unwrap();

    assert!(matches!(err, LifecycleError::LockFailed(_)));
    // The running daemon's pid file is left alone
    assert!(config.lock_path().exists());
}

#[tokio::test]
async fn graceful_shutdown_flushes_and_releases_lock() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let daemon = startup(&config).await.unwrap();
    write(&daemon, "a", "1").await;
    let overlay = Arc::clone(daemon.orchestrator().log().service());

    daemon.run(async {}).await.unwrap();

    assert_eq!(overlay.flushed_version(), 1);
    assert!(!config.lock_path().exists());
    // Lock is free again
    drop(startup(&config).await.unwrap());
}

#[tokio::test]
async fn restart_recovers_state_and_takes_initial_snapshot() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let daemon = startup(&config).await.unwrap();
    write(&daemon, "a", "1").await;
    write(&daemon, "b", "2").await;
    daemon.run(async {}).await.unwrap();

    let daemon = startup(&config).await.unwrap();

    let overlay = daemon.orchestrator().log().service();
    assert_eq!(overlay.current_version(), 2);
    assert_eq!(overlay.snapshot_version(), 2);
    assert_eq!(overlay.inner().get("b"), Some("2".to_string()));
    assert_eq!(write(&daemon, "c", "3").await, 3);
}

#[tokio::test]
async fn lost_objects_are_rebuilt_from_commit_log() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let daemon = startup(&config).await.unwrap();
    write(&daemon, "a", "1").await;
    daemon.run(async {}).await.unwrap();
    std::fs::remove_dir_all(config.object_root()).unwrap();

    let daemon = startup(&config).await.unwrap();

    let overlay = daemon.orchestrator().log().service();
    assert_eq!(overlay.inner().get("a"), Some("1".to_string()));
    assert_eq!(overlay.current_version(), 1);
}

#[tokio::test]
async fn fatal_signal_stops_daemon_with_error() {
    let dir = TempDir::new().unwrap();
    let daemon = startup(&config_in(&dir)).await.unwrap();
    daemon.fatal_tx.send_replace(true);

    let err = daemon.run(std::future::pending()).await.unwrap_err();

    assert!(matches!(err, LifecycleError::Fatal));
}

#[tokio::test]
async fn unreachable_peer_does_not_block_startup() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        peer: Some("http://127.0.0.1:9/log".to_string()),
        ..config_in(&dir)
    };

    let daemon = startup(&config).await.unwrap();

    assert!(daemon.orchestrator().has_peer());
    assert!(!daemon.orchestrator().peer_in_sync());
}
