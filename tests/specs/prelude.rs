// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness: in-process daemons talking real HTTP.

#![allow(dead_code)]

pub use pairlog_core::{LogPayload, Operation};
pub use pairlog_engine::kv::{delete_op, set_op};
pub use serde_json::Value;

use pairlog_adapters::{ApiClient, ClientConfig, ClientError};
use pairlog_daemon::{startup, Config, LifecycleError, StatusReport};
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// One replica: its data directory survives restarts
pub struct Node {
    dir: TempDir,
    pub addr: SocketAddr,
    peer: Option<String>,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<Result<(), LifecycleError>>>,
    pub client: ApiClient,
}

fn config(dir: &TempDir, listen: SocketAddr, peer: Option<String>) -> Config {
    Config {
        listen,
        data_dir: dir.path().to_path_buf(),
        peer,
        flush_interval: Duration::from_millis(50),
        snapshot_interval: Duration::from_secs(3600),
        repair_interval: Duration::from_millis(100),
        ..Config::default()
    }
}

impl Node {
    /// Start a replica with no peer
    pub async fn start() -> Node {
        Self::start_with_peer(None).await
    }

    /// Start a replica replicating to `peer`
    pub async fn start_with_peer(peer: Option<&Node>) -> Node {
        let dir = TempDir::new().unwrap();
        let peer = peer.map(Node::log_url);
        let mut node = Node {
            dir,
            addr: "127.0.0.1:0".parse().unwrap(),
            peer,
            stop: None,
            task: None,
            client: ApiClient::new("http://127.0.0.1:0", None, ClientConfig::default()).unwrap(),
        };
        node.boot().await;
        node
    }

    async fn boot(&mut self) {
        let daemon = startup(&config(&self.dir, self.addr, self.peer.clone()))
            .await
            .unwrap();
        self.addr = daemon.local_addr().unwrap();
        self.client = ApiClient::new(
            format!("http://{}", self.addr),
            None,
            ClientConfig {
                connect_timeout: Duration::from_secs(3),
                timeout: Duration::from_secs(10),
            },
        )
        .unwrap();

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        self.stop = Some(stop_tx);
        self.task = Some(tokio::spawn(daemon.run(async move {
            let _ = stop_rx.await;
        })));
    }

    /// Base URI of this replica's log surface, as a peer sees it
    pub fn log_url(&self) -> String {
        format!("http://{}/log", self.addr)
    }

    /// Graceful shutdown; the address is kept for a restart
    pub async fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            task.await.unwrap().unwrap();
        }
    }

    /// Start again on the same address and data directory
    pub async fn restart(&mut self) {
        self.stop().await;
        self.boot().await;
    }

    pub async fn write(&self, op: Operation) -> u64 {
        self.try_write(op).await.unwrap()
    }

    pub async fn try_write(&self, op: Operation) -> Result<u64, ClientError> {
        let data: Option<Value> = self
            .client
            .post("/do", Some(&LogPayload::new(0, op)))
            .await?;
        Ok(data.and_then(|d| d["version"].as_u64()).unwrap_or_default())
    }

    pub async fn status(&self) -> StatusReport {
        self.client.get("/status").await.unwrap().unwrap()
    }

    pub async fn committed(&self) -> u64 {
        self.status().await.committed
    }

    pub async fn record(&self, n: u64) -> Result<LogPayload, ClientError> {
        Ok(self
            .client
            .get(&format!("/log/record/{}", n))
            .await?
            .unwrap_or_default())
    }

    pub async fn prepared(&self) -> Result<Option<LogPayload>, ClientError> {
        self.client.get("/log/prepare").await
    }

    /// Prepare and commit directly on this replica's log surface
    pub async fn append_directly(&self, op: Operation) -> u64 {
        let version = self.committed().await + 1;
        self.client
            .post::<_, Value>("/log/prepare", Some(&LogPayload::new(version, op)))
            .await
            .unwrap();
        self.client
            .post::<(), Value>("/log/commit", None)
            .await
            .unwrap();
        version
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

/// Poll `check` until it holds or `timeout` passes
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

/// Assert both replicas hold byte-identical records 1..=committed
pub async fn assert_converged(a: &Node, b: &Node) {
    let committed = a.committed().await;
    assert_eq!(committed, b.committed().await, "committed versions differ");
    for n in 1..=committed {
        assert_eq!(
            a.record(n).await.unwrap(),
            b.record(n).await.unwrap(),
            "record {} differs",
            n
        );
    }
}
