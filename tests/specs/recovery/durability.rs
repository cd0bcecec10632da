// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service state survives restarts and bounds compaction.

use crate::prelude::*;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread")]
async fn state_survives_restart() {
    let mut node = Node::start().await;
    node.write(set_op("a", "1")).await;
    node.write(set_op("b", "2")).await;

    node.restart().await;

    let status = node.status().await;
    assert_eq!(status.committed, 2);
    assert_eq!(status.current_version, 2);
    assert_eq!(status.flushed_version, 2);
    assert_eq!(status.snapshot_version, 2);
    assert_eq!(node.write(set_op("c", "3")).await, 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn compaction_keeps_most_recent_records() {
    let node = Node::start().await;
    for i in 1..=100 {
        node.write(set_op(&format!("k{}", i), "v")).await;
    }
    let flushed = eventually(Duration::from_secs(10), || async {
        node.status().await.flushed_version == 100
    })
    .await;
    assert!(flushed, "writes never became durable");

    node.client
        .post::<(), Value>("/log/compact?keep=10", None)
        .await
        .unwrap();

    assert_eq!(node.committed().await, 100);
    assert_eq!(node.record(90).await.unwrap_err().status(), Some(500));
    for n in 91..=100 {
        assert_eq!(node.record(n).await.unwrap().version, n);
    }
}
