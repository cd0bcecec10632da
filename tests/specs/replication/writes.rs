// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Writes through the primary land on both replicas.

use crate::prelude::*;

#[tokio::test(flavor = "multi_thread")]
async fn writes_replicate_to_peer() {
    let backup = Node::start().await;
    let primary = Node::start_with_peer(Some(&backup)).await;

    for i in 1..=3u64 {
        assert_eq!(primary.write(set_op(&format!("k{}", i), "v")).await, i);
    }

    assert!(primary.status().await.peer_in_sync);
    assert_converged(&primary, &backup).await;
    assert_eq!(backup.record(2).await.unwrap().op, set_op("k2", "v"));
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_write_reaches_neither_replica() {
    let backup = Node::start().await;
    let primary = Node::start_with_peer(Some(&backup)).await;
    primary.write(set_op("a", "1")).await;

    let err = primary.try_write(delete_op("ghost")).await.unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert_eq!(primary.committed().await, 1);
    assert_eq!(backup.committed().await, 1);
    assert!(backup.prepared().await.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn writes_continue_while_peer_is_down() {
    let mut backup = Node::start().await;
    let primary = Node::start_with_peer(Some(&backup)).await;
    primary.write(set_op("a", "1")).await;

    backup.stop().await;
    primary.write(set_op("b", "2")).await;
    primary.write(set_op("c", "3")).await;

    let status = primary.status().await;
    assert_eq!(status.committed, 3);
    assert!(!status.peer_in_sync);
}
