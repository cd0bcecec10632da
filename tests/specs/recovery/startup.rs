// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup reconciliation between replicas.

use crate::prelude::*;

#[tokio::test(flavor = "multi_thread")]
async fn local_behind_peer_adopts_peer_records() {
    let backup = Node::start().await;
    let mut primary = Node::start_with_peer(Some(&backup)).await;
    primary.write(set_op("a", "1")).await;

    primary.stop().await;
    backup.append_directly(set_op("b", "2")).await;
    backup.append_directly(set_op("c", "3")).await;
    primary.restart().await;

    let status = primary.status().await;
    assert_eq!(status.committed, 3);
    assert_eq!(status.current_version, 3);
    assert!(status.peer_in_sync);
    assert_converged(&primary, &backup).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn local_ahead_replays_to_peer() {
    let mut backup = Node::start().await;
    let mut primary = Node::start_with_peer(Some(&backup)).await;
    primary.write(set_op("a", "1")).await;
    backup.stop().await;
    primary.write(set_op("b", "2")).await;
    primary.stop().await;

    backup.restart().await;
    primary.restart().await;

    assert!(primary.status().await.peer_in_sync);
    assert_converged(&primary, &backup).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn interrupted_prepare_is_rolled_back_on_both() {
    let backup = Node::start().await;
    let mut primary = Node::start_with_peer(Some(&backup)).await;
    primary.write(set_op("a", "1")).await;

    // A write that died between prepare and commit
    let dangling = LogPayload::new(2, set_op("b", "2"));
    for node in [&primary, &backup] {
        node.client
            .post::<_, Value>("/log/prepare", Some(&dangling))
            .await
            .unwrap();
    }
    primary.restart().await;

    assert!(primary.prepared().await.is_err());
    assert!(backup.prepared().await.is_err());
    assert_eq!(primary.committed().await, 1);
    assert_eq!(primary.write(set_op("c", "3")).await, 2);
    assert_converged(&primary, &backup).await;
}
