// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A lagging peer is caught up by the repair loop.

use crate::prelude::*;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread")]
async fn restarted_peer_is_caught_up() {
    let mut backup = Node::start().await;
    let primary = Node::start_with_peer(Some(&backup)).await;
    primary.write(set_op("a", "1")).await;

    backup.stop().await;
    primary.write(set_op("b", "2")).await;
    primary.write(delete_op("a")).await;
    backup.restart().await;

    let caught_up = eventually(Duration::from_secs(10), || async {
        primary.status().await.peer_in_sync
    })
    .await;
    assert!(caught_up, "peer never caught up");
    assert_converged(&primary, &backup).await;

    // Replication resumes on the normal path
    primary.write(set_op("c", "3")).await;
    assert_converged(&primary, &backup).await;
}
