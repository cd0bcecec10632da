// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pairlog_core::Operation;

fn payload(version: u64, data: &str) -> LogPayload {
    LogPayload::new(version, Operation::new("set", data.as_bytes().to_vec()))
}

#[tokio::test]
async fn prepare_commit_advances_committed() {
    let peer = FakePeer::new();

    peer.prepare(&payload(1, "a")).await.unwrap();
    assert_eq!(peer.prepared_version().await.unwrap(), Some(1));
    peer.commit().await.unwrap();

    assert_eq!(peer.committed_version().await.unwrap(), 1);
    assert_eq!(peer.record(1).await.unwrap(), payload(1, "a"));
}

#[tokio::test]
async fn out_of_sequence_prepare_is_rejected() {
    let peer = FakePeer::with_committed(vec![payload(0, "a")]);

    let err = peer.prepare(&payload(5, "x")).await.unwrap_err();
    assert!(matches!(err, PeerError::Status { code: 400, .. }));
}

#[tokio::test]
async fn rollback_discards_prepared() {
    let peer = FakePeer::new();
    peer.prepare(&payload(1, "a")).await.unwrap();

    peer.rollback().await.unwrap();
    peer.commit().await.unwrap();

    assert_eq!(peer.committed_version().await.unwrap(), 0);
    assert!(peer.prepared().await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn fail_next_injects_transport_errors() {
    let peer = FakePeer::new();
    peer.fail_next(2);

    assert!(matches!(
        peer.commit().await,
        Err(PeerError::Transport(_))
    ));
    assert!(peer.rollback().await.is_err());
    peer.commit().await.unwrap();
    assert_eq!(
        peer.calls(),
        vec![PeerCall::Commit, PeerCall::Rollback, PeerCall::Commit]
    );
}

#[tokio::test]
async fn unavailable_peer_fails_every_call() {
    let peer = FakePeer::with_committed(vec![payload(0, "a")]);
    peer.set_unavailable(true);

    assert!(peer.committed_version().await.is_err());
    assert!(peer.record(1).await.is_err());

    peer.set_unavailable(false);
    assert_eq!(peer.committed_version().await.unwrap(), 1);
}
