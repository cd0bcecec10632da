// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[tokio::test]
async fn set_and_delete_apply_in_order() {
    let kv = KvService::new();

    kv.apply(1, &set_op("a", "1")).await.unwrap();
    kv.apply(2, &set_op("b", "2")).await.unwrap();
    kv.apply(3, &delete_op("a")).await.unwrap();

    assert_eq!(kv.get("a"), None);
    assert_eq!(kv.get("b"), Some("2".to_string()));
    assert_eq!(kv.version().await.unwrap(), 3);
}

#[tokio::test]
async fn reapplying_a_version_is_a_noop() {
    let kv = KvService::new();
    kv.apply(1, &set_op("a", "1")).await.unwrap();
    kv.apply(2, &set_op("a", "2")).await.unwrap();

    kv.apply(1, &set_op("a", "stale")).await.unwrap();
    kv.apply(2, &set_op("a", "stale")).await.unwrap();

    assert_eq!(kv.get("a"), Some("2".to_string()));
    assert_eq!(kv.current_version(), 2);
}

#[parameterized(
    unknown_method = { Operation::new("incr", b"{}".to_vec()), 400 },
    bad_payload = { Operation::new("set", b"not json".to_vec()), 400 },
    missing_value = { Operation::new("set", br#"{"key":"a"}"#.to_vec()), 400 },
    delete_missing = { delete_op("ghost"), 404 },
)]
fn validation_rejects(op: Operation, status: u16) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let err = rt.block_on(KvService::new().validate(&op)).unwrap_err();
    assert_eq!(err.status, Some(status));
}

#[tokio::test]
async fn delete_of_existing_key_validates() {
    let kv = KvService::new();
    kv.apply(1, &set_op("a", "1")).await.unwrap();

    kv.validate(&delete_op("a")).await.unwrap();
}

#[tokio::test]
async fn resource_locks_are_per_key() {
    let kv = KvService::new();

    assert!(kv.lock_resources(&set_op("a", "1")).await);
    assert!(!kv.lock_resources(&delete_op("a")).await);
    assert!(kv.lock_resources(&set_op("b", "1")).await);

    kv.unlock_resources(&set_op("a", "1")).await;
    assert!(kv.lock_resources(&set_op("a", "2")).await);
}

#[tokio::test]
async fn snapshot_restore_round_trip() {
    let kv = KvService::new();
    kv.apply(1, &set_op("a", "1")).await.unwrap();
    kv.apply(2, &set_op("b", "2")).await.unwrap();
    let snap = kv.snapshot().await.unwrap();
    assert_eq!(snap.version, 2);

    let restored = KvService::new();
    restored.restore(snap.version, &snap.bytes).await.unwrap();

    assert_eq!(restored.entries(), kv.entries());
    assert_eq!(restored.version().await.unwrap(), 2);
}

#[tokio::test]
async fn restore_rejects_garbage() {
    let kv = KvService::new();
    assert!(kv.restore(3, b"nope").await.is_err());
    assert_eq!(kv.current_version(), 0);
}
