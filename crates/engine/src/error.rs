// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mapping of layer errors onto [`LogError`] kinds

use pairlog_adapters::{ObjectStoreError, PeerError};
use pairlog_core::LogError;
use pairlog_storage::CommitLogError;

pub(crate) fn from_log(e: CommitLogError) -> LogError {
    match e {
        CommitLogError::NotFound(msg) => LogError::not_found(msg),
        other => LogError::storage(other.to_string()).with_source(other),
    }
}

/// Missing records on the read-by-number path are storage failures: the
/// record was compacted or never written.
pub(crate) fn from_record_lookup(e: CommitLogError) -> LogError {
    match e {
        CommitLogError::NotFound(msg) => LogError::storage(format!("not found: {}", msg)),
        other => from_log(other),
    }
}

pub(crate) fn from_peer(e: PeerError) -> LogError {
    match e {
        PeerError::NotFound(msg) => LogError::not_found(msg),
        PeerError::Status { code, message } => {
            LogError::peer_unavailable(format!("peer returned {}: {}", code, message))
        }
        other => LogError::peer_unavailable(other.to_string()).with_source(other),
    }
}

pub(crate) fn from_object_store(e: ObjectStoreError) -> LogError {
    match e {
        ObjectStoreError::NotFound(name) => LogError::not_found(format!("object {}", name)),
        other => LogError::storage(other.to_string()).with_source(other),
    }
}

pub(crate) fn from_json(context: &str, e: serde_json::Error) -> LogError {
    LogError::storage(format!("{}: {}", context, e)).with_source(e)
}
