// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::object_store::{ObjectStore, ObjectStoreError};
use crate::peer::{LogPeer, PeerError};
use async_trait::async_trait;
use pairlog_core::LogPayload;
use std::time::Instant;
use tracing::Instrument;

/// Wrapper that adds tracing to any ObjectStore
#[derive(Clone)]
pub struct TracedObjectStore<O> {
    inner: O,
}

impl<O> TracedObjectStore<O> {
    pub fn new(inner: O) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }
}

#[async_trait]
impl<O: ObjectStore> ObjectStore for TracedObjectStore<O> {
    async fn get_object(&self, name: &str) -> Result<Vec<u8>, ObjectStoreError> {
        let span = tracing::debug_span!("object.get", name);
        async {
            let start = Instant::now();
            let result = self.inner.get_object(name).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(bytes) => tracing::debug!(size = bytes.len(), elapsed_ms, "read"),
                // Missing objects are routine during recovery
                Err(e) if e.is_not_found() => tracing::debug!(elapsed_ms, "not found"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "get failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn put_object(&self, name: &str, bytes: Vec<u8>) -> Result<(), ObjectStoreError> {
        let span = tracing::info_span!("object.put", name, size = bytes.len());
        async {
            let start = Instant::now();
            let result = self.inner.put_object(name, bytes).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(()) => tracing::info!(elapsed_ms, "stored"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "put failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn delete_object(&self, name: &str) -> Result<(), ObjectStoreError> {
        let span = tracing::info_span!("object.delete", name);
        async {
            let result = self.inner.delete_object(name).await;
            match &result {
                Ok(()) => tracing::info!("deleted"),
                Err(e) => tracing::warn!(error = %e, "delete failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn create_directory(&self, path: &str) -> Result<(), ObjectStoreError> {
        let result = self.inner.create_directory(path).await;
        tracing::trace!(path, ok = result.is_ok(), "create directory");
        result
    }
}

/// Wrapper that adds tracing to any LogPeer
#[derive(Clone)]
pub struct TracedPeer<P> {
    inner: P,
    peer: String,
}

impl<P> TracedPeer<P> {
    /// `peer` names the peer in log fields (usually its base URI)
    pub fn new(inner: P, peer: impl Into<String>) -> Self {
        Self {
            inner,
            peer: peer.into(),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

fn log_outcome<T>(result: &Result<T, PeerError>, start: Instant, what: &str) {
    let elapsed_ms = start.elapsed().as_millis() as u64;
    match result {
        Ok(_) => tracing::debug!(elapsed_ms, "{} ok", what),
        Err(e) if e.is_not_found() => tracing::debug!(elapsed_ms, "{} not found", what),
        Err(e) => tracing::warn!(elapsed_ms, error = %e, "{} failed", what),
    }
}

#[async_trait]
impl<P: LogPeer> LogPeer for TracedPeer<P> {
    async fn prepared(&self) -> Result<LogPayload, PeerError> {
        let span = tracing::debug_span!("peer.prepared", peer = %self.peer);
        async {
            let start = Instant::now();
            let result = self.inner.prepared().await;
            log_outcome(&result, start, "prepared");
            result
        }
        .instrument(span)
        .await
    }

    async fn committed(&self) -> Result<LogPayload, PeerError> {
        let span = tracing::debug_span!("peer.committed", peer = %self.peer);
        async {
            let start = Instant::now();
            let result = self.inner.committed().await;
            log_outcome(&result, start, "committed");
            result
        }
        .instrument(span)
        .await
    }

    async fn prepare(&self, payload: &LogPayload) -> Result<(), PeerError> {
        let span = tracing::info_span!("peer.prepare", peer = %self.peer, version = payload.version);
        async {
            let start = Instant::now();
            let result = self.inner.prepare(payload).await;
            log_outcome(&result, start, "prepare");
            result
        }
        .instrument(span)
        .await
    }

    async fn commit(&self) -> Result<(), PeerError> {
        let span = tracing::info_span!("peer.commit", peer = %self.peer);
        async {
            let start = Instant::now();
            let result = self.inner.commit().await;
            log_outcome(&result, start, "commit");
            result
        }
        .instrument(span)
        .await
    }

    async fn rollback(&self) -> Result<(), PeerError> {
        let span = tracing::info_span!("peer.rollback", peer = %self.peer);
        async {
            let start = Instant::now();
            let result = self.inner.rollback().await;
            log_outcome(&result, start, "rollback");
            result
        }
        .instrument(span)
        .await
    }

    async fn record(&self, n: u64) -> Result<LogPayload, PeerError> {
        let span = tracing::debug_span!("peer.record", peer = %self.peer, record = n);
        async {
            let start = Instant::now();
            let result = self.inner.record(n).await;
            log_outcome(&result, start, "record");
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
