// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable service overlay
//!
//! Wraps a Service and makes its state durable in an object store. Applied
//! operations are buffered and periodically flushed as gzip'd JSON segments;
//! full snapshots are taken on a slower cadence. Recovery restores the latest
//! snapshot and replays the segments that follow it.
//!
//! Object layout under `prefix`:
//! - `SNAPSHOT/<version:016x>`: serialized service state
//! - `LOG/<first:016x>`: segment whose first operation has version `first`
//! - `LATEST`: hex version of the newest snapshot, unpadded

use crate::error::{from_json, from_object_store};
use async_trait::async_trait;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use pairlog_adapters::ObjectStore;
use pairlog_core::{
    Clock, ErrorKind, LogError, Operation, Service, ServiceError, SnapshotData,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy)]
pub struct OverlayConfig {
    /// How often a durable apply re-checks the flush watermark
    pub durable_poll: Duration,
    pub durable_timeout: Duration,
    /// Minimum age before an unchanged snapshot is taken again
    pub snapshot_cooldown: Duration,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            durable_poll: Duration::from_millis(100),
            durable_timeout: Duration::from_secs(10),
            snapshot_cooldown: Duration::from_secs(24 * 60 * 60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOutcome {
    Taken(u64),
    /// Nothing changed since the last snapshot and it is still fresh
    Skipped(u64),
}

#[derive(Default)]
struct OverlayState {
    pending: Vec<Operation>,
    last_snapshot_time: Option<Instant>,
}

pub struct DurableService<S, O, C> {
    service: Arc<S>,
    store: O,
    prefix: String,
    clock: C,
    config: OverlayConfig,
    state: Mutex<OverlayState>,
    current: AtomicU64,
    last_flush: AtomicU64,
    last_snapshot: AtomicU64,
}

impl<S: Service, O: ObjectStore, C: Clock> DurableService<S, O, C> {
    pub async fn new(
        service: Arc<S>,
        store: O,
        prefix: impl Into<String>,
        clock: C,
        config: OverlayConfig,
    ) -> Result<Self, LogError> {
        let prefix = prefix.into();
        for dir in ["LOG", "SNAPSHOT"] {
            store
                .create_directory(&object_name(&prefix, dir))
                .await
                .map_err(from_object_store)?;
        }
        let current = service
            .version()
            .await
            .map_err(|e| e.into_log_error(ErrorKind::Internal))?;

        Ok(Self {
            service,
            store,
            prefix,
            clock,
            config,
            state: Mutex::new(OverlayState::default()),
            current: AtomicU64::new(current),
            last_flush: AtomicU64::new(0),
            last_snapshot: AtomicU64::new(0),
        })
    }

    pub fn inner(&self) -> &Arc<S> {
        &self.service
    }

    pub fn current_version(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    /// Highest version contained in a flushed segment or snapshot
    pub fn flushed_version(&self) -> u64 {
        self.last_flush.load(Ordering::SeqCst)
    }

    pub fn snapshot_version(&self) -> u64 {
        self.last_snapshot.load(Ordering::SeqCst)
    }

    fn segment_name(&self, first: u64) -> String {
        object_name(&self.prefix, &format!("LOG/{:016x}", first))
    }

    fn snapshot_name(&self, version: u64) -> String {
        object_name(&self.prefix, &format!("SNAPSHOT/{:016x}", version))
    }

    fn latest_name(&self) -> String {
        object_name(&self.prefix, "LATEST")
    }

    /// Validate and apply `op` as the next version, returning that version
    ///
    /// With `wait_until_durable` the call returns only once a flush covers
    /// the new version, or fails with a timeout error.
    pub async fn apply(&self, op: &Operation, wait_until_durable: bool) -> Result<u64, LogError> {
        self.service
            .validate(op)
            .await
            .map_err(|e| e.into_log_error(ErrorKind::Validation))?;

        let version = {
            let mut state = self.state.lock().await;
            let version = self.current.load(Ordering::SeqCst) + 1;
            self.apply_locked(&mut state, version, op).await?;
            version
        };

        if wait_until_durable {
            self.wait_durable(version).await?;
        }
        Ok(version)
    }

    async fn apply_locked(
        &self,
        state: &mut OverlayState,
        version: u64,
        op: &Operation,
    ) -> Result<(), LogError> {
        self.service
            .apply(version, op)
            .await
            .map_err(|e| e.into_log_error(ErrorKind::Internal))?;
        state.pending.push(op.clone());
        self.current.store(version, Ordering::SeqCst);
        Ok(())
    }

    async fn wait_durable(&self, version: u64) -> Result<(), LogError> {
        let deadline = tokio::time::Instant::now() + self.config.durable_timeout;
        loop {
            if self.last_flush.load(Ordering::SeqCst) >= version {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(LogError::timeout(format!(
                    "version {} not durable within {:?}",
                    version, self.config.durable_timeout
                )));
            }
            tokio::time::sleep(self.config.durable_poll).await;
        }
    }

    /// Write buffered operations as one segment. Returns how many were written.
    pub async fn flush(&self) -> Result<usize, LogError> {
        let mut state = self.state.lock().await;
        if state.pending.is_empty() {
            return Ok(0);
        }

        let first = self.last_flush.load(Ordering::SeqCst) + 1;
        let bytes = encode_segment(&state.pending)?;
        let size = bytes.len();
        self.store
            .put_object(&self.segment_name(first), bytes)
            .await
            .map_err(from_object_store)?;

        let count = state.pending.len();
        state.pending.clear();
        let last = first + count as u64 - 1;
        self.last_flush.store(last, Ordering::SeqCst);
        tracing::debug!(first, last, size, "flushed segment");
        Ok(count)
    }

    /// Write a full snapshot and point `LATEST` at it
    ///
    /// Skipped when the service has not changed since the last snapshot and
    /// that snapshot is younger than the cooldown.
    pub async fn snapshot(&self) -> Result<SnapshotOutcome, LogError> {
        let mut state = self.state.lock().await;

        let version = self
            .service
            .version()
            .await
            .map_err(|e| e.into_log_error(ErrorKind::Internal))?;
        let fresh = state
            .last_snapshot_time
            .is_some_and(|t| self.clock.since(t) < self.config.snapshot_cooldown);
        if version == self.last_snapshot.load(Ordering::SeqCst) && fresh {
            return Ok(SnapshotOutcome::Skipped(version));
        }

        let snap = self
            .service
            .snapshot()
            .await
            .map_err(|e| e.into_log_error(ErrorKind::Internal))?;
        let version = snap.version;
        let size = snap.size();
        self.store
            .put_object(&self.snapshot_name(version), snap.bytes)
            .await
            .map_err(from_object_store)?;
        self.store
            .put_object(&self.latest_name(), format!("{:x}", version).into_bytes())
            .await
            .map_err(from_object_store)?;

        self.last_snapshot.store(version, Ordering::SeqCst);
        state.last_snapshot_time = Some(self.clock.now());
        self.current.fetch_max(version, Ordering::SeqCst);
        // Everything buffered is covered by the snapshot
        state.pending.clear();
        self.last_flush.store(version, Ordering::SeqCst);
        tracing::info!(version, size, "snapshot taken");
        Ok(SnapshotOutcome::Taken(version))
    }

    /// Restore the latest snapshot and replay the segments after it
    ///
    /// Returns the recovered version.
    pub async fn recover(&self) -> Result<u64, LogError> {
        let _state = self.state.lock().await;

        match self.store.get_object(&self.latest_name()).await {
            Ok(latest) => {
                let text = String::from_utf8_lossy(&latest);
                let version = u64::from_str_radix(text.trim(), 16).map_err(|e| {
                    LogError::storage(format!("invalid LATEST contents {:?}: {}", text, e))
                })?;
                let bytes = self
                    .store
                    .get_object(&self.snapshot_name(version))
                    .await
                    .map_err(from_object_store)?;
                self.service
                    .restore(version, &bytes)
                    .await
                    .map_err(|e| e.into_log_error(ErrorKind::Internal))?;
                self.current.store(version, Ordering::SeqCst);
                self.last_snapshot.store(version, Ordering::SeqCst);
                tracing::info!(version, "restored snapshot");
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(from_object_store(e)),
        }
        self.last_flush
            .store(self.current.load(Ordering::SeqCst), Ordering::SeqCst);

        let mut segments = 0;
        loop {
            let first = self.current.load(Ordering::SeqCst) + 1;
            let bytes = match self.store.get_object(&self.segment_name(first)).await {
                Ok(b) => b,
                Err(e) if e.is_not_found() => break,
                Err(e) => return Err(from_object_store(e)),
            };
            let ops = decode_segment(&bytes)?;
            for (i, op) in ops.iter().enumerate() {
                let version = first + i as u64;
                self.service
                    .apply(version, op)
                    .await
                    .map_err(|e| e.into_log_error(ErrorKind::Internal))?;
                self.current.store(version, Ordering::SeqCst);
            }
            if ops.is_empty() {
                break;
            }
            self.last_flush
                .store(self.current.load(Ordering::SeqCst), Ordering::SeqCst);
            segments += 1;
        }

        let version = self.current.load(Ordering::SeqCst);
        tracing::info!(version, segments, "recovered service state");
        Ok(version)
    }
}

/// The overlay is itself a Service, so it can sit under the log service.
/// Commits arrive with explicit versions; already-applied versions are ignored.
#[async_trait]
impl<S: Service, O: ObjectStore, C: Clock> Service for DurableService<S, O, C> {
    async fn version(&self) -> Result<u64, ServiceError> {
        Ok(self.current_version())
    }

    async fn validate(&self, op: &Operation) -> Result<(), ServiceError> {
        self.service.validate(op).await
    }

    async fn apply(&self, version: u64, op: &Operation) -> Result<(), ServiceError> {
        let mut state = self.state.lock().await;
        let current = self.current.load(Ordering::SeqCst);
        if version <= current {
            return Ok(());
        }
        if version != current + 1 {
            return Err(ServiceError::new(format!(
                "version gap: expected {}, got {}",
                current + 1,
                version
            ))
            .with_status(400));
        }
        self.apply_locked(&mut state, version, op)
            .await
            .map_err(|e| ServiceError::new(e.message()).with_status(e.status_code()))
    }

    async fn lock_resources(&self, op: &Operation) -> bool {
        self.service.lock_resources(op).await
    }

    async fn unlock_resources(&self, op: &Operation) {
        self.service.unlock_resources(op).await
    }

    async fn snapshot(&self) -> Result<SnapshotData, ServiceError> {
        self.service.snapshot().await
    }

    async fn restore(&self, version: u64, bytes: &[u8]) -> Result<(), ServiceError> {
        let _state = self.state.lock().await;
        self.service.restore(version, bytes).await?;
        self.current.store(version, Ordering::SeqCst);
        Ok(())
    }

    async fn durable_version(&self) -> Result<u64, ServiceError> {
        Ok(self.flushed_version())
    }
}

fn object_name(prefix: &str, rest: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        rest.to_string()
    } else {
        format!("{}/{}", prefix, rest)
    }
}

fn encode_segment(ops: &[Operation]) -> Result<Vec<u8>, LogError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    serde_json::to_writer(&mut encoder, ops).map_err(|e| from_json("encode segment", e))?;
    encoder
        .finish()
        .map_err(|e| LogError::storage(format!("compress segment: {}", e)).with_source(e))
}

fn decode_segment(bytes: &[u8]) -> Result<Vec<Operation>, LogError> {
    serde_json::from_reader(GzDecoder::new(bytes)).map_err(|e| from_json("decode segment", e))
}

#[cfg(test)]
#[path = "overlay_tests.rs"]
mod tests;
