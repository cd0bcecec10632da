// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Two-replica write orchestration
//!
//! Every write is prepared locally, prepared on the peer, committed locally
//! and committed on the peer, all under one process-wide write lock. A peer
//! that fails is marked out of sync and skipped until the repair loop brings
//! it back. Local failures are never masked.

use crate::error::from_peer;
use crate::log_service::LogService;
use pairlog_adapters::{LogPeer, PeerError};
use pairlog_core::{LogError, LogPayload, Operation, Service};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy)]
pub struct ReplicationConfig {
    /// Attempts per peer prepare or commit before the peer is marked out of sync
    pub peer_retries: u32,
    pub repair_interval: Duration,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            peer_retries: 3,
            repair_interval: Duration::from_secs(3),
        }
    }
}

/// States of startup reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileState {
    ComparingCommitted,
    ReplayingToPeer { from: u64, to: u64 },
    ReplayingFromPeer { from: u64, to: u64 },
    ComparingPrepared,
    RollingBack,
    InSync,
    PeerSkipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// `InSync` or `PeerSkipped`
    pub state: ReconcileState,
    /// Records copied in either direction
    pub replayed: u64,
}

/// Result of one repair pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairOutcome {
    /// Peer was already in sync or no peer is configured
    Idle,
    InSync,
    /// Records copied to the peer; the next pass re-checks
    Replayed(u64),
    /// Peer has records this replica lacks; left out of sync
    PeerAhead { local: u64, peer: u64 },
    /// Peer unreachable or a copy failed
    Failed,
}

pub struct Orchestrator<S, P> {
    log: Arc<LogService<S>>,
    peer: Option<P>,
    write_lock: Mutex<()>,
    peer_in_sync: AtomicBool,
    poisoned: AtomicBool,
    config: ReplicationConfig,
}

impl<S: Service, P: LogPeer> Orchestrator<S, P> {
    /// The peer starts out of sync until [`reconcile`](Self::reconcile) or
    /// the repair loop proves otherwise.
    pub fn new(log: Arc<LogService<S>>, peer: Option<P>, config: ReplicationConfig) -> Self {
        Self {
            log,
            peer,
            write_lock: Mutex::new(()),
            peer_in_sync: AtomicBool::new(false),
            poisoned: AtomicBool::new(false),
            config,
        }
    }

    pub fn log(&self) -> &Arc<LogService<S>> {
        &self.log
    }

    pub fn has_peer(&self) -> bool {
        self.peer.is_some()
    }

    pub fn peer_in_sync(&self) -> bool {
        self.peer.is_some() && self.peer_in_sync.load(Ordering::SeqCst)
    }

    /// True once a failed rollback left local state untrustworthy
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::SeqCst)
    }

    fn mark_out_of_sync(&self) {
        if self.peer_in_sync.swap(false, Ordering::SeqCst) {
            tracing::warn!("marking peer as out of sync");
        }
    }

    /// Replicate one write. Returns the committed version.
    ///
    /// With `ignore_version` the payload's version is replaced by
    /// `committed + 1`. The write runs on its own task, so dropping the
    /// returned future does not abandon a prepared record or held resources.
    pub async fn execute(
        self: &Arc<Self>,
        payload: LogPayload,
        ignore_version: bool,
    ) -> Result<u64, LogError> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.write(payload, ignore_version).await })
            .await
            .map_err(|e| LogError::internal(format!("write task failed: {}", e)))?
    }

    async fn write(&self, payload: LogPayload, ignore_version: bool) -> Result<u64, LogError> {
        let _write = self.write_lock.lock().await;
        if self.is_poisoned() {
            return Err(LogError::fatal("commit log is poisoned by a failed rollback"));
        }

        self.log.lock_resources(&payload.op).await?;
        let locked = ResourceGuard::new(Arc::clone(&self.log), payload.op.clone());
        let result = self.write_locked(payload, ignore_version).await;
        locked.release().await;
        result
    }

    async fn write_locked(
        &self,
        mut payload: LogPayload,
        ignore_version: bool,
    ) -> Result<u64, LogError> {
        let start = Instant::now();
        if ignore_version {
            payload.version = self.log.committed_version().await? + 1;
        }

        self.log.prepare(&payload).await?;

        if let Some(peer) = self.in_sync_peer() {
            if let Err(e) = self.retry("prepare", || peer.prepare(&payload)).await {
                tracing::warn!(version = payload.version, error = %e, "peer prepare failed");
                self.mark_out_of_sync();
            }
        }

        if let Err(e) = self.log.commit().await {
            // A Service apply failure comes back after the log commit stood
            let committed = match self.log.committed_version().await {
                Ok(v) => v,
                Err(read) => {
                    tracing::warn!(error = %read, "cannot read committed version after failed commit");
                    0
                }
            };
            if committed == payload.version {
                tracing::error!(version = payload.version, error = %e, "apply failed after commit");
                self.commit_peer(payload.version).await;
                return Err(e);
            }
            tracing::error!(version = payload.version, error = %e, "local commit failed, rolling back");
            if let Err(rollback) = self.log.rollback().await {
                self.poisoned.store(true, Ordering::SeqCst);
                tracing::error!(error = %rollback, "rollback failed");
                return Err(LogError::fatal(format!("rollback failed: {}", rollback.message()))
                    .with_source(rollback));
            }
            return Err(e);
        }

        self.commit_peer(payload.version).await;
        tracing::info!(
            version = payload.version,
            method = %payload.op.method,
            peer_in_sync = self.peer_in_sync(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "write committed"
        );
        Ok(payload.version)
    }

    async fn commit_peer(&self, version: u64) {
        if let Some(peer) = self.in_sync_peer() {
            if let Err(e) = self.retry("commit", || peer.commit()).await {
                tracing::warn!(version, error = %e, "peer commit failed");
                self.mark_out_of_sync();
            }
        }
    }

    fn in_sync_peer(&self) -> Option<&P> {
        self.peer
            .as_ref()
            .filter(|_| self.peer_in_sync.load(Ordering::SeqCst))
    }

    async fn retry<F, Fut>(&self, what: &str, mut call: F) -> Result<(), PeerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), PeerError>>,
    {
        let attempts = self.config.peer_retries.max(1);
        let mut last = PeerError::Transport("no attempts made".to_string());
        for attempt in 1..=attempts {
            match call().await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::debug!(attempt, attempts, error = %e, "peer {} failed", what);
                    last = e;
                }
            }
        }
        Err(last)
    }

    /// Bring both replicas to the same committed record at startup
    ///
    /// Peer failures leave the peer out of sync and are not errors. Local
    /// failures while adopting the peer's records are returned.
    pub async fn reconcile(&self) -> Result<ReconcileOutcome, LogError> {
        let _write = self.write_lock.lock().await;
        let Some(peer) = self.peer.as_ref() else {
            self.log.commit().await?;
            return Ok(ReconcileOutcome {
                state: ReconcileState::InSync,
                replayed: 0,
            });
        };

        let mut state = ReconcileState::ComparingCommitted;
        let mut replayed = 0;
        loop {
            tracing::debug!(?state, "reconcile");
            state = match state {
                ReconcileState::ComparingCommitted => {
                    let local = self.log.committed_version().await?;
                    match peer.committed_version().await {
                        Ok(remote) if remote < local => ReconcileState::ReplayingToPeer {
                            from: remote + 1,
                            to: local,
                        },
                        Ok(remote) if remote > local => ReconcileState::ReplayingFromPeer {
                            from: local + 1,
                            to: remote,
                        },
                        Ok(_) => ReconcileState::ComparingPrepared,
                        Err(e) => {
                            tracing::warn!(error = %e, "peer unavailable at startup");
                            ReconcileState::PeerSkipped
                        }
                    }
                }
                ReconcileState::ReplayingToPeer { from, to } => {
                    match self.replay_to_peer(peer, from, to).await {
                        Ok(n) => {
                            replayed += n;
                            ReconcileState::ComparingPrepared
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "replay to peer failed");
                            ReconcileState::PeerSkipped
                        }
                    }
                }
                ReconcileState::ReplayingFromPeer { from, to } => {
                    self.log.rollback().await?;
                    let mut next = ReconcileState::ComparingPrepared;
                    for n in from..=to {
                        let payload = match peer.record(n).await {
                            Ok(p) => p,
                            Err(e) => {
                                tracing::warn!(record = n, error = %e, "fetching peer record failed");
                                next = ReconcileState::PeerSkipped;
                                break;
                            }
                        };
                        if let Err(e) = self.adopt(&payload).await {
                            tracing::warn!(record = n, error = %e, "adopting peer record failed");
                            next = ReconcileState::PeerSkipped;
                            break;
                        }
                        replayed += 1;
                    }
                    if next == ReconcileState::ComparingPrepared {
                        tracing::info!(from, to, "caught up from peer");
                    }
                    next
                }
                ReconcileState::ComparingPrepared => {
                    let local = self.log.prepared_version().await?;
                    match peer.prepared_version().await {
                        Ok(remote) if local.is_some() || remote.is_some() => {
                            ReconcileState::RollingBack
                        }
                        Ok(_) => ReconcileState::InSync,
                        Err(e) => {
                            tracing::warn!(error = %e, "peer prepared check failed");
                            ReconcileState::PeerSkipped
                        }
                    }
                }
                ReconcileState::RollingBack => {
                    self.log.rollback().await?;
                    match peer.rollback().await {
                        Ok(()) => ReconcileState::InSync,
                        Err(e) => {
                            tracing::warn!(error = %e, "peer rollback failed");
                            ReconcileState::PeerSkipped
                        }
                    }
                }
                ReconcileState::InSync | ReconcileState::PeerSkipped => break,
            };
        }

        self.peer_in_sync
            .store(state == ReconcileState::InSync, Ordering::SeqCst);
        self.log.commit().await?;
        tracing::info!(?state, replayed, "reconciled with peer");
        Ok(ReconcileOutcome { state, replayed })
    }

    /// Append a peer record locally; a failed commit is rolled back
    async fn adopt(&self, payload: &LogPayload) -> Result<(), LogError> {
        self.log.prepare(payload).await?;
        if let Err(e) = self.log.commit().await {
            if self.log.committed_version().await? < payload.version {
                self.log.rollback().await?;
            }
            return Err(e);
        }
        Ok(())
    }

    async fn replay_to_peer(&self, peer: &P, from: u64, to: u64) -> Result<u64, LogError> {
        peer.rollback().await.map_err(from_peer)?;
        let mut copied = 0;
        for n in from..=to {
            let payload = self.log.record(n).await?;
            peer.prepare(&payload).await.map_err(from_peer)?;
            peer.commit().await.map_err(from_peer)?;
            copied += 1;
        }
        Ok(copied)
    }

    /// One pass of the peer repair loop
    pub async fn repair_once(&self) -> RepairOutcome {
        let Some(peer) = self.peer.as_ref() else {
            return RepairOutcome::Idle;
        };
        if self.peer_in_sync.load(Ordering::SeqCst) {
            return RepairOutcome::Idle;
        }

        // Clears a prepare left behind by an interrupted write
        let _ = peer.rollback().await;
        let remote = match peer.committed_version().await {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(error = %e, "peer still unavailable");
                return RepairOutcome::Failed;
            }
        };

        let local = {
            let _write = self.write_lock.lock().await;
            let local = match self.log.committed_version().await {
                Ok(v) => v,
                Err(e) => {
                    tracing::error!(error = %e, "reading local committed version");
                    return RepairOutcome::Failed;
                }
            };
            if local == remote {
                self.peer_in_sync.store(true, Ordering::SeqCst);
                tracing::info!(version = local, "peer back in sync");
                return RepairOutcome::InSync;
            }
            local
        };

        if remote > local {
            tracing::warn!(local, peer = remote, "peer is ahead of local log, leaving it out of sync");
            return RepairOutcome::PeerAhead {
                local,
                peer: remote,
            };
        }

        let mut copied = 0;
        for n in remote + 1..=local {
            let result = async {
                let payload = self.log.record(n).await?;
                peer.prepare(&payload).await.map_err(from_peer)?;
                peer.commit().await.map_err(from_peer)
            }
            .await;
            if let Err(e) = result {
                tracing::warn!(record = n, error = %e, "repair copy failed");
                return RepairOutcome::Failed;
            }
            copied += 1;
        }
        tracing::info!(from = remote + 1, to = local, "copied records to peer");
        RepairOutcome::Replayed(copied)
    }
}

impl<S: Service, P: LogPeer> Orchestrator<S, P> {
    /// Run [`repair_once`](Self::repair_once) every `repair_interval` until
    /// `shutdown` flips to true
    pub fn spawn_repair_loop(self: &Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            if orchestrator.peer.is_none() {
                return;
            }
            let interval = orchestrator.config.repair_interval;
            loop {
                // A pass that made progress re-checks immediately
                let outcome = orchestrator.repair_once().await;
                if !matches!(outcome, RepairOutcome::Replayed(_)) {
                    tokio::select! {
                        _ = tokio::time::sleep(interval) => {}
                        changed = shutdown.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                    }
                }
                if *shutdown.borrow() {
                    break;
                }
            }
            tracing::debug!("repair loop stopped");
        })
    }
}

/// Releases a write's resource locks, even if the write is torn down
struct ResourceGuard<S: Service> {
    log: Arc<LogService<S>>,
    op: Option<Operation>,
}

impl<S: Service> ResourceGuard<S> {
    fn new(log: Arc<LogService<S>>, op: Operation) -> Self {
        Self { log, op: Some(op) }
    }

    async fn release(mut self) {
        if let Some(op) = self.op.take() {
            self.log.unlock_resources(&op).await;
        }
    }
}

impl<S: Service> Drop for ResourceGuard<S> {
    fn drop(&mut self) {
        let Some(op) = self.op.take() else {
            return;
        };
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let log = Arc::clone(&self.log);
            handle.spawn(async move { log.unlock_resources(&op).await });
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
