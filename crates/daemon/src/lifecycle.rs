// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, background tasks, shutdown.

use std::fs::File;
use std::future::Future;
use std::io::Write;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use fs2::FileExt;
use pairlog_adapters::{FileObjectStore, HttpLogPeer, PeerError, TracedObjectStore, TracedPeer};
use pairlog_core::{LogError, SystemClock};
use pairlog_engine::{DurableService, KvService, LogService, Orchestrator, SnapshotOutcome};
use pairlog_storage::{CommitLog, CommitLogError};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::server::{self, AppState};

/// Object store with tracing
pub type DaemonStore = TracedObjectStore<FileObjectStore>;
/// Reference service made durable in the object store
pub type DaemonService = DurableService<KvService, DaemonStore, SystemClock>;
pub type DaemonLog = LogService<DaemonService>;
pub type DaemonPeer = TracedPeer<HttpLogPeer>;
pub type DaemonOrchestrator = Orchestrator<DaemonService, DaemonPeer>;

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind {0}: {1}")]
    BindFailed(SocketAddr, std::io::Error),

    #[error("Commit log error: {0}")]
    CommitLog(#[from] CommitLogError),

    #[error("Peer error: {0}")]
    Peer(#[from] PeerError),

    #[error("{0}")]
    Log(#[from] LogError),

    #[error("Shut down after a fatal write failure")]
    Fatal,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A started daemon, ready to serve
pub struct Daemon {
    config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    lock_file: File,
    listener: TcpListener,
    orchestrator: Arc<DaemonOrchestrator>,
    fatal_tx: Arc<watch::Sender<bool>>,
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<Daemon, LifecycleError> {
    std::fs::create_dir_all(&config.data_dir)?;
    let lock_file = acquire_lock(&config.lock_path())?;

    match startup_inner(config).await {
        Ok((listener, orchestrator)) => {
            let (fatal_tx, _) = watch::channel(false);
            Ok(Daemon {
                config: config.clone(),
                lock_file,
                listener,
                orchestrator,
                fatal_tx: Arc::new(fatal_tx),
            })
        }
        Err(e) => {
            // Only reached while holding the lock, so the pid file is ours
            let _ = std::fs::remove_file(config.lock_path());
            Err(e)
        }
    }
}

fn acquire_lock(path: &Path) -> Result<File, LifecycleError> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)?;
    file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;
    file.set_len(0)?;
    writeln!(file, "{}", std::process::id())?;
    Ok(file)
}

async fn startup_inner(
    config: &Config,
) -> Result<(TcpListener, Arc<DaemonOrchestrator>), LifecycleError> {
    let start = Instant::now();

    // 1. Commit log
    let log_file = config.log_file();
    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let log = CommitLog::open_or_create(&log_file)?;

    // 2. Service state from the object store
    let object_root = config.object_root();
    std::fs::create_dir_all(&object_root)?;
    let store = TracedObjectStore::new(FileObjectStore::new(object_root));
    let overlay = DurableService::new(
        Arc::new(KvService::new()),
        store,
        config.object_prefix.clone(),
        SystemClock,
        config.overlay(),
    )
    .await?;
    let recovered = overlay.recover().await?;

    // 3. Committed records the object store has not seen yet
    let log = Arc::new(LogService::new(log, Arc::new(overlay)));
    let replayed = log.replay_into_service().await?;
    let overlay = log.service();
    if overlay.snapshot_version() == 0 && overlay.current_version() > 0 {
        if let SnapshotOutcome::Taken(version) = overlay.snapshot().await? {
            info!(version, "took initial snapshot");
        }
    }
    info!(
        recovered,
        replayed,
        committed = log.committed_version().await?,
        "Loaded state"
    );

    // 4. Peer
    let peer = match &config.peer {
        Some(base) => {
            let client = HttpLogPeer::new(base, config.token.as_deref(), config.peer_client())?;
            Some(TracedPeer::new(client, base.clone()))
        }
        None => None,
    };
    let orchestrator = Arc::new(Orchestrator::new(log, peer, config.replication()));
    let outcome = orchestrator.reconcile().await?;
    info!(
        state = ?outcome.state,
        replayed = outcome.replayed,
        "Reconciled with peer"
    );

    // 5. Bind last, once state is consistent
    let listener = TcpListener::bind(config.listen)
        .await
        .map_err(|e| LifecycleError::BindFailed(config.listen, e))?;

    info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Daemon started"
    );
    Ok((listener, orchestrator))
}

impl Daemon {
    pub fn local_addr(&self) -> Result<SocketAddr, LifecycleError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn orchestrator(&self) -> &Arc<DaemonOrchestrator> {
        &self.orchestrator
    }

    pub fn router(&self) -> Router {
        server::router(AppState::new(
            Arc::clone(&self.orchestrator),
            self.config.token.clone(),
            Arc::clone(&self.fatal_tx),
        ))
    }

    /// Serve until `shutdown` resolves or a write fails fatally
    ///
    /// Background tasks are stopped and a final flush is attempted on a
    /// graceful shutdown. A fatal shutdown returns [`LifecycleError::Fatal`].
    pub async fn run<F>(self, shutdown: F) -> Result<(), LifecycleError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let Daemon {
            config,
            lock_file,
            listener,
            orchestrator,
            fatal_tx,
        } = self;
        let overlay = Arc::clone(orchestrator.log().service());

        let (stop_tx, stop_rx) = watch::channel(false);
        let tasks = vec![
            orchestrator.spawn_repair_loop(stop_rx.clone()),
            spawn_flush_ticker(Arc::clone(&overlay), config.flush_interval, stop_rx.clone()),
            spawn_snapshot_ticker(Arc::clone(&overlay), config.snapshot_interval, stop_rx),
        ];

        let mut fatal_rx = fatal_tx.subscribe();
        let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
            tokio::select! {
                _ = shutdown => info!("Shutdown requested"),
                Ok(_) = fatal_rx.wait_for(|fatal| *fatal) => {
                    error!("Fatal write failure, stopping");
                }
            }
        });
        let served = serve.await;
        let fatal = *fatal_tx.borrow();

        stop_tx.send_replace(true);
        for task in tasks {
            if let Err(e) = task.await {
                warn!("Background task ended abnormally: {}", e);
            }
        }

        if !fatal {
            match overlay.flush().await {
                Ok(count) => info!(count, "Final flush complete"),
                Err(e) => warn!(error = %e, "Final flush failed"),
            }
        }

        if let Err(e) = std::fs::remove_file(config.lock_path()) {
            warn!("Failed to remove PID file: {}", e);
        }
        drop(lock_file);

        served?;
        if fatal {
            return Err(LifecycleError::Fatal);
        }
        info!("Daemon shutdown complete");
        Ok(())
    }
}

fn spawn_flush_ticker(
    overlay: Arc<DaemonService>,
    every: Duration,
    mut stop: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let start = Instant::now();
                    match overlay.flush().await {
                        Ok(0) => {}
                        Ok(count) => info!(
                            count,
                            elapsed_ms = start.elapsed().as_millis() as u64,
                            "Flushed"
                        ),
                        Err(e) => warn!(error = %e, "Flush failed"),
                    }
                }
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }
    })
}

fn spawn_snapshot_ticker(
    overlay: Arc<DaemonService>,
    every: Duration,
    mut stop: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let start = Instant::now();
                    match overlay.snapshot().await {
                        Ok(SnapshotOutcome::Taken(version)) => info!(
                            version,
                            elapsed_ms = start.elapsed().as_millis() as u64,
                            "Snapshot taken"
                        ),
                        Ok(SnapshotOutcome::Skipped(_)) => {}
                        Err(e) => warn!(error = %e, "Snapshot failed"),
                    }
                }
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }
    })
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
