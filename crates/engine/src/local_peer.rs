// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process peer backed by a [`LogService`]

use crate::log_service::LogService;
use async_trait::async_trait;
use pairlog_adapters::{LogPeer, PeerError};
use pairlog_core::{LogError, LogPayload, Service};
use std::sync::Arc;

/// Drives another replica's log service directly, without HTTP
pub struct LocalPeer<S> {
    log: Arc<LogService<S>>,
}

impl<S> LocalPeer<S> {
    pub fn new(log: Arc<LogService<S>>) -> Self {
        Self { log }
    }

    pub fn log(&self) -> &Arc<LogService<S>> {
        &self.log
    }
}

impl<S> Clone for LocalPeer<S> {
    fn clone(&self) -> Self {
        Self {
            log: Arc::clone(&self.log),
        }
    }
}

fn to_peer_error(e: LogError) -> PeerError {
    if e.is_not_found() {
        PeerError::NotFound(e.message().to_string())
    } else {
        PeerError::Status {
            code: e.status_code(),
            message: e.message().to_string(),
        }
    }
}

#[async_trait]
impl<S: Service> LogPeer for LocalPeer<S> {
    async fn prepared(&self) -> Result<LogPayload, PeerError> {
        self.log.prepared().await.map_err(to_peer_error)
    }

    async fn committed(&self) -> Result<LogPayload, PeerError> {
        self.log.committed().await.map_err(to_peer_error)
    }

    async fn prepare(&self, payload: &LogPayload) -> Result<(), PeerError> {
        self.log.prepare(payload).await.map_err(to_peer_error)
    }

    async fn commit(&self) -> Result<(), PeerError> {
        self.log.commit().await.map(|_| ()).map_err(to_peer_error)
    }

    async fn rollback(&self) -> Result<(), PeerError> {
        self.log.rollback().await.map_err(to_peer_error)
    }

    async fn record(&self, n: u64) -> Result<LogPayload, PeerError> {
        self.log.record(n).await.map_err(to_peer_error)
    }
}

#[cfg(test)]
#[path = "local_peer_tests.rs"]
mod tests;
