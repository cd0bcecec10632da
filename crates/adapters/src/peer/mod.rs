// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Peer log adapters
//!
//! A peer is the second replica's log surface. The orchestrator drives it
//! through [`LogPeer`] during writes, startup reconciliation and repair.

mod http;

pub use http::HttpLogPeer;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakePeer, PeerCall};

use crate::client::ClientError;
use async_trait::async_trait;
use pairlog_core::LogPayload;
use thiserror::Error;

/// Errors from peer operations
#[derive(Debug, Error)]
pub enum PeerError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("peer returned {code}: {message}")]
    Status { code: u16, message: String },
    #[error("peer unreachable: {0}")]
    Transport(String),
    #[error("invalid peer response: {0}")]
    Decode(String),
}

impl PeerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, PeerError::NotFound(_))
    }
}

impl From<ClientError> for PeerError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Status { code, message } => PeerError::Status { code, message },
            ClientError::Transport(msg) => PeerError::Transport(msg),
            ClientError::Decode(msg) => PeerError::Decode(msg),
        }
    }
}

/// Remote replica's commit log
#[async_trait]
pub trait LogPeer: Send + Sync + 'static {
    /// The prepared payload; NotFound when nothing is prepared
    async fn prepared(&self) -> Result<LogPayload, PeerError>;

    /// The last committed payload; NotFound for an empty log
    async fn committed(&self) -> Result<LogPayload, PeerError>;

    async fn prepare(&self, payload: &LogPayload) -> Result<(), PeerError>;

    async fn commit(&self) -> Result<(), PeerError>;

    async fn rollback(&self) -> Result<(), PeerError>;

    async fn record(&self, n: u64) -> Result<LogPayload, PeerError>;

    /// Committed version, 0 for an empty log
    async fn committed_version(&self) -> Result<u64, PeerError> {
        match self.committed().await {
            Ok(payload) => Ok(payload.version),
            Err(e) if e.is_not_found() => Ok(0),
            Err(e) => Err(e),
        }
    }

    /// Prepared version, if any
    async fn prepared_version(&self) -> Result<Option<u64>, PeerError> {
        match self.prepared().await {
            Ok(payload) => Ok(Some(payload.version)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
