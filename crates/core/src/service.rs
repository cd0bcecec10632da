// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The replicated state machine contract
//!
//! A Service owns the application state that committed operations mutate.
//! The log layer only sees it through this trait.

use crate::error::{ErrorKind, LogError};
use crate::operation::Operation;
use async_trait::async_trait;
use thiserror::Error;

/// Rejection or failure reported by a Service
///
/// `status` is the HTTP status the Service prefers for this error, if any.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ServiceError {
    pub message: String,
    pub status: Option<u16>,
}

impl ServiceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Wrap as a [`LogError`] of the given kind, keeping the preferred status
    pub fn into_log_error(self, kind: ErrorKind) -> LogError {
        let mut err = LogError::new(kind, self.message.clone());
        if let Some(status) = self.status {
            err = err.with_status(status);
        }
        err.with_source(self)
    }
}

/// Serialized service state at a version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotData {
    pub version: u64,
    pub bytes: Vec<u8>,
}

impl SnapshotData {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Highest version applied
    async fn version(&self) -> Result<u64, ServiceError>;

    async fn validate(&self, op: &Operation) -> Result<(), ServiceError>;

    /// Apply `op` as `version`. Versions at or below the current one are
    /// ignored, so replaying the same record twice is safe.
    async fn apply(&self, version: u64, op: &Operation) -> Result<(), ServiceError>;

    /// Returns false when another in-flight write holds a resource `op` needs
    async fn lock_resources(&self, op: &Operation) -> bool;

    async fn unlock_resources(&self, op: &Operation);

    async fn snapshot(&self) -> Result<SnapshotData, ServiceError>;

    async fn restore(&self, version: u64, bytes: &[u8]) -> Result<(), ServiceError>;

    /// Highest version that survives a restart without the commit log
    async fn durable_version(&self) -> Result<u64, ServiceError> {
        self.version().await
    }
}

#[async_trait]
impl<T: Service + ?Sized> Service for std::sync::Arc<T> {
    async fn version(&self) -> Result<u64, ServiceError> {
        (**self).version().await
    }

    async fn validate(&self, op: &Operation) -> Result<(), ServiceError> {
        (**self).validate(op).await
    }

    async fn apply(&self, version: u64, op: &Operation) -> Result<(), ServiceError> {
        (**self).apply(version, op).await
    }

    async fn lock_resources(&self, op: &Operation) -> bool {
        (**self).lock_resources(op).await
    }

    async fn unlock_resources(&self, op: &Operation) {
        (**self).unlock_resources(op).await
    }

    async fn snapshot(&self) -> Result<SnapshotData, ServiceError> {
        (**self).snapshot().await
    }

    async fn restore(&self, version: u64, bytes: &[u8]) -> Result<(), ServiceError> {
        (**self).restore(version, bytes).await
    }

    async fn durable_version(&self) -> Result<u64, ServiceError> {
        (**self).durable_version().await
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
