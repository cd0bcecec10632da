// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Object store adapters for segments and snapshots

mod fs;

pub use fs::FileObjectStore;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeObjectStore, ObjectCall};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from object store operations
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("invalid object name: {0}")]
    InvalidName(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("backend error: {0}")]
    Backend(String),
}

impl ObjectStoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ObjectStoreError::NotFound(_))
    }
}

/// Named blob storage with `/`-separated names
#[async_trait]
pub trait ObjectStore: Clone + Send + Sync + 'static {
    async fn get_object(&self, name: &str) -> Result<Vec<u8>, ObjectStoreError>;

    async fn put_object(&self, name: &str, bytes: Vec<u8>) -> Result<(), ObjectStoreError>;

    async fn delete_object(&self, name: &str) -> Result<(), ObjectStoreError>;

    /// Prepare a name prefix for writes; stores without directories ignore it
    async fn create_directory(&self, _path: &str) -> Result<(), ObjectStoreError> {
        Ok(())
    }
}
