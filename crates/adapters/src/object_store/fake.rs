// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake object store for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ObjectStore, ObjectStoreError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Recorded object store call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectCall {
    Get(String),
    Put(String),
    Delete(String),
    CreateDirectory(String),
}

#[derive(Default)]
struct FakeState {
    objects: BTreeMap<String, Vec<u8>>,
    calls: Vec<ObjectCall>,
    fail_puts: bool,
    fail_gets: bool,
}

/// In-memory object store with call recording and failure injection
#[derive(Clone, Default)]
pub struct FakeObjectStore {
    inner: Arc<Mutex<FakeState>>,
}

impl FakeObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<ObjectCall> {
        self.state().calls.clone()
    }

    /// Names of stored objects in order
    pub fn names(&self) -> Vec<String> {
        self.state().objects.keys().cloned().collect()
    }

    pub fn object(&self, name: &str) -> Option<Vec<u8>> {
        self.state().objects.get(name).cloned()
    }

    /// Store an object without recording a call
    pub fn insert(&self, name: &str, bytes: impl Into<Vec<u8>>) {
        self.state().objects.insert(name.to_string(), bytes.into());
    }

    /// Make every put fail until cleared
    pub fn set_fail_puts(&self, fail: bool) {
        self.state().fail_puts = fail;
    }

    /// Make every get fail with a backend error until cleared
    pub fn set_fail_gets(&self, fail: bool) {
        self.state().fail_gets = fail;
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn get_object(&self, name: &str) -> Result<Vec<u8>, ObjectStoreError> {
        let mut state = self.state();
        state.calls.push(ObjectCall::Get(name.to_string()));
        if state.fail_gets {
            return Err(ObjectStoreError::Backend("injected get failure".to_string()));
        }
        state
            .objects
            .get(name)
            .cloned()
            .ok_or_else(|| ObjectStoreError::NotFound(name.to_string()))
    }

    async fn put_object(&self, name: &str, bytes: Vec<u8>) -> Result<(), ObjectStoreError> {
        let mut state = self.state();
        state.calls.push(ObjectCall::Put(name.to_string()));
        if state.fail_puts {
            return Err(ObjectStoreError::Backend("injected put failure".to_string()));
        }
        state.objects.insert(name.to_string(), bytes);
        Ok(())
    }

    async fn delete_object(&self, name: &str) -> Result<(), ObjectStoreError> {
        let mut state = self.state();
        state.calls.push(ObjectCall::Delete(name.to_string()));
        match state.objects.remove(name) {
            Some(_) => Ok(()),
            None => Err(ObjectStoreError::NotFound(name.to_string())),
        }
    }

    async fn create_directory(&self, path: &str) -> Result<(), ObjectStoreError> {
        self.state()
            .calls
            .push(ObjectCall::CreateDirectory(path.to_string()));
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
