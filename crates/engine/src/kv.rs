// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory key-value Service
//!
//! Understands two methods: `set` with `{"key", "value"}` and `delete` with
//! `{"key"}`. Each write locks its key for the duration of the replicated
//! write.

use async_trait::async_trait;
use pairlog_core::{Operation, Service, ServiceError, SnapshotData};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

pub const SET: &str = "set";
pub const DELETE: &str = "delete";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvCommand {
    Set { key: String, value: String },
    Delete { key: String },
}

#[derive(Serialize, Deserialize)]
struct SetData {
    key: String,
    value: String,
}

#[derive(Serialize, Deserialize)]
struct DeleteData {
    key: String,
}

impl KvCommand {
    pub fn parse(op: &Operation) -> Result<Self, ServiceError> {
        let invalid = |e: serde_json::Error| {
            ServiceError::new(format!("invalid {} payload: {}", op.method, e)).with_status(400)
        };
        match op.method.as_str() {
            SET => {
                let d: SetData = serde_json::from_slice(&op.data).map_err(invalid)?;
                Ok(KvCommand::Set {
                    key: d.key,
                    value: d.value,
                })
            }
            DELETE => {
                let d: DeleteData = serde_json::from_slice(&op.data).map_err(invalid)?;
                Ok(KvCommand::Delete { key: d.key })
            }
            other => Err(ServiceError::new(format!("unknown method: {}", other)).with_status(400)),
        }
    }

    pub fn key(&self) -> &str {
        match self {
            KvCommand::Set { key, .. } | KvCommand::Delete { key } => key,
        }
    }
}

/// Build a `set` operation
pub fn set_op(key: &str, value: &str) -> Operation {
    let data = serde_json::json!({ "key": key, "value": value });
    Operation::new(SET, data.to_string())
}

/// Build a `delete` operation
pub fn delete_op(key: &str) -> Operation {
    let data = serde_json::json!({ "key": key });
    Operation::new(DELETE, data.to_string())
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct KvState {
    version: u64,
    entries: BTreeMap<String, String>,
}

#[derive(Default)]
pub struct KvService {
    state: Mutex<KvState>,
    locked: Mutex<HashSet<String>>,
}

impl KvService {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, KvState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.state().entries.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().entries.is_empty()
    }

    /// All entries in key order
    pub fn entries(&self) -> BTreeMap<String, String> {
        self.state().entries.clone()
    }

    pub fn current_version(&self) -> u64 {
        self.state().version
    }
}

#[async_trait]
impl Service for KvService {
    async fn version(&self) -> Result<u64, ServiceError> {
        Ok(self.state().version)
    }

    async fn validate(&self, op: &Operation) -> Result<(), ServiceError> {
        match KvCommand::parse(op)? {
            KvCommand::Delete { key } if !self.state().entries.contains_key(&key) => {
                Err(ServiceError::new(format!("key not found: {}", key)).with_status(404))
            }
            _ => Ok(()),
        }
    }

    async fn apply(&self, version: u64, op: &Operation) -> Result<(), ServiceError> {
        let mut state = self.state();
        if version <= state.version {
            return Ok(());
        }
        match KvCommand::parse(op)? {
            KvCommand::Set { key, value } => {
                state.entries.insert(key, value);
            }
            KvCommand::Delete { key } => {
                state.entries.remove(&key);
            }
        }
        state.version = version;
        Ok(())
    }

    async fn lock_resources(&self, op: &Operation) -> bool {
        // Unparseable operations hold no resources; validation rejects them
        let Ok(cmd) = KvCommand::parse(op) else {
            return true;
        };
        self.locked
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(cmd.key().to_string())
    }

    async fn unlock_resources(&self, op: &Operation) {
        if let Ok(cmd) = KvCommand::parse(op) {
            self.locked
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(cmd.key());
        }
    }

    async fn snapshot(&self) -> Result<SnapshotData, ServiceError> {
        let state = self.state().clone();
        let bytes = serde_json::to_vec(&state)
            .map_err(|e| ServiceError::new(format!("encode snapshot: {}", e)))?;
        Ok(SnapshotData {
            version: state.version,
            bytes,
        })
    }

    async fn restore(&self, version: u64, bytes: &[u8]) -> Result<(), ServiceError> {
        let mut restored: KvState = serde_json::from_slice(bytes)
            .map_err(|e| ServiceError::new(format!("decode snapshot: {}", e)))?;
        restored.version = version;
        *self.state() = restored;
        Ok(())
    }
}

#[cfg(test)]
#[path = "kv_tests.rs"]
mod tests;
