// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake peer for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{LogPeer, PeerError};
use async_trait::async_trait;
use pairlog_core::LogPayload;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Recorded peer call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerCall {
    Prepared,
    Committed,
    Prepare(u64),
    Commit,
    Rollback,
    Record(u64),
}

#[derive(Default)]
struct FakeLog {
    records: BTreeMap<u64, LogPayload>,
    committed: u64,
    prepared: Option<u64>,
    calls: Vec<PeerCall>,
    unavailable: bool,
    fail_next: usize,
}

impl FakeLog {
    fn check_available(&mut self) -> Result<(), PeerError> {
        if self.unavailable {
            return Err(PeerError::Transport("connection refused".to_string()));
        }
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(PeerError::Transport("request timed out".to_string()));
        }
        Ok(())
    }
}

/// In-memory peer log with call recording and failure injection
///
/// Enforces the same sequencing rule as a real log: a prepare must carry
/// version `committed + 1` and only one record may be prepared at a time.
#[derive(Clone, Default)]
pub struct FakePeer {
    inner: Arc<Mutex<FakeLog>>,
}

impl FakePeer {
    pub fn new() -> Self {
        Self::default()
    }

    fn log(&self) -> std::sync::MutexGuard<'_, FakeLog> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed committed records `1..=payloads.len()`
    pub fn with_committed(payloads: Vec<LogPayload>) -> Self {
        let peer = Self::new();
        {
            let mut log = peer.log();
            for (i, mut payload) in payloads.into_iter().enumerate() {
                payload.version = i as u64 + 1;
                log.records.insert(payload.version, payload);
            }
            log.committed = log.records.len() as u64;
        }
        peer
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<PeerCall> {
        self.log().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.log().calls.clear();
    }

    /// Fail every call with a transport error until cleared
    pub fn set_unavailable(&self, unavailable: bool) {
        self.log().unavailable = unavailable;
    }

    /// Fail the next `n` calls with a transport error
    pub fn fail_next(&self, n: usize) {
        self.log().fail_next = n;
    }

    /// Stage a record directly, bypassing sequencing checks
    pub fn force_prepared(&self, payload: LogPayload) {
        let mut log = self.log();
        log.prepared = Some(payload.version);
        log.records.insert(payload.version, payload);
    }

    pub fn committed_count(&self) -> u64 {
        self.log().committed
    }

    pub fn prepared_number(&self) -> Option<u64> {
        self.log().prepared
    }

    /// Committed records in order
    pub fn committed_records(&self) -> Vec<LogPayload> {
        let log = self.log();
        log.records
            .range(1..=log.committed)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

#[async_trait]
impl LogPeer for FakePeer {
    async fn prepared(&self) -> Result<LogPayload, PeerError> {
        let mut log = self.log();
        log.calls.push(PeerCall::Prepared);
        log.check_available()?;
        log.prepared
            .and_then(|n| log.records.get(&n).cloned())
            .ok_or_else(|| PeerError::NotFound("nothing prepared".to_string()))
    }

    async fn committed(&self) -> Result<LogPayload, PeerError> {
        let mut log = self.log();
        log.calls.push(PeerCall::Committed);
        log.check_available()?;
        log.records
            .get(&log.committed)
            .cloned()
            .ok_or_else(|| PeerError::NotFound("empty log".to_string()))
    }

    async fn prepare(&self, payload: &LogPayload) -> Result<(), PeerError> {
        let mut log = self.log();
        log.calls.push(PeerCall::Prepare(payload.version));
        log.check_available()?;
        if payload.version != log.committed + 1 {
            return Err(PeerError::Status {
                code: 400,
                message: "preparing invalid version".to_string(),
            });
        }
        if let Some(n) = log.prepared {
            return Err(PeerError::Status {
                code: 500,
                message: format!("record {} is already prepared", n),
            });
        }
        log.prepared = Some(payload.version);
        log.records.insert(payload.version, payload.clone());
        Ok(())
    }

    async fn commit(&self) -> Result<(), PeerError> {
        let mut log = self.log();
        log.calls.push(PeerCall::Commit);
        log.check_available()?;
        if let Some(n) = log.prepared.take() {
            log.committed = n;
        }
        Ok(())
    }

    async fn rollback(&self) -> Result<(), PeerError> {
        let mut log = self.log();
        log.calls.push(PeerCall::Rollback);
        log.check_available()?;
        log.prepared = None;
        Ok(())
    }

    async fn record(&self, n: u64) -> Result<LogPayload, PeerError> {
        let mut log = self.log();
        log.calls.push(PeerCall::Record(n));
        log.check_available()?;
        if n > log.committed {
            return Err(PeerError::Status {
                code: 500,
                message: format!("not found: record {}", n),
            });
        }
        log.records.get(&n).cloned().ok_or_else(|| PeerError::Status {
            code: 500,
            message: format!("not found: record {}", n),
        })
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
