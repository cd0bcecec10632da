// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable commit log with a single prepared slot
//!
//! Records are numbered densely from 1. The collection holds two control keys
//! next to the records: `committed` (always present, `"0"` for an empty log)
//! and `prepared` (present only while a record awaits commit or rollback).
//! Every mutation is one write batch, so a crash never leaves the control
//! keys disagreeing with the records they point at.

use crate::collection::{Collection, StorageError, WriteBatch};
use std::path::{Path, PathBuf};
use thiserror::Error;

const COMMITTED_KEY: &str = "committed";
const PREPARED_KEY: &str = "prepared";

#[derive(Debug, Error)]
pub enum CommitLogError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("record {0} is already prepared")]
    AlreadyPrepared(u64),
    #[error("commit log does not exist: {0}")]
    DoesNotExist(PathBuf),
    #[error("corrupt control key {key}: {value:?}")]
    Corrupt { key: &'static str, value: String },
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for CommitLogError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::DoesNotExist(path) => CommitLogError::DoesNotExist(path),
            other => CommitLogError::Storage(other),
        }
    }
}

impl CommitLogError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CommitLogError::NotFound(_))
    }
}

pub struct CommitLog {
    col: Collection,
}

impl CommitLog {
    /// Create an empty log at `path`
    pub fn create(path: &Path) -> Result<Self, CommitLogError> {
        let mut col = Collection::create(path)?;
        let mut batch = WriteBatch::new();
        batch.set(COMMITTED_KEY, "0");
        col.update(batch)?;
        Ok(Self { col })
    }

    pub fn open(path: &Path) -> Result<Self, CommitLogError> {
        let mut col = Collection::open(path)?;
        // A crash between create and its first batch leaves an empty file
        if col.get(COMMITTED_KEY).is_none() {
            let mut batch = WriteBatch::new();
            batch.set(COMMITTED_KEY, "0");
            col.update(batch)?;
        }
        Ok(Self { col })
    }

    pub fn open_or_create(path: &Path) -> Result<Self, CommitLogError> {
        match Self::open(path) {
            Err(CommitLogError::DoesNotExist(_)) => Self::create(path),
            other => other,
        }
    }

    /// Stage `data` as record `committed + 1`
    pub fn prepare(&mut self, data: &str) -> Result<u64, CommitLogError> {
        if let Some(prepared) = self.prepared_version()? {
            return Err(CommitLogError::AlreadyPrepared(prepared));
        }
        let n = self.committed_version()? + 1;
        let mut batch = WriteBatch::new();
        batch.set(n.to_string(), data).set(PREPARED_KEY, n.to_string());
        self.col.update(batch)?;
        Ok(n)
    }

    /// Drop the prepared marker. The orphaned record is overwritten by the
    /// next prepare.
    pub fn rollback(&mut self) -> Result<(), CommitLogError> {
        if self.prepared_version()?.is_none() {
            return Ok(());
        }
        let mut batch = WriteBatch::new();
        batch.delete(PREPARED_KEY);
        self.col.update(batch)?;
        Ok(())
    }

    /// Promote the prepared record. No-op when nothing is prepared.
    pub fn commit(&mut self) -> Result<(), CommitLogError> {
        let Some(prepared) = self.prepared_version()? else {
            return Ok(());
        };
        let mut batch = WriteBatch::new();
        batch
            .set(COMMITTED_KEY, prepared.to_string())
            .delete(PREPARED_KEY);
        self.col.update(batch)?;
        Ok(())
    }

    pub fn get(&self, n: u64) -> Result<&str, CommitLogError> {
        self.col
            .get(&n.to_string())
            .ok_or_else(|| CommitLogError::NotFound(format!("record {}", n)))
    }

    /// Number of the prepared record
    pub fn prepared(&self) -> Result<u64, CommitLogError> {
        self.prepared_version()?
            .ok_or_else(|| CommitLogError::NotFound("no prepared record".to_string()))
    }

    /// Number of the last committed record; NotFound for an empty log
    pub fn committed(&self) -> Result<u64, CommitLogError> {
        match self.committed_version()? {
            0 => Err(CommitLogError::NotFound("no committed record".to_string())),
            n => Ok(n),
        }
    }

    pub fn committed_version(&self) -> Result<u64, CommitLogError> {
        match self.col.get(COMMITTED_KEY) {
            Some(v) => parse_control(COMMITTED_KEY, v),
            None => Ok(0),
        }
    }

    pub fn prepared_version(&self) -> Result<Option<u64>, CommitLogError> {
        self.col
            .get(PREPARED_KEY)
            .map(|v| parse_control(PREPARED_KEY, v))
            .transpose()
    }

    /// Keep the control keys and the `keep` most recent committed records
    ///
    /// Records numbered `committed - keep` and below are removed. A prepared
    /// record above `committed` is kept. Returns the number of records removed.
    pub fn compact(&mut self, keep: u64) -> Result<usize, CommitLogError> {
        let floor = self.committed_version()?.saturating_sub(keep);
        if floor == 0 {
            return Ok(0);
        }
        let removed = self.col.compact_with(|key, _| match key.parse::<u64>() {
            Ok(n) => n > floor,
            Err(_) => true,
        })?;
        tracing::info!(floor, removed, "compacted commit log");
        Ok(removed)
    }

    /// Remove the backing storage
    pub fn destroy(self) -> Result<(), CommitLogError> {
        self.col.destroy()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        self.col.path()
    }

    /// Handle for failing the log's upcoming writes
    #[cfg(any(test, feature = "test-support"))]
    pub fn faults(&self) -> crate::collection::FaultInjector {
        self.col.faults()
    }
}

fn parse_control(key: &'static str, value: &str) -> Result<u64, CommitLogError> {
    value.parse().map_err(|_| CommitLogError::Corrupt {
        key,
        value: value.to_string(),
    })
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
