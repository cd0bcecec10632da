// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ordered key-value collection with atomic write batches
//!
//! Each [`WriteBatch`] is persisted as one JSON line carrying a sequence number
//! and a CRC32 checksum, then fsync'd before `update` returns. On open the file
//! is replayed up to the first truncated or corrupted line and the tail is cut
//! off, so a crash mid-write loses only the batch that was being written.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
#[cfg(any(test, feature = "test-support"))]
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("collection does not exist: {0}")]
    DoesNotExist(PathBuf),
    #[error("collection already exists: {0}")]
    AlreadyExists(PathBuf),
    #[error("collection refuses writes after a failed batch could not be undone: {0}")]
    Failed(PathBuf),
}

/// One mutation inside a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BatchOp {
    Set { key: String, value: String },
    Delete { key: String },
}

/// Mutations applied together or not at all
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.ops.push(BatchOp::Set {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn delete(&mut self, key: impl Into<String>) -> &mut Self {
        self.ops.push(BatchOp::Delete { key: key.into() });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct BatchLine {
    seq: u64,
    ops: Vec<BatchOp>,
    checksum: u32,
}

impl BatchLine {
    fn new(seq: u64, ops: Vec<BatchOp>) -> Self {
        let checksum = checksum(&ops);
        Self { seq, ops, checksum }
    }

    fn verify(&self) -> bool {
        self.checksum == checksum(&self.ops)
    }
}

fn checksum(ops: &[BatchOp]) -> u32 {
    // BatchOp holds only strings, serialization cannot fail
    let json = serde_json::to_string(ops).unwrap_or_default();
    crc32fast::hash(json.as_bytes())
}

/// Makes upcoming batch writes fail partway through
///
/// Clones share one plan. A failing write leaves half of its line on disk,
/// the way a full disk or a yanked volume would.
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Clone, Default)]
pub struct FaultInjector {
    plan: Arc<Mutex<FaultPlan>>,
}

#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Default)]
struct FaultPlan {
    skip: u32,
    fail: u32,
}

#[cfg(any(test, feature = "test-support"))]
impl FaultInjector {
    /// Let `skip` writes through, then fail the next `count`
    pub fn fail_after(&self, skip: u32, count: u32) {
        let mut plan = self.plan.lock().unwrap_or_else(|e| e.into_inner());
        *plan = FaultPlan { skip, fail: count };
    }

    fn should_fail(&self) -> bool {
        let mut plan = self.plan.lock().unwrap_or_else(|e| e.into_inner());
        if plan.skip > 0 {
            plan.skip -= 1;
            false
        } else if plan.fail > 0 {
            plan.fail -= 1;
            true
        } else {
            false
        }
    }
}

/// File-backed ordered map
pub struct Collection {
    path: PathBuf,
    file: File,
    /// Bytes of intact batches; a failed write is cut back to this
    len: u64,
    /// Set when a failed write could not be cut back
    failed: bool,
    entries: BTreeMap<String, String>,
    seq: u64,
    #[cfg(any(test, feature = "test-support"))]
    faults: FaultInjector,
}

impl Collection {
    /// Create a new, empty collection. Fails if the file already exists.
    pub fn create(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = match OpenOptions::new()
            .create_new(true)
            .append(true)
            .open(path)
        {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(StorageError::AlreadyExists(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        file.sync_all()?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            len: 0,
            failed: false,
            entries: BTreeMap::new(),
            seq: 0,
            #[cfg(any(test, feature = "test-support"))]
            faults: FaultInjector::default(),
        })
    }

    /// Open an existing collection, replaying every intact batch
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let content = match std::fs::read(path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::DoesNotExist(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        let replay = replay(&content);
        if replay.valid_len < content.len() as u64 {
            tracing::warn!(
                path = %path.display(),
                valid_len = replay.valid_len,
                file_len = content.len(),
                "discarding incomplete batch at end of collection"
            );
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(replay.valid_len)?;
            file.sync_all()?;
        }

        let file = OpenOptions::new().append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            len: replay.valid_len,
            failed: false,
            entries: replay.entries,
            seq: replay.last_seq,
            #[cfg(any(test, feature = "test-support"))]
            faults: FaultInjector::default(),
        })
    }

    /// Handle for failing this collection's upcoming writes
    #[cfg(any(test, feature = "test-support"))]
    pub fn faults(&self) -> FaultInjector {
        self.faults.clone()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Durably apply a batch. Nothing is visible until the line is synced.
    ///
    /// A failed write is truncated away so later batches never land behind a
    /// torn line. If even that fails the collection refuses further writes.
    pub fn update(&mut self, batch: WriteBatch) -> Result<(), StorageError> {
        if self.failed {
            return Err(StorageError::Failed(self.path.clone()));
        }
        if batch.is_empty() {
            return Ok(());
        }
        let line = BatchLine::new(self.seq + 1, batch.ops);
        let mut encoded = serde_json::to_string(&line)?;
        encoded.push('\n');

        if let Err(e) = self.write_line(encoded.as_bytes()) {
            if let Err(undo) = self.file.set_len(self.len).and_then(|()| self.file.sync_all()) {
                tracing::error!(
                    path = %self.path.display(),
                    error = %undo,
                    "cannot discard failed batch, refusing further writes"
                );
                self.failed = true;
            }
            return Err(e.into());
        }

        self.len += encoded.len() as u64;
        self.seq = line.seq;
        apply_ops(&mut self.entries, line.ops);
        Ok(())
    }

    fn write_line(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.injected_failure() {
            self.file.write_all(&bytes[..bytes.len() / 2])?;
            return Err(io::Error::other("injected write failure"));
        }
        self.file.write_all(bytes)?;
        self.file.sync_all()
    }

    #[cfg(any(test, feature = "test-support"))]
    fn injected_failure(&self) -> bool {
        self.faults.should_fail()
    }

    #[cfg(not(any(test, feature = "test-support")))]
    fn injected_failure(&self) -> bool {
        false
    }

    /// Entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rewrite the file keeping only entries for which `keep` returns true
    ///
    /// The survivors are written as a single batch to a temporary file that
    /// is then renamed over the original.
    pub fn compact_with<F>(&mut self, keep: F) -> Result<usize, StorageError>
    where
        F: Fn(&str, &str) -> bool,
    {
        let before = self.entries.len();
        let retained: BTreeMap<String, String> = self
            .entries
            .iter()
            .filter(|(k, v)| keep(k, v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let ops = retained
            .iter()
            .map(|(k, v)| BatchOp::Set {
                key: k.clone(),
                value: v.clone(),
            })
            .collect();
        let line = BatchLine::new(self.seq + 1, ops);
        let mut encoded = serde_json::to_string(&line)?;
        encoded.push('\n');

        let tmp_path = self.path.with_extension("compact");
        {
            let mut tmp = File::create(&tmp_path)?;
            tmp.write_all(encoded.as_bytes())?;
            tmp.sync_all()?;
        }
        std::fs::rename(&tmp_path, &self.path)?;
        sync_parent(&self.path);

        self.file = OpenOptions::new().append(true).open(&self.path)?;
        self.len = encoded.len() as u64;
        self.failed = false;
        self.seq = line.seq;
        self.entries = retained;
        Ok(before - self.entries.len())
    }

    /// Remove the backing file
    pub fn destroy(self) -> Result<(), StorageError> {
        let path = self.path;
        drop(self.file);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sequence number of the last persisted batch
    pub fn sequence(&self) -> u64 {
        self.seq
    }
}

struct Replay {
    entries: BTreeMap<String, String>,
    last_seq: u64,
    valid_len: u64,
}

fn replay(content: &[u8]) -> Replay {
    let mut entries = BTreeMap::new();
    let mut last_seq = 0;
    let mut offset = 0usize;

    while offset < content.len() {
        // A line without its newline was never fully written
        let Some(rel_end) = content[offset..].iter().position(|b| *b == b'\n') else {
            break;
        };
        let end = offset + rel_end;
        let raw = &content[offset..end];

        if raw.iter().all(u8::is_ascii_whitespace) {
            offset = end + 1;
            continue;
        }

        let line: BatchLine = match serde_json::from_slice(raw) {
            Ok(l) => l,
            Err(_) => break,
        };
        if !line.verify() || line.seq <= last_seq {
            break;
        }

        last_seq = line.seq;
        apply_ops(&mut entries, line.ops);
        offset = end + 1;
    }

    Replay {
        entries,
        last_seq,
        valid_len: offset as u64,
    }
}

fn apply_ops(entries: &mut BTreeMap<String, String>, ops: Vec<BatchOp>) {
    for op in ops {
        match op {
            BatchOp::Set { key, value } => {
                entries.insert(key, value);
            }
            BatchOp::Delete { key } => {
                entries.remove(&key);
            }
        }
    }
}

fn sync_parent(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }
}

#[cfg(test)]
#[path = "collection_tests.rs"]
mod tests;
