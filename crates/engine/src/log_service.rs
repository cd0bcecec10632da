// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log service: the commit log bound to a Service
//!
//! Prepares are checked for sequencing and validated by the Service before
//! they reach disk. Commits apply the committed record to the Service.

use crate::error::{from_json, from_log, from_record_lookup};
use pairlog_core::{ErrorKind, LogError, LogPayload, Operation, Service};
use pairlog_storage::{CommitLog, CommitLogError};
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct LogService<S> {
    log: RwLock<CommitLog>,
    service: Arc<S>,
}

impl<S: Service> LogService<S> {
    pub fn new(log: CommitLog, service: Arc<S>) -> Self {
        Self {
            log: RwLock::new(log),
            service,
        }
    }

    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    /// Stage `payload` as the next record
    pub async fn prepare(&self, payload: &LogPayload) -> Result<(), LogError> {
        let mut log = self.log.write().await;

        let committed = log.committed_version().map_err(from_log)?;
        if payload.version != committed + 1 {
            return Err(LogError::sequencing(format!(
                "preparing invalid version {} (committed {})",
                payload.version, committed
            )));
        }

        if let Err(e) = self.service.validate(&payload.op).await {
            let status = e.status;
            let mut err = LogError::validation(format!("invalid operation: {}", e.message));
            if let Some(status) = status {
                err = err.with_status(status);
            }
            return Err(err.with_source(e));
        }

        let record = payload
            .op
            .to_record()
            .map_err(|e| from_json("encode operation", e))?;
        match log.prepare(&record) {
            Ok(n) => {
                tracing::debug!(record = n, method = %payload.op.method, "prepared");
                Ok(())
            }
            Err(CommitLogError::AlreadyPrepared(n)) => Err(LogError::storage(format!(
                "record {} is already prepared",
                n
            ))),
            Err(e) => Err(from_log(e)),
        }
    }

    /// Commit the prepared record and apply the committed record to the
    /// Service. Returns the committed version.
    ///
    /// An apply failure is returned after the log commit has already stood.
    pub async fn commit(&self) -> Result<u64, LogError> {
        let mut log = self.log.write().await;
        log.commit().map_err(from_log)?;

        let committed = log.committed_version().map_err(from_log)?;
        if committed == 0 {
            return Ok(0);
        }
        let op = decode(log.get(committed).map_err(from_record_lookup)?)?;

        // Applied under the write lock so the Service sees records in order
        self.service
            .apply(committed, &op)
            .await
            .map_err(|e| e.into_log_error(ErrorKind::Internal))?;
        tracing::debug!(record = committed, method = %op.method, "committed");
        Ok(committed)
    }

    pub async fn rollback(&self) -> Result<(), LogError> {
        self.log.write().await.rollback().map_err(from_log)
    }

    /// Committed or prepared record `n`
    pub async fn record(&self, n: u64) -> Result<LogPayload, LogError> {
        let log = self.log.read().await;
        let op = decode(log.get(n).map_err(from_record_lookup)?)?;
        Ok(LogPayload::new(n, op))
    }

    pub async fn prepared(&self) -> Result<LogPayload, LogError> {
        let log = self.log.read().await;
        let n = log.prepared().map_err(from_log)?;
        let op = decode(log.get(n).map_err(from_record_lookup)?)?;
        Ok(LogPayload::new(n, op))
    }

    /// Last committed payload; NotFound for an empty log
    pub async fn committed(&self) -> Result<LogPayload, LogError> {
        let log = self.log.read().await;
        let n = log.committed().map_err(from_log)?;
        let op = decode(log.get(n).map_err(from_record_lookup)?)?;
        Ok(LogPayload::new(n, op))
    }

    pub async fn committed_version(&self) -> Result<u64, LogError> {
        self.log.read().await.committed_version().map_err(from_log)
    }

    pub async fn prepared_version(&self) -> Result<Option<u64>, LogError> {
        self.log.read().await.prepared_version().map_err(from_log)
    }

    /// Drop all but the `keep` most recent committed records
    ///
    /// Refused when it would discard a record the Service has not yet made
    /// durable on its own.
    pub async fn compact(&self, keep: u64) -> Result<usize, LogError> {
        let mut log = self.log.write().await;
        let committed = log.committed_version().map_err(from_log)?;
        let floor = committed.saturating_sub(keep);

        let durable = self
            .service
            .durable_version()
            .await
            .map_err(|e| e.into_log_error(ErrorKind::Internal))?;
        if floor > durable {
            return Err(LogError::validation(format!(
                "compaction would discard records up to {} but the service is only durable to {}",
                floor, durable
            )));
        }

        log.compact(keep).map_err(from_log)
    }

    pub async fn lock_resources(&self, op: &Operation) -> Result<(), LogError> {
        if self.service.lock_resources(op).await {
            Ok(())
        } else {
            Err(LogError::busy("resources are locked"))
        }
    }

    pub async fn unlock_resources(&self, op: &Operation) {
        self.service.unlock_resources(op).await;
    }

    /// Apply committed records the Service has not seen yet, in order
    ///
    /// Returns the number of records applied.
    pub async fn replay_into_service(&self) -> Result<u64, LogError> {
        let log = self.log.read().await;
        let committed = log.committed_version().map_err(from_log)?;
        let current = self
            .service
            .version()
            .await
            .map_err(|e| e.into_log_error(ErrorKind::Internal))?;

        let mut applied = 0;
        for n in current + 1..=committed {
            let data = log.get(n).map_err(|e| match e {
                CommitLogError::NotFound(_) => LogError::storage(format!(
                    "record {} was compacted before the service made it durable",
                    n
                )),
                other => from_log(other),
            })?;
            let op = decode(data)?;
            self.service
                .apply(n, &op)
                .await
                .map_err(|e| e.into_log_error(ErrorKind::Internal))?;
            applied += 1;
        }
        if applied > 0 {
            tracing::info!(from = current + 1, to = committed, "replayed log into service");
        }
        Ok(applied)
    }
}

fn decode(record: &str) -> Result<Operation, LogError> {
    Operation::from_record(record).map_err(|e| from_json("decode record", e))
}

#[cfg(test)]
#[path = "log_service_tests.rs"]
mod tests;
