// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pairlog replication engine
//!
//! Binds a commit log to a Service, replicates writes to a single peer with
//! two-phase commit, and makes Service state durable in an object store.

mod error;
pub mod kv;
#[cfg(any(test, feature = "test-support"))]
mod local_peer;
mod log_service;
mod orchestrator;
mod overlay;

pub use kv::{KvCommand, KvService};
pub use log_service::LogService;
pub use orchestrator::{
    Orchestrator, ReconcileOutcome, ReconcileState, RepairOutcome, ReplicationConfig,
};
pub use overlay::{DurableService, OverlayConfig, SnapshotOutcome};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use local_peer::LocalPeer;
