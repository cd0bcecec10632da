// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pairlog-storage: durable commit log on an ordered key-value collection

pub mod collection;
pub mod log;

pub use collection::{BatchOp, Collection, StorageError, WriteBatch};
#[cfg(any(test, feature = "test-support"))]
pub use collection::FaultInjector;
pub use log::{CommitLog, CommitLogError};
