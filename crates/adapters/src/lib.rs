// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for external I/O: object stores and the peer replica

pub mod client;
pub mod object_store;
pub mod peer;
pub mod traced;

pub use client::{ApiClient, ClientConfig, ClientError, API_KEY_HEADER};
pub use object_store::{FileObjectStore, ObjectStore, ObjectStoreError};
pub use peer::{HttpLogPeer, LogPeer, PeerError};
pub use traced::{TracedObjectStore, TracedPeer};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use object_store::{FakeObjectStore, ObjectCall};
#[cfg(any(test, feature = "test-support"))]
pub use peer::{FakePeer, PeerCall};
