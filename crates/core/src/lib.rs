// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pairlog-core: shared types for the replicated commit log
//!
//! This crate provides:
//! - The `Operation` / `LogPayload` wire types and the response envelope
//! - The `Service` contract that applications implement
//! - The closed error-kind enumeration used across every layer
//! - A clock abstraction for time-based decisions

pub mod clock;
pub mod envelope;
pub mod error;
pub mod operation;
pub mod service;

pub use clock::{Clock, FakeClock, SystemClock};
pub use envelope::Envelope;
pub use error::{ErrorKind, LogError};
pub use operation::{LogPayload, Operation};
pub use service::{Service, ServiceError, SnapshotData};
