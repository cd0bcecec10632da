// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pairlog daemon: configuration, HTTP surface and lifecycle

pub mod config;
pub mod lifecycle;
pub mod server;

pub use config::{Args, Config, ConfigError};
pub use lifecycle::{startup, Daemon, LifecycleError};
pub use server::{router, AppState, StatusReport};
