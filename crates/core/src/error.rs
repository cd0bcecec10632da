// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error kinds shared across the log, replication and overlay layers
//!
//! Callers match on [`ErrorKind`] rather than comparing messages. Each kind
//! maps to a default HTTP status; a Service may override the status for the
//! errors it produces.

use std::fmt;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Closed set of failure categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Wrong version on prepare; retry with the right version or ignore-version
    Sequencing,
    /// The Service rejected the operation
    Validation,
    /// No committed/prepared record, or a missing object
    NotFound,
    /// Underlying log or object store failure
    Storage,
    /// Network or timeout while talking to the peer
    PeerUnavailable,
    /// Resource lock refused
    Busy,
    /// Durability wait exceeded
    Timeout,
    /// Local state can no longer be trusted; the process must stop
    Fatal,
    /// Anything else
    Internal,
}

impl ErrorKind {
    /// HTTP status used when the error carries no explicit status
    pub fn default_status(self) -> u16 {
        match self {
            ErrorKind::Sequencing | ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Busy => 503,
            ErrorKind::Timeout => 504,
            ErrorKind::PeerUnavailable => 502,
            ErrorKind::Storage | ErrorKind::Fatal | ErrorKind::Internal => 500,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Sequencing => "sequencing",
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Storage => "storage",
            ErrorKind::PeerUnavailable => "peer_unavailable",
            ErrorKind::Busy => "busy",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Fatal => "fatal",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error carrying a kind, an optional status override and an optional cause
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct LogError {
    kind: ErrorKind,
    status: Option<u16>,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl LogError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
            source: None,
        }
    }

    pub fn sequencing(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Sequencing, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    pub fn peer_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PeerUnavailable, message)
    }

    pub fn busy(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Busy, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fatal, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Override the HTTP status reported for this error
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Attach the underlying cause
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status_code(&self) -> u16 {
        self.status.unwrap_or_else(|| self.kind.default_status())
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
