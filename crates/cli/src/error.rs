// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-friendly error display with context and suggestions.

use std::fmt;

use pairlog_adapters::ClientError;

/// Error with context and recovery suggestions for user-friendly display.
#[derive(Debug)]
pub struct CliError {
    /// What went wrong
    pub message: String,
    /// Why it might have happened
    pub context: Vec<String>,
    /// How to fix it
    pub suggestions: Vec<String>,
    pub source: Option<ClientError>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: Vec::new(),
            suggestions: Vec::new(),
            source: None,
        }
    }

    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Explain a failed request to `server`
    pub fn from_client(err: ClientError, server: &str) -> Self {
        let base = match &err {
            ClientError::Status { code: 401, .. } => CliError::new("request rejected: invalid token")
                .with_suggestion("Pass --token or set PAIRLOG_TOKEN"),
            ClientError::Status { code: 503, message } => CliError::new(message.clone())
                .with_context("Another write holds the same resources")
                .with_suggestion("Retry the command"),
            ClientError::Status { code: 502, message } => CliError::new(message.clone())
                .with_context("The peer replica could not be reached")
                .with_suggestion("Check the peer with: pairlog --server <peer> status"),
            ClientError::Status { code, message } => {
                CliError::new(message.clone()).with_context(format!("server returned {}", code))
            }
            ClientError::Transport(msg) => CliError::new(format!("cannot reach {}", server))
                .with_context(msg.clone())
                .with_suggestion("Check that pairlogd is running")
                .with_suggestion("Pass --server or set PAIRLOG_SERVER"),
            ClientError::Decode(msg) => CliError::new("unexpected response from server")
                .with_context(msg.clone()),
        };
        CliError {
            source: Some(err),
            ..base
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "error: {}", self.message)?;

        if !self.context.is_empty() {
            writeln!(f)?;
            for ctx in &self.context {
                writeln!(f, "  -> {}", ctx)?;
            }
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            writeln!(f, "suggestions:")?;
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                writeln!(f, "  {}. {}", i + 1, suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}
