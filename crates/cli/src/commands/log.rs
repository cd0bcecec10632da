// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `pairlog log ...`: the peer-facing log surface

use anyhow::Result;
use clap::Subcommand;
use pairlog_adapters::ApiClient;
use serde_json::Value;

use crate::client::request_failed;
use crate::output::{self, OutputFormat};

#[derive(clap::Args)]
pub struct LogArgs {
    #[command(subcommand)]
    pub command: LogCommand,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum LogCommand {
    /// Show the last committed record
    Committed,
    /// Show the prepared record
    Prepared,
    /// Show record N
    Record { n: u64 },
    /// Commit the prepared record
    Commit,
    /// Discard the prepared record
    Rollback,
    /// Drop old records
    Compact {
        /// Number of recent records to retain
        #[arg(long, default_value_t = 10_000)]
        keep: u64,
    },
}

impl LogCommand {
    /// HTTP method and path for the command
    pub fn route(&self) -> (&'static str, String) {
        match self {
            LogCommand::Committed => ("GET", "/log/commit".to_string()),
            LogCommand::Prepared => ("GET", "/log/prepare".to_string()),
            LogCommand::Record { n } => ("GET", format!("/log/record/{}", n)),
            LogCommand::Commit => ("POST", "/log/commit".to_string()),
            LogCommand::Rollback => ("POST", "/log/rollback".to_string()),
            LogCommand::Compact { keep } => ("POST", format!("/log/compact?keep={}", keep)),
        }
    }
}

pub async fn handle(client: &ApiClient, command: LogCommand, format: OutputFormat) -> Result<()> {
    let (method, path) = command.route();
    let result: Option<Value> = if method == "GET" {
        client.get::<Value>(&path).await
    } else {
        client.post::<(), Value>(&path, None).await
    }
    .map_err(|e| request_failed(client, e))?;

    match result {
        Some(value) => output::print_value(&value, format),
        None => output::print_done(format),
    }
    Ok(())
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
