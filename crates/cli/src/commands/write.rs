// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `pairlog do`: submit one operation

use anyhow::Result;
use pairlog_adapters::ApiClient;
use pairlog_core::{LogPayload, Operation};
use serde_json::Value;

use crate::client::request_failed;
use crate::output::{self, OutputFormat};

#[derive(clap::Args)]
pub struct DoArgs {
    /// Operation method, e.g. `set`
    pub method: String,

    /// Operation data, sent as-is
    pub data: String,

    /// Require this exact version instead of the next free one
    #[arg(long)]
    pub version: Option<u64>,
}

impl DoArgs {
    pub fn payload(&self) -> LogPayload {
        LogPayload::new(
            self.version.unwrap_or(0),
            Operation::new(self.method.as_str(), self.data.as_bytes()),
        )
    }

    pub fn path(&self) -> String {
        format!("/do?ignore-version={}", self.version.is_none())
    }
}

pub async fn handle(client: &ApiClient, args: DoArgs, format: OutputFormat) -> Result<()> {
    let result: Option<Value> = client
        .post(&args.path(), Some(&args.payload()))
        .await
        .map_err(|e| request_failed(client, e))?;
    output::print_value(&result.unwrap_or(Value::Null), format);
    Ok(())
}

#[cfg(test)]
#[path = "write_tests.rs"]
mod tests;
