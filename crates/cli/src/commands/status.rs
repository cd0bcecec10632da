// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `pairlog status`

use anyhow::Result;
use pairlog_adapters::ApiClient;
use serde_json::Value;

use crate::client::request_failed;
use crate::output::{self, OutputFormat};

pub async fn handle(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let status: Option<Value> = client
        .get("/status")
        .await
        .map_err(|e| request_failed(client, e))?;
    output::print_value(&status.unwrap_or(Value::Null), format);
    Ok(())
}
