// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon connection for CLI commands

use std::time::Duration;

use pairlog_adapters::{ApiClient, ClientConfig, ClientError};

use crate::error::CliError;

/// Writes wait on peer retries and durability, so allow more than a peer call
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

pub fn connect(server: &str, token: Option<&str>) -> Result<ApiClient, CliError> {
    let config = ClientConfig {
        connect_timeout: CONNECT_TIMEOUT,
        timeout: REQUEST_TIMEOUT,
    };
    ApiClient::new(server, token, config).map_err(|e| CliError::from_client(e, server))
}

/// Map a failed request into a CLI error naming the server
pub fn request_failed(client: &ApiClient, err: ClientError) -> CliError {
    CliError::from_client(err, client.base())
}
