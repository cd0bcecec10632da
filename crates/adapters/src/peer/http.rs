// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Peer reached over HTTP

use super::{LogPeer, PeerError};
use crate::client::{ApiClient, ClientConfig, ClientError};
use async_trait::async_trait;
use pairlog_core::LogPayload;

/// Peer log surface at a base URI such as `http://host:4001/log`
#[derive(Clone, Debug)]
pub struct HttpLogPeer {
    client: ApiClient,
}

impl HttpLogPeer {
    pub fn new(base: &str, token: Option<&str>, config: ClientConfig) -> Result<Self, PeerError> {
        Ok(Self {
            client: ApiClient::new(base, token, config)?,
        })
    }

    pub fn base(&self) -> &str {
        self.client.base()
    }

    async fn fetch(&self, path: &str) -> Result<LogPayload, PeerError> {
        match self.client.get::<LogPayload>(path).await {
            Ok(Some(payload)) => Ok(payload),
            Ok(None) => Err(PeerError::Decode(format!("{}: empty response", path))),
            Err(ClientError::Status { code: 404, message }) => Err(PeerError::NotFound(message)),
            Err(e) => Err(e.into()),
        }
    }

    async fn post(&self, path: &str, payload: Option<&LogPayload>) -> Result<(), PeerError> {
        self.client
            .post::<LogPayload, serde_json::Value>(path, payload)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl LogPeer for HttpLogPeer {
    async fn prepared(&self) -> Result<LogPayload, PeerError> {
        self.fetch("/prepare").await
    }

    async fn committed(&self) -> Result<LogPayload, PeerError> {
        self.fetch("/commit").await
    }

    async fn prepare(&self, payload: &LogPayload) -> Result<(), PeerError> {
        self.post("/prepare", Some(payload)).await
    }

    async fn commit(&self) -> Result<(), PeerError> {
        self.post("/commit", None).await
    }

    async fn rollback(&self) -> Result<(), PeerError> {
        self.post("/rollback", None).await
    }

    async fn record(&self, n: u64) -> Result<LogPayload, PeerError> {
        self.fetch(&format!("/record/{}", n)).await
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
