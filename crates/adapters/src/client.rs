// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the pairlog envelope protocol
//!
//! Every response body is an [`Envelope`]. A non-2xx status becomes
//! [`ClientError::Status`] carrying the server's error message.

use pairlog_core::Envelope;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

pub const API_KEY_HEADER: &str = "X-Api-Key";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{code}: {message}")]
    Status { code: u16, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("decode error: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Timeouts applied to every request
#[derive(Debug, Clone, Copy)]
pub struct ClientConfig {
    pub connect_timeout: Duration,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(3),
            timeout: Duration::from_secs(1),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base: String,
}

impl ApiClient {
    /// Build a client for `base` (e.g. `http://host:4000`), sending `token`
    /// as the API key when present
    pub fn new(
        base: impl Into<String>,
        token: Option<&str>,
        config: ClientConfig,
    ) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = token {
            let value = HeaderValue::from_str(token)
                .map_err(|e| ClientError::Transport(format!("invalid token: {}", e)))?;
            headers.insert(API_KEY_HEADER, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base: base.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// GET `path`, returning the envelope's data
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ClientError> {
        self.send(self.http.get(self.url(path))).await
    }

    /// POST `path` with an optional JSON body
    pub async fn post<B, T>(&self, path: &str, body: Option<&B>) -> Result<Option<T>, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut req = self.http.post(self.url(path));
        if let Some(body) = body {
            req = req.json(body);
        }
        self.send(req).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<Option<T>, ClientError> {
        let resp = req
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let envelope: Envelope = if body.iter().all(u8::is_ascii_whitespace) {
            Envelope::empty()
        } else {
            match serde_json::from_slice(&body) {
                Ok(env) => env,
                Err(e) if status.is_success() => return Err(ClientError::Decode(e.to_string())),
                // Error bodies from proxies need not be envelopes
                Err(_) => Envelope::error(String::from_utf8_lossy(&body).trim().to_string()),
            }
        };

        if !status.is_success() {
            return Err(ClientError::Status {
                code: status.as_u16(),
                message: envelope
                    .error
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string()),
            });
        }

        envelope
            .data
            .map(|v| serde_json::from_value(v).map_err(|e| ClientError::Decode(e.to_string())))
            .transpose()
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
