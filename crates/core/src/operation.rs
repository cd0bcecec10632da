// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operations and log payloads
//!
//! An [`Operation`] is one opaque state-changing request. Its `data` travels as
//! base64 on the wire. Records written by older deployments stored `data` as a
//! raw JSON value instead; those still decode, with the raw JSON text becoming
//! the operation bytes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// One state-changing request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub method: String,
    #[serde(with = "data_encoding", default)]
    pub data: Vec<u8>,
}

impl Operation {
    pub fn new(method: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            method: method.into(),
            data: data.into(),
        }
    }

    /// Encode as the text stored in a log record
    pub fn to_record(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a stored log record, accepting both encodings of `data`
    pub fn from_record(record: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(record)
    }
}

/// The unit exchanged between clients and the log service
///
/// `version` must equal `committed + 1` when the payload is prepared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogPayload {
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub op: Operation,
}

impl LogPayload {
    pub fn new(version: u64, op: Operation) -> Self {
        Self { version, op }
    }
}

mod data_encoding {
    use super::{Engine, STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(decode_value(value))
    }

    /// Base64 strings decode to their bytes; anything else is legacy raw JSON.
    fn decode_value(value: Value) -> Vec<u8> {
        match value {
            Value::Null => Vec::new(),
            Value::String(s) => match STANDARD.decode(s.as_bytes()) {
                Ok(bytes) => bytes,
                Err(_) => Value::String(s).to_string().into_bytes(),
            },
            other => other.to_string().into_bytes(),
        }
    }
}

#[cfg(test)]
#[path = "operation_tests.rs"]
mod tests;
