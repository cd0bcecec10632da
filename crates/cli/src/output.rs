// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output formatting for CLI commands

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::ValueEnum;
use serde_json::Value;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Print a response value in the specified format
pub fn print_value(value: &Value, format: OutputFormat) {
    match format {
        OutputFormat::Text => print!("{}", render_text(value)),
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(value) {
                println!("{}", json);
            }
        }
    }
}

/// Print the result of a command that returns no data
pub fn print_done(format: OutputFormat) {
    match format {
        OutputFormat::Text => println!("ok"),
        OutputFormat::Json => println!("{{}}"),
    }
}

/// One `key: value` line per field; operation data is decoded for display
pub fn render_text(value: &Value) -> String {
    let mut out = String::new();
    match value {
        Value::Object(map) => {
            for (key, field) in map {
                match (key.as_str(), field) {
                    ("op", Value::Object(op)) => {
                        let method = op.get("method").and_then(Value::as_str).unwrap_or("");
                        let data = op.get("data").map(decode_data).unwrap_or_default();
                        out.push_str(&format!("op: {} {}\n", method, data));
                    }
                    (_, Value::Null) => out.push_str(&format!("{}: -\n", key)),
                    (_, Value::String(s)) => out.push_str(&format!("{}: {}\n", key, s)),
                    (_, other) => out.push_str(&format!("{}: {}\n", key, other)),
                }
            }
        }
        Value::Null => out.push_str("ok\n"),
        other => out.push_str(&format!("{}\n", other)),
    }
    out
}

fn decode_data(data: &Value) -> String {
    match data {
        Value::String(s) => match STANDARD.decode(s.as_bytes()) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(_) => s.clone(),
        },
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
