// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn payload_data_is_decoded_for_text() {
    let payload = json!({
        "version": 3,
        "op": { "method": "set", "data": STANDARD.encode(r#"{"key":"a"}"#) },
    });

    let text = render_text(&payload);

    assert!(text.contains("version: 3\n"), "{text}");
    assert!(text.contains(r#"op: set {"key":"a"}"#), "{text}");
}

#[test]
fn status_fields_render_one_per_line() {
    let status = json!({ "committed": 4, "prepared": null, "peer_in_sync": true });

    let text = render_text(&status);

    assert_eq!(text.lines().count(), 3);
    assert!(text.contains("prepared: -\n"));
    assert!(text.contains("peer_in_sync: true\n"));
}

#[test]
fn non_base64_data_is_shown_verbatim() {
    let payload = json!({ "op": { "method": "set", "data": "not base64!" } });

    assert!(render_text(&payload).contains("op: set not base64!"));
}

#[test]
fn null_renders_ok() {
    assert_eq!(render_text(&Value::Null), "ok\n");
}
