// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::config::Config;
use crate::lifecycle::{startup, Daemon};
use axum::body::Body;
use axum::http::Request as HttpRequest;
use pairlog_engine::kv::{delete_op, set_op};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

async fn daemon(token: Option<&str>) -> (TempDir, Daemon) {
    let dir = TempDir::new().unwrap();
    let config = Config {
        listen: "127.0.0.1:0".parse().unwrap(),
        data_dir: dir.path().to_path_buf(),
        token: token.map(str::to_string),
        ..Config::default()
    };
    let daemon = startup(&config).await.unwrap();
    (dir, daemon)
}

struct Reply {
    status: StatusCode,
    body: Value,
    request_id: Option<String>,
}

async fn send(app: &Router, req: HttpRequest<Body>) -> Reply {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let request_id = response
        .headers()
        .get(REQUEST_ID_HEADER)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    Reply {
        status,
        body,
        request_id,
    }
}

async fn get(app: &Router, uri: &str) -> Reply {
    send(app, HttpRequest::get(uri).body(Body::empty()).unwrap()).await
}

async fn post(app: &Router, uri: &str, body: Value) -> Reply {
    let req = HttpRequest::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, req).await
}

fn payload(version: u64, op: pairlog_core::Operation) -> Value {
    serde_json::to_value(LogPayload::new(version, op)).unwrap()
}

#[tokio::test]
async fn do_replicates_nothing_without_peer_and_commits() {
    let (_dir, daemon) = daemon(None).await;
    let app = daemon.router();

    let reply = post(&app, "/do", payload(0, set_op("a", "1"))).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, json!({ "data": { "version": 1 } }));

    let reply = post(&app, "/do", payload(0, set_op("b", "2"))).await;
    assert_eq!(reply.body["data"]["version"], 2);

    let committed = get(&app, "/log/commit").await;
    assert_eq!(committed.status, StatusCode::OK);
    assert_eq!(committed.body["data"], payload(2, set_op("b", "2")));

    let record = get(&app, "/log/record/1").await;
    assert_eq!(record.body["data"], payload(1, set_op("a", "1")));
}

#[tokio::test]
async fn do_with_explicit_version_checks_sequence() {
    let (_dir, daemon) = daemon(None).await;
    let app = daemon.router();

    let reply = post(&app, "/do?ignore-version=false", payload(5, set_op("a", "1"))).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.body["error"].is_string());

    let reply = post(&app, "/do?ignore-version=false", payload(1, set_op("a", "1"))).await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[tokio::test]
async fn service_rejection_keeps_its_status() {
    let (_dir, daemon) = daemon(None).await;
    let app = daemon.router();

    let reply = post(&app, "/do", payload(0, delete_op("ghost"))).await;

    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    let message = reply.body["error"].as_str().unwrap();
    assert!(message.starts_with("invalid operation"), "{message}");
}

#[tokio::test]
async fn malformed_payload_is_bad_request() {
    let (_dir, daemon) = daemon(None).await;
    let app = daemon.router();
    let req = HttpRequest::post("/log/prepare")
        .body(Body::from("not json"))
        .unwrap();

    let reply = send(&app, req).await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn peer_surface_prepare_commit_rollback() {
    let (_dir, daemon) = daemon(None).await;
    let app = daemon.router();

    assert_eq!(get(&app, "/log/prepare").await.status, StatusCode::NOT_FOUND);
    assert_eq!(get(&app, "/log/commit").await.status, StatusCode::NOT_FOUND);

    let reply = post(&app, "/log/prepare", payload(1, set_op("a", "1"))).await;
    assert_eq!(reply.status, StatusCode::OK);
    let prepared = get(&app, "/log/prepare").await;
    assert_eq!(prepared.body["data"]["version"], 1);

    assert_eq!(post(&app, "/log/rollback", Value::Null).await.status, StatusCode::OK);
    assert_eq!(get(&app, "/log/prepare").await.status, StatusCode::NOT_FOUND);

    post(&app, "/log/prepare", payload(1, set_op("b", "2"))).await;
    assert_eq!(post(&app, "/log/commit", Value::Null).await.status, StatusCode::OK);
    let committed = get(&app, "/log/commit").await;
    assert_eq!(committed.body["data"], payload(1, set_op("b", "2")));
    let kv = daemon.orchestrator().log().service().inner();
    assert_eq!(kv.get("b"), Some("2".to_string()));
}

#[tokio::test]
async fn prepare_out_of_sequence_is_rejected() {
    let (_dir, daemon) = daemon(None).await;
    let app = daemon.router();

    let reply = post(&app, "/log/prepare", payload(3, set_op("a", "1"))).await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    let message = reply.body["error"].as_str().unwrap();
    assert!(message.starts_with("preparing invalid version"), "{message}");
}

#[tokio::test]
async fn record_lookup_errors() {
    let (_dir, daemon) = daemon(None).await;
    let app = daemon.router();

    assert_eq!(
        get(&app, "/log/record/abc").await.status,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        get(&app, "/log/record/7").await.status,
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[tokio::test]
async fn compact_requires_durable_records() {
    let (_dir, daemon) = daemon(None).await;
    let app = daemon.router();
    for i in 0..3 {
        post(&app, "/do", payload(0, set_op(&format!("k{}", i), "v"))).await;
    }

    let reply = post(&app, "/log/compact?keep=1", Value::Null).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    daemon
        .orchestrator()
        .log()
        .service()
        .flush()
        .await
        .unwrap();
    let reply = post(&app, "/log/compact?keep=1", Value::Null).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(
        get(&app, "/log/record/2").await.status,
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(get(&app, "/log/record/3").await.status, StatusCode::OK);
}

#[tokio::test]
async fn compact_defaults_to_keeping_ten_thousand() {
    let (_dir, daemon) = daemon(None).await;
    let app = daemon.router();
    post(&app, "/do", payload(0, set_op("a", "1"))).await;

    let reply = post(&app, "/log/compact", Value::Null).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(get(&app, "/log/record/1").await.status, StatusCode::OK);
}

#[tokio::test]
async fn status_reports_versions() {
    let (_dir, daemon) = daemon(None).await;
    let app = daemon.router();
    post(&app, "/do", payload(0, set_op("a", "1"))).await;

    let reply = get(&app, "/status").await;

    let status: StatusReport = serde_json::from_value(reply.body["data"].clone()).unwrap();
    assert_eq!(
        status,
        StatusReport {
            committed: 1,
            prepared: None,
            peer_configured: false,
            peer_in_sync: false,
            poisoned: false,
            current_version: 1,
            flushed_version: 0,
            snapshot_version: 0,
        }
    );
}

#[tokio::test]
async fn token_is_required_when_configured() {
    let (_dir, daemon) = daemon(Some("sekrit")).await;
    let app = daemon.router();

    let reply = get(&app, "/status").await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body, json!({ "error": "invalid token" }));

    let wrong = HttpRequest::get("/status")
        .header(API_KEY_HEADER, "guess")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, wrong).await.status, StatusCode::UNAUTHORIZED);

    let right = HttpRequest::get("/status")
        .header(API_KEY_HEADER, "sekrit")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, right).await.status, StatusCode::OK);
}

#[tokio::test]
async fn responses_carry_distinct_request_ids() {
    let (_dir, daemon) = daemon(Some("sekrit")).await;
    let app = daemon.router();

    let first = get(&app, "/status").await.request_id.unwrap();
    let second = get(&app, "/nowhere").await.request_id.unwrap();

    assert_eq!(first.len(), 36);
    assert_ne!(first, second);
}

#[tokio::test]
async fn unknown_route_is_enveloped_not_found() {
    let (_dir, daemon) = daemon(None).await;

    let reply = get(&daemon.router(), "/nowhere").await;

    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body, json!({ "error": "no such route" }));
}
