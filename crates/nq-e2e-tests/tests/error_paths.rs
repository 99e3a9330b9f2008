//! E2E tests for error paths: every failure surfaces with its kind and status.

mod helpers;

use axum::http::StatusCode;
use nq_server::config::ServerConfig;

use helpers::TestHarness;

/// An agent that never answers costs exactly retries + 1 attempts.
#[tokio::test(start_paused = true)]
async fn e2e_unreachable_device_exhausts_retries() {
    let h = TestHarness::new();

    let (status, json) = h.query("uptime of 10.0.0.9").await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(json["kind"], "connect");
    assert_eq!(json["status"], 504);
    assert!(json["error"].as_str().unwrap().contains("10.0.0.9"));
    assert_eq!(h.dark.attempts(), 4);
}

#[tokio::test(start_paused = true)]
async fn e2e_retry_count_follows_config() {
    let mut config = ServerConfig::default();
    config.snmp.retries = 1;
    let h = TestHarness::with_config(config);

    let (status, _) = h.query("walk 1.3.6.1.2.1.1 on 10.0.0.9").await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(h.dark.attempts(), 2);
}

/// A host nobody answers for fails the same way without waiting out timeouts.
#[tokio::test]
async fn e2e_unknown_host_is_connect_error() {
    let h = TestHarness::new();

    let (status, json) = h.query("uptime of 10.0.0.77").await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(json["kind"], "connect");
}

/// Transient failures within the retry budget are invisible to the caller.
#[tokio::test]
async fn e2e_transient_failures_are_retried() {
    let h = TestHarness::new();
    h.edge.fail_next(2);

    let (status, json) = h.query("uptime of 10.0.0.1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["results"][0]["name"], "sysUpTime.0");
    assert_eq!(h.edge.attempts(), 3);
}

/// Undecodable replies are protocol errors and are not retried.
#[tokio::test]
async fn e2e_malformed_reply_is_bad_gateway() {
    let h = TestHarness::new();
    h.edge.malformed_replies(true);

    let (status, json) = h.query("uptime of 10.0.0.1").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["kind"], "protocol");
    assert_eq!(h.edge.attempts(), 1);
}

/// Fewer bindings than requested identifiers is reported, not truncated.
#[tokio::test]
async fn e2e_partial_response_is_reported() {
    let h = TestHarness::new();
    h.core.truncate_replies(1);

    let (status, json) = h
        .query("get 1.3.6.1.2.1.1.5.0 1.3.6.1.2.1.1.6.0 from 192.168.1.1")
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["kind"], "partial_response");
    assert!(json["error"].as_str().unwrap().contains("received 1"));
}

/// A device whose walk goes backwards fails instead of looping.
#[tokio::test]
async fn e2e_walk_going_backwards_is_rejected() {
    let h = TestHarness::new();
    h.edge.restart_walk_after(2);

    let (status, json) = h.query("walk 1.3.6.1.2.1 on 10.0.0.1").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["kind"], "walk_boundary");
    assert_eq!(h.edge.attempts(), 3);
}

/// Text with no device in it never reaches the network.
#[tokio::test]
async fn e2e_uninterpretable_text() {
    let h = TestHarness::new();

    let (status, json) = h.query("what is the meaning of life").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "interpretation");
    assert_eq!(h.connector.sessions_created(), 0);
}

#[tokio::test]
async fn e2e_empty_query_is_rejected() {
    let h = TestHarness::new();

    let (status, json) = h.query("   ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "validation");
}

#[tokio::test]
async fn e2e_malformed_request_body() {
    let h = TestHarness::new();

    let (status, _) = h
        .post_json("/api/v1/query", serde_json::json!({ "text": "uptime of 10.0.0.1" }))
        .await;
    assert!(status.is_client_error());
}
