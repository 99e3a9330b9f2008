//! E2E tests for the tiered interpreter: rule-based first, LLM as fallback.

mod helpers;

use axum::http::StatusCode;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use helpers::{ACME_TEMPERATURE, TestHarness, identifiers};

/// Chat-completions body whose answer is `content`.
fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-e2e",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

async fn llm_answering(content: &str, expected_calls: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(content)))
        .expect(expected_calls)
        .mount(&server)
        .await;
    server
}

/// Phrasing the rules do not know goes to the LLM, then to the device.
#[tokio::test]
async fn e2e_llm_handles_unmatched_phrasing() {
    let answer = json!({
        "target": "10.0.0.1",
        "operation": "GET",
        "identifiers": [ACME_TEMPERATURE],
    })
    .to_string();
    let server = llm_answering(&answer, 1).await;
    let h = TestHarness::with_llm(&server.uri());

    let (status, json) = h.query("how warm is the chassis of 10.0.0.1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(identifiers(&json), vec![ACME_TEMPERATURE]);
    assert_eq!(json["results"][0]["value"]["value"], 41);
}

/// Requests the rules understand never reach the LLM.
#[tokio::test]
async fn e2e_rules_answer_without_llm() {
    let server = llm_answering("{}", 0).await;
    let h = TestHarness::with_llm(&server.uri());

    let (status, json) = h.query("uptime of 10.0.0.1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["results"][0]["name"], "sysUpTime.0");
}

/// Fenced, nested answers are accepted; the default agent port is dropped.
#[tokio::test]
async fn e2e_llm_nested_fenced_answer() {
    let answer = "```json\n{\"target\": {\"host\": \"192.168.1.1\", \"port\": 161}, \
                  \"operation\": {\"command\": \"WALK\", \"oids\": [\"1.3.6.1.2.1.1\"]}}\n```";
    let server = llm_answering(answer, 1).await;
    let h = TestHarness::with_llm(&server.uri());

    let (status, json) = h.query("tell me everything regarding 192.168.1.1").await;

    assert_eq!(status, StatusCode::OK);
    let results = json["results"].as_array().unwrap();
    assert_eq!(results.len(), 7);
    assert_eq!(results[0]["name"], "sysDescr.0");
    assert_eq!(results[6]["name"], "sysServices.0");
}

/// A repeated question reuses the cached interpretation.
#[tokio::test]
async fn e2e_llm_interpretation_is_cached() {
    let answer = json!({
        "target": "10.0.0.1",
        "operation": "GET",
        "identifiers": [ACME_TEMPERATURE],
    })
    .to_string();
    let server = llm_answering(&answer, 1).await;
    let h = TestHarness::with_llm(&server.uri());

    h.query("how warm is the chassis of 10.0.0.1").await;
    // Dropping cached responses keeps interpretations.
    h.load_module("ACME-MIB").await;
    let (status, json) = h.query("How warm is the chassis of 10.0.0.1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["results"][0]["name"], "acmeTemperature.0");
    assert_eq!(h.edge.attempts(), 2);
}

/// Candidates outside the operation vocabulary fail validation.
#[tokio::test]
async fn e2e_llm_candidate_is_validated() {
    let answer = json!({
        "target": "10.0.0.1",
        "operation": "SET",
        "identifiers": ["1.3.6.1.2.1.1.5.0"],
    })
    .to_string();
    let server = llm_answering(&answer, 1).await;
    let h = TestHarness::with_llm(&server.uri());

    let (status, json) = h.query("rename the box at 10.0.0.1 to lab-7").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "validation");
    assert_eq!(h.edge.attempts(), 0);
}

/// A walk proposed with two roots is rejected.
#[tokio::test]
async fn e2e_llm_walk_with_two_roots_is_rejected() {
    let answer = json!({
        "target": "10.0.0.1",
        "operation": "WALK",
        "identifiers": ["1.3.6.1.2.1.1", "1.3.6.1.2.1.2"],
    })
    .to_string();
    let server = llm_answering(&answer, 1).await;
    let h = TestHarness::with_llm(&server.uri());

    let (status, json) = h.query("dump two subtrees from 10.0.0.1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "validation");
}

/// An LLM outage leaves the request uninterpretable, not a server error.
#[tokio::test]
async fn e2e_llm_outage_is_interpretation_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;
    let h = TestHarness::with_llm(&server.uri());

    let (status, json) = h.query("how warm is the chassis of 10.0.0.1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "interpretation");
    assert_eq!(h.connector.sessions_created(), 0);
}
