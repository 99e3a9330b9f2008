//! Shared test harness for E2E integration tests.
//!
//! Wires the real router, orchestrator and schema repository to simulated
//! devices and an in-memory MIB source.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use nq_mib::MockModuleSource;
use nq_protocol::{Oid, VarValue};
use nq_server::cache::MemoryStore;
use nq_server::config::ServerConfig;
use nq_server::inference::{
    InterpretationProvider, LlmConfig, LlmProvider, RuleBasedProvider, TieredProvider,
};
use nq_server::routes::build_router;
use nq_server::state::{AppState, Components};
use nq_snmp::mock::{if_table, system_group};
use nq_snmp::{MockAgent, MockConnector};

/// Edge router with the system group and a 3-row ifTable.
pub const EDGE: &str = "10.0.0.1";
/// Core switch answering only the system group.
pub const CORE: &str = "192.168.1.1";
/// Registered but never answers.
pub const DARK: &str = "10.0.0.9";

/// Enterprise object the edge router exposes but no builtin module knows.
pub const ACME_TEMPERATURE: &str = "1.3.6.1.4.1.99999.1.0";

pub const ACME_MIB: &str = r#"ACME-MIB DEFINITIONS ::= BEGIN

IMPORTS
    enterprises FROM SNMPv2-SMI;

acme OBJECT IDENTIFIER ::= { enterprises 99999 }

acmeTemperature OBJECT-TYPE
    SYNTAX      Integer32
    MAX-ACCESS  read-only
    STATUS      current
    DESCRIPTION "Chassis temperature in degrees Celsius."
    ::= { acme 1 }

END
"#;

/// End-to-end harness: one router over three simulated devices.
pub struct TestHarness {
    pub state: AppState,
    pub router: Router,
    pub connector: Arc<MockConnector>,
    pub edge: Arc<MockAgent>,
    pub core: Arc<MockAgent>,
    pub dark: Arc<MockAgent>,
    pub modules: Arc<MockModuleSource>,
}

impl TestHarness {
    /// Rule-based interpretation only, default configuration.
    pub fn new() -> Self {
        Self::build(ServerConfig::default(), Arc::new(RuleBasedProvider::new()))
    }

    /// Rule-based tier backed by an LLM tier served from `base_url`.
    pub fn with_llm(base_url: &str) -> Self {
        let llm = LlmConfig {
            base_url: base_url.to_string(),
            api_key: "test-key".into(),
            timeout_secs: 2,
            ..LlmConfig::default()
        };
        let provider = TieredProvider::new(
            Box::new(RuleBasedProvider::new()),
            Box::new(LlmProvider::new(&llm).unwrap()),
        );
        Self::build(ServerConfig::default(), Arc::new(provider))
    }

    pub fn with_config(config: ServerConfig) -> Self {
        Self::build(config, Arc::new(RuleBasedProvider::new()))
    }

    fn build(config: ServerConfig, provider: Arc<dyn InterpretationProvider>) -> Self {
        let edge = Arc::new(MockAgent::with_view(
            system_group("Linux edge-1 6.1.0 x86_64", "edge-1")
                .into_iter()
                .chain(if_table(3)),
        ));
        edge.insert(oid(ACME_TEMPERATURE), VarValue::Integer(41));

        let core = Arc::new(MockAgent::with_view(system_group(
            "Cisco IOS Software, C2960 Software, Version 15.0(2)SE",
            "core-sw1",
        )));

        let dark = Arc::new(MockAgent::new());
        dark.set_unreachable(true);

        let connector = Arc::new(MockConnector::new());
        connector.register(EDGE, Arc::clone(&edge));
        connector.register(CORE, Arc::clone(&core));
        connector.register(DARK, Arc::clone(&dark));

        let modules = Arc::new(MockModuleSource::with_module("ACME-MIB", ACME_MIB));

        let state = AppState::new(
            &config,
            Components {
                sessions: connector.clone(),
                modules: modules.clone(),
                provider,
                store: Arc::new(MemoryStore::new()),
            },
        );
        let router = build_router(state.clone());

        Self {
            state,
            router,
            connector,
            edge,
            core,
            dark,
            modules,
        }
    }

    /// Submit a natural-language query (POST /api/v1/query).
    pub async fn query(&self, text: &str) -> (StatusCode, serde_json::Value) {
        self.post_json("/api/v1/query", serde_json::json!({ "query": text }))
            .await
    }

    /// Submit a query that bypasses both caches.
    pub async fn query_uncached(&self, text: &str) -> (StatusCode, serde_json::Value) {
        self.post_json(
            "/api/v1/query",
            serde_json::json!({ "query": text, "skip_cache": true }),
        )
        .await
    }

    /// Load a MIB module (POST /api/v1/mibs/{name}).
    pub async fn load_module(&self, name: &str) -> (StatusCode, serde_json::Value) {
        self.post(&format!("/api/v1/mibs/{name}")).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        self.send(Request::post(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(
        &self,
        uri: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        self.send(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
        )
        .await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        // Extractor rejections answer in plain text.
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }
}

pub fn oid(dotted: &str) -> Oid {
    dotted.parse().unwrap()
}

/// Identifiers of a query reply, in order.
pub fn identifiers(json: &serde_json::Value) -> Vec<String> {
    json["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["identifier"].as_str().unwrap().to_string())
        .collect()
}
