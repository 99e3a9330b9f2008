//! API route definitions and router builder.

pub mod cache;
pub mod health;
pub mod mibs;
pub mod oid;
pub mod query;

use axum::Router;
use axum::routing::{get, post};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // Queries
        .route("/query", post(query::process_query))
        // Schema repository
        .route("/mibs", get(mibs::list_modules))
        .route("/mibs/{name}", post(mibs::load_module))
        .route("/mibs/{name}/entries", get(mibs::module_entries))
        // Identifier lookup
        .route("/oid/resolve", post(oid::resolve_identifier))
        .route("/oid/translate", post(oid::translate_identifier))
        // Cache administration
        .route("/cache/clear", post(cache::clear_cache))
        .route("/cache/stats", get(cache::cache_stats));

    Router::new()
        .route("/health", get(health::health))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use nq_mib::MockModuleSource;
    use nq_snmp::mock::{if_table, system_group};
    use nq_snmp::{MockAgent, MockConnector};
    use tower::ServiceExt;

    use crate::cache::MemoryStore;
    use crate::config::ServerConfig;
    use crate::inference::RuleBasedProvider;
    use crate::state::Components;

    const ACME_MIB: &str = r#"ACME-MIB DEFINITIONS ::= BEGIN
acme OBJECT IDENTIFIER ::= { enterprises 99999 }
acmeTemperature OBJECT-TYPE
    SYNTAX      Integer32
    MAX-ACCESS  read-only
    STATUS      current
    DESCRIPTION "Chassis temperature in degrees Celsius."
    ::= { acme 1 }
END
"#;

    fn app() -> Router {
        let agent = Arc::new(MockAgent::with_view(
            system_group("Linux edge-1 6.1", "edge-1")
                .into_iter()
                .chain(if_table(2)),
        ));
        let sessions = Arc::new(MockConnector::new());
        sessions.register("10.0.0.1", agent);

        let state = AppState::new(
            &ServerConfig::default(),
            Components {
                sessions,
                modules: Arc::new(MockModuleSource::with_module("ACME-MIB", ACME_MIB)),
                provider: Arc::new(RuleBasedProvider::new()),
                store: Arc::new(MemoryStore::new()),
            },
        );
        build_router(state)
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let (status, json) = send(
            app(),
            Request::get("/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert!(json["schema_entries"].as_u64().unwrap() > 0);
    }

    #[tokio::test]
    async fn query_returns_annotated_results() {
        let (status, json) = send(
            app(),
            post_json(
                "/api/v1/query",
                serde_json::json!({ "query": "Get the system description from 10.0.0.1" }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["query"], "Get the system description from 10.0.0.1");
        let result = &json["results"][0];
        assert_eq!(result["identifier"], "1.3.6.1.2.1.1.1.0");
        assert_eq!(result["name"], "sysDescr.0");
        assert_eq!(result["resolved"], true);
        assert_eq!(result["value"]["type"], "octet_string");
    }

    #[tokio::test]
    async fn query_walks_interfaces() {
        let (status, json) = send(
            app(),
            post_json(
                "/api/v1/query",
                serde_json::json!({ "query": "list interfaces on 10.0.0.1", "skip_cache": true }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["results"].as_array().unwrap().len(), 8);
    }

    #[tokio::test]
    async fn uninterpretable_query_is_bad_request() {
        let (status, json) = send(
            app(),
            post_json("/api/v1/query", serde_json::json!({ "query": "sing a song" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["kind"], "interpretation");
    }

    #[tokio::test]
    async fn empty_query_is_bad_request() {
        let (status, json) = send(
            app(),
            post_json("/api/v1/query", serde_json::json!({ "query": "  " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["status"], 400);
    }

    #[tokio::test]
    async fn list_modules_includes_builtins() {
        let (status, json) = send(
            app(),
            Request::get("/api/v1/mibs").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["name"].as_str().unwrap())
            .collect();
        assert!(names.contains(&"SNMPv2-MIB"));
        assert!(names.contains(&"IF-MIB"));
        assert!(!names.contains(&"ACME-MIB"));
    }

    #[tokio::test]
    async fn load_then_list_entries() {
        let app = app();
        let (status, json) = send(
            app.clone(),
            Request::post("/api/v1/mibs/ACME-MIB")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["module"], "ACME-MIB");
        assert_eq!(json["entries"], 2);
        assert_eq!(json["changed"], true);

        let (status, json) = send(
            app,
            Request::get("/api/v1/mibs/ACME-MIB/entries")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let entries = json.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|e| e["name"] == "acmeTemperature"));
    }

    #[tokio::test]
    async fn load_unknown_module_is_not_found() {
        let (status, json) = send(
            app(),
            Request::post("/api/v1/mibs/NOPE-MIB")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["kind"], "not_found");
    }

    #[tokio::test]
    async fn entries_of_unloaded_module_is_not_found() {
        let (status, _) = send(
            app(),
            Request::get("/api/v1/mibs/ACME-MIB/entries")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn resolve_and_translate() {
        let app = app();
        let (status, json) = send(
            app.clone(),
            post_json("/api/v1/oid/resolve", serde_json::json!({ "name": "ifDescr.3" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["oid"], "1.3.6.1.2.1.2.2.1.2.3");

        let (status, json) = send(
            app,
            post_json(
                "/api/v1/oid/translate",
                serde_json::json!({ "oid": ".1.3.6.1.2.1.1.5.0" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["name"], "SNMPv2-MIB::sysName.0");
    }

    #[tokio::test]
    async fn resolve_unknown_name_is_not_found() {
        let (status, _) = send(
            app(),
            post_json("/api/v1/oid/resolve", serde_json::json!({ "name": "acmeTemperature" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn translate_rejects_garbage() {
        let (status, _) = send(
            app(),
            post_json("/api/v1/oid/translate", serde_json::json!({ "oid": "1..3" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn cache_stats_and_clear() {
        let app = app();
        let query = serde_json::json!({ "query": "uptime of 10.0.0.1" });
        send(app.clone(), post_json("/api/v1/query", query.clone())).await;
        send(app.clone(), post_json("/api/v1/query", query)).await;

        let (status, json) = send(
            app.clone(),
            Request::get("/api/v1/cache/stats")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["entry_count"], 2);
        assert_eq!(json["hit_count"], 1);

        let (status, json) = send(
            app.clone(),
            Request::post("/api/v1/cache/clear")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["cleared"], 2);

        let (_, json) = send(
            app,
            Request::get("/api/v1/cache/stats")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(json["entry_count"], 0);
    }
}
