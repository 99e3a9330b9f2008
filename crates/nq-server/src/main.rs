//! NetQuery API server: natural-language SNMP queries over HTTP.
//!
//! Loads `ServerConfig`, preloads the configured MIB modules, and serves
//! the query, schema, and cache endpoints.

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use nq_server::config::ServerConfig;
use nq_server::routes;
use nq_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "nq-server starting");

    let config = ServerConfig::from_env()?;
    let state = AppState::from_config(&config)?;

    let summary = state.preload(&config.mib).await;
    for (module, error) in &summary.failed {
        tracing::warn!(module = %module, error = %error, "MIB preload failed");
    }
    tracing::info!(
        loaded = summary.loaded.len(),
        failed = summary.failed.len(),
        entries = state.schema.entry_count(),
        path = %config.mib.repository_path.display(),
        "schema repository ready"
    );

    let app = routes::build_router(state);

    let addr = format!("{}:{}", config.api.host, config.api.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "listening");

    axum::serve(listener, app).await?;

    Ok(())
}
