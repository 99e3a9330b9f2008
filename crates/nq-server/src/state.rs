//! Shared application state for the Axum server.
//!
//! Components are built once and shared by `Arc`. Collaborators at the
//! edges (session factory, module source, provider, cache store) are passed
//! in, so tests wire mocks and `from_config` wires the real ones.

use std::sync::Arc;

use nq_mib::{FileModuleSource, LoadSummary, ModuleSource, SchemaRepository};
use nq_snmp::{DeviceClient, SessionFactory, Snmp2Connector};

use crate::cache::{CacheStore, MemoryStore, QueryCache};
use crate::config::{MibConfig, ServerConfig};
use crate::inference::{
    InterpretationProvider, LlmConfig, LlmProvider, RuleBasedProvider, TieredProvider,
};
use crate::interpreter::QueryInterpreter;
use crate::orchestrator::QueryOrchestrator;

/// Shared application state, wrapped in `Arc` for Axum handler sharing.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<QueryOrchestrator>,
    pub interpreter: Arc<QueryInterpreter>,
    pub schema: Arc<SchemaRepository>,
    pub client: Arc<DeviceClient>,
}

/// External collaborators the state is built around.
pub struct Components {
    pub sessions: Arc<dyn SessionFactory>,
    pub modules: Arc<dyn ModuleSource>,
    pub provider: Arc<dyn InterpretationProvider>,
    pub store: Arc<dyn CacheStore>,
}

impl AppState {
    pub fn new(config: &ServerConfig, components: Components) -> Self {
        let client = Arc::new(DeviceClient::new(
            config.snmp.client_config(),
            components.sessions,
        ));
        let schema = Arc::new(SchemaRepository::new(components.modules));
        let interpreter = Arc::new(QueryInterpreter::new(
            components.provider,
            config.llm.model_config(),
            QueryCache::new(components.store, &config.cache),
        ));
        let orchestrator = Arc::new(QueryOrchestrator::new(
            Arc::clone(&interpreter),
            Arc::clone(&client),
            Arc::clone(&schema),
        ));
        Self {
            orchestrator,
            interpreter,
            schema,
            client,
        }
    }

    /// State backed by real SNMP sockets, MIB files, and the configured
    /// interpretation tiers.
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let components = Components {
            sessions: Arc::new(Snmp2Connector),
            modules: Arc::new(FileModuleSource::new(&config.mib.repository_path)),
            provider: build_provider(&config.llm)?,
            store: Arc::new(MemoryStore::new()),
        };
        Ok(Self::new(config, components))
    }

    /// Load the configured startup modules. Failures are reported, not fatal.
    pub async fn preload(&self, mib: &MibConfig) -> LoadSummary {
        if mib.preload_all() {
            match self.schema.load_all().await {
                Ok(summary) => summary,
                Err(e) => {
                    tracing::warn!(error = %e, "could not list MIB modules");
                    LoadSummary::default()
                }
            }
        } else {
            self.schema.load_modules(&mib.preload).await
        }
    }
}

/// Rule-based provider, with the LLM tier behind it when enabled.
pub fn build_provider(llm: &LlmConfig) -> anyhow::Result<Arc<dyn InterpretationProvider>> {
    if !llm.enabled {
        tracing::info!("llm interpretation disabled, using rule-based provider only");
        return Ok(Arc::new(RuleBasedProvider::new()));
    }
    if llm.api_key.is_empty() {
        tracing::warn!(base_url = %llm.base_url, "llm enabled without an API key");
    }
    let remote = LlmProvider::new(llm)?;
    Ok(Arc::new(TieredProvider::new(
        Box::new(RuleBasedProvider::new()),
        Box::new(remote),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nq_mib::MockModuleSource;
    use nq_snmp::MockConnector;

    fn components(modules: Arc<MockModuleSource>) -> Components {
        Components {
            sessions: Arc::new(MockConnector::new()),
            modules,
            provider: Arc::new(RuleBasedProvider::new()),
            store: Arc::new(MemoryStore::new()),
        }
    }

    #[test]
    fn client_uses_snmp_settings() {
        let mut config = ServerConfig::default();
        config.snmp.community = "private".into();
        config.snmp.pool_size = 2;
        let state = AppState::new(&config, components(Arc::new(MockModuleSource::new())));
        assert_eq!(state.client.config().community, "private");
        assert_eq!(state.client.config().pool_size, 2);
    }

    #[tokio::test]
    async fn preload_reports_failures() {
        let modules = Arc::new(MockModuleSource::with_module(
            "ACME-MIB",
            "ACME-MIB DEFINITIONS ::= BEGIN\nacme OBJECT IDENTIFIER ::= { enterprises 99999 }\nEND\n",
        ));
        let state = AppState::new(&ServerConfig::default(), components(modules));

        let mib = MibConfig {
            preload: vec!["ACME-MIB".into(), "MISSING-MIB".into()],
            ..MibConfig::default()
        };
        let summary = state.preload(&mib).await;
        assert_eq!(summary.loaded.len(), 1);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, "MISSING-MIB");
    }

    #[tokio::test]
    async fn preload_star_loads_everything() {
        let modules = Arc::new(MockModuleSource::with_module(
            "ACME-MIB",
            "ACME-MIB DEFINITIONS ::= BEGIN\nacme OBJECT IDENTIFIER ::= { enterprises 99999 }\nEND\n",
        ));
        let state = AppState::new(&ServerConfig::default(), components(modules));
        let mib = MibConfig {
            preload: vec!["*".into()],
            ..MibConfig::default()
        };
        let summary = state.preload(&mib).await;
        assert_eq!(summary.loaded.len(), 1);
        assert!(
            state
                .schema
                .list_loaded_modules()
                .iter()
                .any(|m| m.name == "ACME-MIB")
        );
    }

    #[test]
    fn provider_tiers_follow_config() {
        let disabled = LlmConfig {
            enabled: false,
            ..LlmConfig::default()
        };
        assert_eq!(build_provider(&disabled).unwrap().tier_name(), "local");
        assert_eq!(
            build_provider(&LlmConfig::default()).unwrap().tier_name(),
            "tiered"
        );
    }
}
