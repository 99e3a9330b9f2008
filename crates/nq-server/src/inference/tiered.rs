//! Tiered provider: local rules first, LLM fallback.

use async_trait::async_trait;
use nq_protocol::CandidateQuery;

use super::{InterpretationProvider, ModelConfig};

/// Composite provider that tries local interpretation first, then remote.
pub struct TieredProvider {
    local: Box<dyn InterpretationProvider>,
    remote: Box<dyn InterpretationProvider>,
}

impl TieredProvider {
    pub fn new(
        local: Box<dyn InterpretationProvider>,
        remote: Box<dyn InterpretationProvider>,
    ) -> Self {
        Self { local, remote }
    }
}

#[async_trait]
impl InterpretationProvider for TieredProvider {
    async fn interpret(&self, text: &str, model: &ModelConfig) -> Option<CandidateQuery> {
        if let Some(candidate) = self.local.interpret(text, model).await {
            tracing::debug!(tier = self.local.tier_name(), "interpreted locally");
            return Some(candidate);
        }

        tracing::debug!(
            tier = self.remote.tier_name(),
            "local interpretation missed, falling back"
        );
        self.remote.interpret(text, model).await
    }

    fn tier_name(&self) -> &str {
        "tiered"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider that always returns a fixed candidate (or None).
    struct MockProvider {
        result: Option<CandidateQuery>,
        name: &'static str,
        calls: Arc<AtomicUsize>,
    }

    impl MockProvider {
        fn hit(name: &'static str, target: &str) -> Self {
            Self {
                result: Some(CandidateQuery::new(target, "GET", ["1.3.6.1.2.1.1.3.0"])),
                name,
                calls: Arc::default(),
            }
        }

        fn miss(name: &'static str) -> Self {
            Self {
                result: None,
                name,
                calls: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl InterpretationProvider for MockProvider {
        async fn interpret(&self, _text: &str, _model: &ModelConfig) -> Option<CandidateQuery> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }

        fn tier_name(&self) -> &str {
            self.name
        }
    }

    #[tokio::test]
    async fn local_hit_skips_remote() {
        let remote = MockProvider::hit("llm", "10.0.0.2");
        let remote_calls = Arc::clone(&remote.calls);
        let provider = TieredProvider::new(
            Box::new(MockProvider::hit("local", "10.0.0.1")),
            Box::new(remote),
        );

        let candidate = provider
            .interpret("uptime of 10.0.0.1", &ModelConfig::default())
            .await
            .unwrap();
        assert_eq!(candidate.target, "10.0.0.1");
        assert_eq!(remote_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn remote_fallback_on_local_miss() {
        let provider = TieredProvider::new(
            Box::new(MockProvider::miss("local")),
            Box::new(MockProvider::hit("llm", "10.0.0.2")),
        );

        let candidate = provider
            .interpret("how busy is the edge router 10.0.0.2", &ModelConfig::default())
            .await
            .unwrap();
        assert_eq!(candidate.target, "10.0.0.2");
    }

    #[tokio::test]
    async fn both_miss_returns_none() {
        let provider = TieredProvider::new(
            Box::new(MockProvider::miss("local")),
            Box::new(MockProvider::miss("llm")),
        );

        assert!(
            provider
                .interpret("hello world", &ModelConfig::default())
                .await
                .is_none()
        );
        assert_eq!(provider.tier_name(), "tiered");
    }
}
