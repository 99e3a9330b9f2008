//! Query interpreter: text → validated `Query`, plus the response cache.

use std::sync::Arc;

use nq_protocol::{CandidateQuery, ErrorKind, Query, Response, ValidationError};
use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::{CacheError, CacheStats, QueryCache, normalize};
use crate::inference::{InterpretationProvider, ModelConfig};

/// Why text could not be turned into a query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpretError {
    #[error("could not interpret '{0}' as a device query")]
    NoCandidate(String),

    #[error("invalid query: {0}")]
    Invalid(#[from] ValidationError),
}

impl InterpretError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            InterpretError::NoCandidate(_) => ErrorKind::Interpretation,
            InterpretError::Invalid(_) => ErrorKind::Validation,
        }
    }
}

/// Turns operator text into queries through a provider, caching both the
/// interpretation and the final response per normalized text.
pub struct QueryInterpreter {
    provider: Arc<dyn InterpretationProvider>,
    model: ModelConfig,
    cache: QueryCache,
}

impl QueryInterpreter {
    pub fn new(
        provider: Arc<dyn InterpretationProvider>,
        model: ModelConfig,
        cache: QueryCache,
    ) -> Self {
        Self {
            provider,
            model,
            cache,
        }
    }

    pub fn model(&self) -> &ModelConfig {
        &self.model
    }

    /// Cached interpretation if present, otherwise provider → validate →
    /// cache.
    pub async fn interpret(&self, text: &str) -> Result<Query, InterpretError> {
        if let Some(query) = self.cached_query(text).await {
            return Ok(query);
        }
        let candidate = self.propose(text).await?;
        let query = Self::validate(candidate)?;
        self.remember_query(text, &query).await;
        Ok(query)
    }

    pub async fn cached_query(&self, text: &str) -> Option<Query> {
        self.cache.get_query(text).await
    }

    /// Ask the provider for an unvalidated candidate.
    pub async fn propose(&self, text: &str) -> Result<CandidateQuery, InterpretError> {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return Err(InterpretError::NoCandidate(String::new()));
        }
        match self.provider.interpret(text, &self.model).await {
            Some(candidate) => {
                debug!(
                    tier = self.provider.tier_name(),
                    device = %candidate.target,
                    operation = %candidate.operation,
                    "candidate query"
                );
                Ok(candidate)
            }
            None => Err(InterpretError::NoCandidate(normalized)),
        }
    }

    /// Operation vocabulary, identifier grammar, target syntax, and root
    /// count. Pure.
    pub fn validate(candidate: CandidateQuery) -> Result<Query, ValidationError> {
        candidate.validate()
    }

    pub async fn remember_query(&self, text: &str, query: &Query) {
        if let Err(e) = self.cache.put_query(text, query).await {
            warn!(error = %e, "failed to cache interpretation");
        }
    }

    pub async fn cached_response(&self, text: &str) -> Option<Response> {
        self.cache.get_response(text).await
    }

    /// Store failures are logged and swallowed.
    pub async fn cache_response(&self, text: &str, response: &Response) {
        if let Err(e) = self.cache.put_response(text, response).await {
            warn!(error = %e, kind = %e.kind(), "failed to cache response");
        }
    }

    pub async fn forget_response(&self, text: &str) {
        if let Err(e) = self.cache.delete_response(text).await {
            warn!(error = %e, "failed to drop cached response");
        }
    }

    /// Drop cached responses after the schema changed.
    pub async fn invalidate_responses(&self) {
        match self.cache.clear_responses().await {
            Ok(cleared) => debug!(cleared, "invalidated cached responses"),
            Err(e) => warn!(error = %e, "failed to invalidate cached responses"),
        }
    }

    pub async fn clear_cache(&self) -> Result<usize, CacheError> {
        self.cache.clear().await
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }
}
