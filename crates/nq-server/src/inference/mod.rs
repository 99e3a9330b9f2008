//! Natural-language interpretation of device queries.
//!
//! Converts operator text ("list interfaces on 10.0.0.1") into a
//! `CandidateQuery` with target, operation, and identifiers. Validation
//! happens afterwards in the interpreter, never inside a provider.
//!
//! Two tiers:
//! - **Rule-based** (local): pattern matching for common requests and
//!   explicit numeric identifiers.
//! - **LLM** (remote): OpenAI-compatible chat completions for everything else.

pub mod llm;
pub mod rules;
pub mod tiered;

use async_trait::async_trait;
use nq_protocol::CandidateQuery;
use serde::Serialize;

pub use llm::{LlmConfig, LlmProvider};
pub use rules::RuleBasedProvider;
pub use tiered::TieredProvider;

/// Model parameters passed through to the provider on every call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4".into(),
            max_tokens: 1000,
            temperature: 0.1,
        }
    }
}

/// Trait for providers that turn text into an unvalidated query.
#[async_trait]
pub trait InterpretationProvider: Send + Sync {
    /// Returns None if the provider cannot produce a candidate.
    async fn interpret(&self, text: &str, model: &ModelConfig) -> Option<CandidateQuery>;

    /// Name of this tier (for logging).
    fn tier_name(&self) -> &str;
}
