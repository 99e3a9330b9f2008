//! OpenAI-compatible chat-completions provider.
//!
//! Sends the operator text with a system prompt describing the query shape
//! and turns the model's JSON answer into a `CandidateQuery`. Transport
//! failures, non-200 replies and unusable content all yield `None`.

use std::time::Duration;

use async_trait::async_trait;
use nq_protocol::CandidateQuery;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{InterpretationProvider, ModelConfig};

const SYSTEM_PROMPT: &str = r#"You convert natural-language network management requests into SNMP queries.

Respond with ONLY a JSON object (no markdown, no explanation) of this shape:
{"target": "<IP address or hostname, optionally host:port>", "operation": "<GET|WALK|BULKWALK>", "identifiers": ["<numeric OID>", ...]}

Rules:
- "target" is the device named in the request (REQUIRED).
- "operation" is GET for specific scalar values, WALK to enumerate a subtree
  or table, BULKWALK for large tables when bulk retrieval is requested.
- "identifiers" are dotted-numeric OIDs such as "1.3.6.1.2.1.1.1.0". GET may
  list several; WALK and BULKWALK take exactly one subtree root.
- Scalars end in ".0" (sysDescr is 1.3.6.1.2.1.1.1.0, sysUpTime is
  1.3.6.1.2.1.1.3.0, sysName is 1.3.6.1.2.1.1.5.0). The interface table is
  1.3.6.1.2.1.2.2.

If the request does not name a device or is not a device query, respond with:
{"target": null, "operation": null, "identifiers": []}"#;

/// Default SNMP port; left off the target when a model spells it out.
const DEFAULT_AGENT_PORT: u64 = 161;

/// Configuration for the chat-completions endpoint (`[llm]` table).
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// Whether the LLM tier is consulted at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// API base URL; `/chat/completions` is appended.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token. Empty sends no Authorization header.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_enabled() -> bool {
    true
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4".into()
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_temperature() -> f64 {
    0.1
}
fn default_timeout_secs() -> u64 {
    30
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            base_url: default_base_url(),
            api_key: String::new(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmConfig {
    pub fn model_config(&self) -> ModelConfig {
        ModelConfig {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

/// Chat-completions response (only fields we need).
#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Provider backed by an OpenAI-compatible HTTP API.
pub struct LlmProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl LlmProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl InterpretationProvider for LlmProvider {
    async fn interpret(&self, text: &str, model: &ModelConfig) -> Option<CandidateQuery> {
        let url = format!("{}/chat/completions", self.base_url);
        let user = format!("Convert this request to a JSON query: '{text}'");
        let body = ChatRequest {
            model: &model.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: model.temperature,
            max_tokens: model.max_tokens,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let mut request = self.client.post(&url).json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = match request.send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(error = %e, "llm request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "llm returned non-200");
            return None;
        }

        let chat: ChatResponse = match response.json().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "failed to parse llm response body");
                return None;
            }
        };

        let content = chat.choices.into_iter().next()?.message.content?;
        let value: Value = match serde_json::from_str(extract_json(&content)) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, content = %content, "llm returned invalid JSON");
                return None;
            }
        };

        let candidate = candidate_from_value(&value);
        if candidate.is_none() {
            tracing::debug!(content = %content, "llm did not produce a device query");
        }
        candidate
    }

    fn tier_name(&self) -> &str {
        "llm"
    }
}

/// Extract JSON from a response that may be wrapped in markdown fences.
fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();

    if let Some(start) = trimmed.find("```json") {
        let after_fence = &trimmed[start + 7..];
        if let Some(end) = after_fence.find("```") {
            return after_fence[..end].trim();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        if let Some(end) = after_fence.find("```") {
            return after_fence[..end].trim();
        }
    }

    trimmed
}

/// Read a candidate out of the model's JSON.
///
/// Besides the flat shape from the prompt, accepts the nested
/// `{"target": {"host", "port"}, "operation": {"command", "oids"}}` form and
/// the `target_ip` / `oid` spelling that models fall back to.
fn candidate_from_value(value: &Value) -> Option<CandidateQuery> {
    let target = match value.get("target") {
        Some(Value::String(target)) => target.clone(),
        Some(Value::Object(target)) => {
            let host = target.get("host")?.as_str()?;
            with_port(host, target.get("port").and_then(Value::as_u64))
        }
        _ => {
            let host = value.get("target_ip")?.as_str()?;
            with_port(host, value.get("port").and_then(Value::as_u64))
        }
    };
    if target.trim().is_empty() {
        return None;
    }

    let operation_value = value.get("operation")?;
    let operation = match operation_value {
        Value::String(operation) => operation.clone(),
        Value::Object(operation) => operation.get("command")?.as_str()?.to_string(),
        _ => return None,
    };

    let list = ["identifiers", "oids"].iter().find_map(|key| {
        value
            .get(*key)
            .or_else(|| operation_value.get(*key))
            .and_then(Value::as_array)
    });
    let identifiers = match list {
        // A non-string element makes the whole answer unusable.
        Some(list) => list
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()?,
        None => value
            .get("oid")
            .and_then(Value::as_str)
            .map(|oid| vec![oid.to_string()])
            .unwrap_or_default(),
    };

    Some(CandidateQuery {
        target,
        operation,
        identifiers,
    })
}

fn with_port(host: &str, port: Option<u64>) -> String {
    match port {
        Some(port) if port != DEFAULT_AGENT_PORT => {
            if host.contains(':') {
                format!("[{host}]:{port}")
            } else {
                format!("{host}:{port}")
            }
        }
        _ => host.to_string(),
    }
}
