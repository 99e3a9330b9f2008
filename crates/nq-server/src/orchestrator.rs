//! Query orchestration: interpret, dispatch to the device, annotate, cache.
//!
//! Each request moves through
//! `RECEIVED → CACHE_CHECK → (CACHE_HIT → DONE) | (CACHE_MISS → INTERPRETING
//! → VALIDATING → DISPATCHING → RESOLVING → CACHING → DONE)`, ending in
//! `FAILED` on the first error. Stages are logged at debug level inside a
//! span carrying the request id.

use std::fmt;
use std::sync::Arc;

use nq_mib::{LoadOutcome, SchemaRepository, SchemaResult};
use nq_protocol::{ErrorKind, Operation, Query, RawResult, Response, ResponseEntry};
use nq_snmp::{DeviceClient, DeviceError, DeviceResult};
use thiserror::Error;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::interpreter::{InterpretError, QueryInterpreter};

/// Per-request state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    CacheCheck,
    CacheHit,
    CacheMiss,
    Interpreting,
    Validating,
    Dispatching,
    Resolving,
    Caching,
    Done,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Received => "RECEIVED",
            Stage::CacheCheck => "CACHE_CHECK",
            Stage::CacheHit => "CACHE_HIT",
            Stage::CacheMiss => "CACHE_MISS",
            Stage::Interpreting => "INTERPRETING",
            Stage::Validating => "VALIDATING",
            Stage::Dispatching => "DISPATCHING",
            Stage::Resolving => "RESOLVING",
            Stage::Caching => "CACHING",
            Stage::Done => "DONE",
            Stage::Failed => "FAILED",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed request, carrying the originating error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Interpret(#[from] InterpretError),

    #[error(transparent)]
    Device(#[from] DeviceError),
}

impl ProcessError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProcessError::Interpret(e) => e.kind(),
            ProcessError::Device(e) => e.kind(),
        }
    }
}

/// Per-request switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessOptions {
    /// Bypass the response and interpretation caches, both read and write.
    pub skip_cache: bool,
}

/// Drives a request from text to annotated response.
pub struct QueryOrchestrator {
    interpreter: Arc<QueryInterpreter>,
    client: Arc<DeviceClient>,
    schema: Arc<SchemaRepository>,
}

impl QueryOrchestrator {
    pub fn new(
        interpreter: Arc<QueryInterpreter>,
        client: Arc<DeviceClient>,
        schema: Arc<SchemaRepository>,
    ) -> Self {
        Self {
            interpreter,
            client,
            schema,
        }
    }

    pub async fn process(&self, text: &str) -> Result<Response, ProcessError> {
        self.process_with(text, ProcessOptions::default()).await
    }

    pub async fn process_with(
        &self,
        text: &str,
        options: ProcessOptions,
    ) -> Result<Response, ProcessError> {
        let request_id = Uuid::now_v7();
        let span = info_span!("query", %request_id);
        async {
            match self.run(text, options).await {
                Ok(response) => {
                    stage(Stage::Done);
                    info!(results = response.len(), "query completed");
                    Ok(response)
                }
                Err(e) => {
                    warn!(stage = %Stage::Failed, kind = %e.kind(), error = %e, "query failed");
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(&self, text: &str, options: ProcessOptions) -> Result<Response, ProcessError> {
        stage(Stage::Received);

        if !options.skip_cache {
            stage(Stage::CacheCheck);
            if let Some(response) = self.interpreter.cached_response(text).await {
                stage(Stage::CacheHit);
                return Ok(response);
            }
            stage(Stage::CacheMiss);
        }

        stage(Stage::Interpreting);
        let cached_query = if options.skip_cache {
            None
        } else {
            self.interpreter.cached_query(text).await
        };
        let query = match cached_query {
            Some(query) => query,
            None => {
                let candidate = self.interpreter.propose(text).await?;
                stage(Stage::Validating);
                let query =
                    QueryInterpreter::validate(candidate).map_err(InterpretError::from)?;
                if !options.skip_cache {
                    self.interpreter.remember_query(text, &query).await;
                }
                query
            }
        };

        stage(Stage::Dispatching);
        let raw = self.dispatch(&query).await?;

        stage(Stage::Resolving);
        let generation = self.schema.generation();
        let response = self.annotate(raw);

        if !options.skip_cache {
            stage(Stage::Caching);
            self.interpreter.cache_response(text, &response).await;
            // A module load may have invalidated before this write landed.
            if self.schema.generation() != generation {
                debug!("schema changed during request; dropping cached response");
                self.interpreter.forget_response(text).await;
            }
        }
        Ok(response)
    }

    /// Route a validated query to the device client by operation.
    pub async fn dispatch(&self, query: &Query) -> DeviceResult<Vec<RawResult>> {
        debug!(
            device = %query.target(),
            operation = %query.operation(),
            identifiers = query.identifiers().len(),
            "dispatching"
        );
        match query.operation() {
            Operation::Get => self.client.get(query.target(), query.identifiers()).await,
            Operation::Walk => self.client.walk(query.target(), query.root()).await,
            Operation::BulkWalk => self.client.bulk_walk(query.target(), query.root()).await,
        }
    }

    /// Resolve every result through the schema, keeping device order.
    pub fn annotate(&self, raw: Vec<RawResult>) -> Response {
        let results = raw
            .into_iter()
            .map(|result| match self.schema.resolve(&result.identifier) {
                Some(entry) => ResponseEntry::resolved(
                    result.identifier,
                    result.value,
                    entry.name,
                    entry.description,
                ),
                None => ResponseEntry::unresolved(result.identifier, result.value),
            })
            .collect();
        Response::new(results)
    }

    /// Load a module, dropping cached responses when its content changed.
    pub async fn load_module(&self, name: &str) -> SchemaResult<LoadOutcome> {
        let outcome = self.schema.load_module(name).await?;
        if outcome.changed {
            self.interpreter.invalidate_responses().await;
        }
        Ok(outcome)
    }
}

fn stage(stage: Stage) {
    debug!(stage = %stage, "query stage");
}
