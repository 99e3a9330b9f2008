//! Device client: GET, WALK and BULKWALK over pooled sessions.
//!
//! Every round trip checks a session out of the shared pool, binds it to the
//! target and runs up to `retries + 1` attempts, each bounded by the
//! configured timeout. Only transport failures are retried.

use std::collections::VecDeque;
use std::sync::Arc;

use nq_protocol::{Oid, RawResult, split_target};
use tracing::{debug, warn};

use crate::error::{DeviceError, DeviceResult, TransportError};
use crate::pool::SessionPool;
use crate::session::SessionFactory;
use crate::types::{ClientConfig, PduRequest, SessionBinding};

/// How a [`Walker`] fetches the next batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkMode {
    /// One GETNEXT per result.
    Next,
    /// GETBULK with `max_repetitions` results per round trip.
    Bulk,
}

/// SNMP client shared by all requests.
pub struct DeviceClient {
    pool: SessionPool,
    config: ClientConfig,
}

impl DeviceClient {
    pub fn new(config: ClientConfig, factory: Arc<dyn SessionFactory>) -> Self {
        Self {
            pool: SessionPool::new(factory, config.pool_size),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn pool(&self) -> &SessionPool {
        &self.pool
    }

    /// Binding for `target` (`host`, `host:port` or `[v6]:port`).
    pub fn binding(&self, target: &str) -> SessionBinding {
        let (host, port) = split_target(target).unwrap_or((target, None));
        SessionBinding {
            host: host.to_string(),
            port: port.unwrap_or(self.config.port),
            version: self.config.version,
            community: self.config.community.clone(),
            timeout: self.config.timeout,
            retries: self.config.retries,
        }
    }

    /// Fetch exactly `identifiers` in one round trip, results in request order.
    pub async fn get(&self, target: &str, identifiers: &[Oid]) -> DeviceResult<Vec<RawResult>> {
        if identifiers.is_empty() {
            return Ok(Vec::new());
        }
        let binding = self.binding(target);
        let reply = self
            .round_trip(&binding, &PduRequest::Get(identifiers.to_vec()))
            .await?;

        if reply.len() < identifiers.len() {
            return Err(DeviceError::PartialResponse {
                target: binding.address(),
                requested: identifiers.len(),
                received: reply.len(),
            });
        }
        if reply.len() > identifiers.len() {
            return Err(DeviceError::Protocol {
                target: binding.address(),
                message: format!(
                    "requested {} binding(s), received {}",
                    identifiers.len(),
                    reply.len()
                ),
            });
        }
        if let Some((requested, result)) = identifiers
            .iter()
            .zip(&reply)
            .find(|(requested, result)| result.identifier != **requested)
        {
            return Err(DeviceError::Protocol {
                target: binding.address(),
                message: format!("requested {requested}, reply carried {}", result.identifier),
            });
        }
        Ok(reply)
    }

    /// All identifiers under `root`, one GETNEXT at a time.
    pub async fn walk(&self, target: &str, root: &Oid) -> DeviceResult<Vec<RawResult>> {
        self.walker(target, root, WalkMode::Next).collect().await
    }

    /// All identifiers under `root` using GETBULK; same sequence as [`walk`](Self::walk).
    pub async fn bulk_walk(&self, target: &str, root: &Oid) -> DeviceResult<Vec<RawResult>> {
        self.walker(target, root, WalkMode::Bulk).collect().await
    }

    /// Lazy walk under `root`. Nothing is sent until the first `next()`.
    ///
    /// v1 has no GETBULK, so bulk mode falls back to GETNEXT there.
    pub fn walker(&self, target: &str, root: &Oid, mode: WalkMode) -> Walker<'_> {
        let mode = if mode == WalkMode::Bulk && !self.config.version.supports_bulk() {
            debug!(version = %self.config.version, "bulk walk falling back to getnext");
            WalkMode::Next
        } else {
            mode
        };
        Walker {
            client: self,
            binding: self.binding(target),
            root: root.clone(),
            cursor: root.clone(),
            mode,
            buffered: VecDeque::new(),
            finished: false,
        }
    }

    async fn round_trip(
        &self,
        binding: &SessionBinding,
        request: &PduRequest,
    ) -> DeviceResult<Vec<RawResult>> {
        let attempts = binding.retries + 1;
        let mut session = self.pool.checkout();
        let mut last_error = None;

        for attempt in 1..=attempts {
            session.begin();
            let outcome =
                tokio::time::timeout(binding.timeout, session.exchange(binding, request)).await;
            session.finish();

            let error = match outcome {
                Ok(Ok(results)) => {
                    debug!(
                        device = %binding.address(),
                        pdu = request.name(),
                        bindings = results.len(),
                        attempt,
                        "round trip complete"
                    );
                    return Ok(results);
                }
                Ok(Err(TransportError::Malformed(message))) => {
                    return Err(DeviceError::Protocol {
                        target: binding.address(),
                        message,
                    });
                }
                Ok(Err(error)) => error,
                Err(_) => {
                    session.reset();
                    TransportError::Timeout(binding.timeout)
                }
            };
            warn!(
                device = %binding.address(),
                pdu = request.name(),
                attempt,
                attempts,
                error = %error,
                "round trip failed"
            );
            last_error = Some(error);
        }

        Err(DeviceError::Connect {
            target: binding.address(),
            attempts,
            reason: last_error.map_or_else(|| "no attempts made".into(), |e| e.to_string()),
        })
    }
}

/// Lazily walks a subtree in lexicographic order.
///
/// Ends at end-of-view, at the first identifier outside the root, or on an
/// empty reply. A walker that went backwards fails with `WalkBoundary`.
pub struct Walker<'a> {
    client: &'a DeviceClient,
    binding: SessionBinding,
    root: Oid,
    cursor: Oid,
    mode: WalkMode,
    buffered: VecDeque<RawResult>,
    finished: bool,
}

impl Walker<'_> {
    /// Next result under the root, or None once the subtree is exhausted.
    pub async fn next(&mut self) -> DeviceResult<Option<RawResult>> {
        loop {
            if let Some(result) = self.buffered.pop_front() {
                return Ok(Some(result));
            }
            if self.finished {
                return Ok(None);
            }
            self.fetch().await?;
        }
    }

    /// Drain the walk into a vector.
    pub async fn collect(mut self) -> DeviceResult<Vec<RawResult>> {
        let mut results = Vec::new();
        while let Some(result) = self.next().await? {
            results.push(result);
        }
        debug!(
            device = %self.binding.address(),
            root = %self.root,
            results = results.len(),
            "walk complete"
        );
        Ok(results)
    }

    async fn fetch(&mut self) -> DeviceResult<()> {
        let request = match self.mode {
            WalkMode::Next => PduRequest::GetNext(self.cursor.clone()),
            WalkMode::Bulk => PduRequest::GetBulk {
                start: self.cursor.clone(),
                max_repetitions: self.client.config.max_repetitions.max(1),
            },
        };
        let reply = self.client.round_trip(&self.binding, &request).await?;
        if reply.is_empty() {
            self.finished = true;
            return Ok(());
        }

        for result in reply {
            if result.value.is_exception() || !result.identifier.is_descendant_of(&self.root) {
                self.finished = true;
                break;
            }
            if result.identifier <= self.cursor {
                self.finished = true;
                return Err(DeviceError::WalkBoundary {
                    target: self.binding.address(),
                    previous: self.cursor.clone(),
                    returned: result.identifier,
                });
            }
            self.cursor = result.identifier.clone();
            self.buffered.push_back(result);
        }
        Ok(())
    }
}
