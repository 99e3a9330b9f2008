//! Simulated SNMP agents for testing.
//!
//! A `MockAgent` answers GET / GETNEXT / GETBULK from a scripted MIB view and
//! can be told to misbehave: go silent, fail transiently, truncate or corrupt
//! replies, or send a walk backwards. Every attempt is recorded so tests can
//! assert on retry counts and on what was requested. `MockConnector` routes
//! sessions to agents by host.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use nq_protocol::{Oid, RawResult, VarValue};

use crate::error::TransportError;
use crate::session::{SessionFactory, SnmpSession};
use crate::types::{PduRequest, SessionBinding};

#[derive(Default)]
struct AgentState {
    view: BTreeMap<Oid, VarValue>,
    unreachable: bool,
    transient_failures: u32,
    truncate_to: Option<usize>,
    malformed: bool,
    restart_after: Option<usize>,
    answered: usize,
    requests: Vec<PduRequest>,
    communities: Vec<String>,
}

/// Scripted device.
#[derive(Default)]
pub struct MockAgent {
    state: Mutex<AgentState>,
}

impl MockAgent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agent pre-loaded with a MIB view.
    pub fn with_view(entries: impl IntoIterator<Item = (Oid, VarValue)>) -> Self {
        let agent = Self::new();
        agent.state.lock().unwrap().view.extend(entries);
        agent
    }

    pub fn insert(&self, identifier: Oid, value: VarValue) {
        self.state.lock().unwrap().view.insert(identifier, value);
    }

    /// Never answer; every attempt runs into the caller's timeout.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().unwrap().unreachable = unreachable;
    }

    /// Fail the next `count` attempts with a retryable transport error.
    pub fn fail_next(&self, count: u32) {
        self.state.lock().unwrap().transient_failures = count;
    }

    /// Return at most `count` bindings per reply.
    pub fn truncate_replies(&self, count: usize) {
        self.state.lock().unwrap().truncate_to = Some(count);
    }

    /// Reply with undecodable data.
    pub fn malformed_replies(&self, malformed: bool) {
        self.state.lock().unwrap().malformed = malformed;
    }

    /// After `answered` successful replies, GETNEXT/GETBULK jump back to the
    /// start of the view, producing a non-increasing identifier.
    pub fn restart_walk_after(&self, answered: usize) {
        self.state.lock().unwrap().restart_after = Some(answered);
    }

    /// Number of exchanges attempted against this agent.
    pub fn attempts(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    /// Every request received, in order, including failed attempts.
    pub fn requests(&self) -> Vec<PduRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Community string of every request received.
    pub fn communities(&self) -> Vec<String> {
        self.state.lock().unwrap().communities.clone()
    }

    async fn handle(
        &self,
        binding: &SessionBinding,
        request: &PduRequest,
    ) -> Result<Vec<RawResult>, TransportError> {
        let outcome = {
            let mut state = self.state.lock().unwrap();
            state.requests.push(request.clone());
            state.communities.push(binding.community.clone());
            if state.unreachable {
                None
            } else {
                Some(state.respond(request))
            }
        };
        match outcome {
            Some(reply) => reply,
            None => std::future::pending().await,
        }
    }
}

impl AgentState {
    fn respond(&mut self, request: &PduRequest) -> Result<Vec<RawResult>, TransportError> {
        if self.transient_failures > 0 {
            self.transient_failures -= 1;
            return Err(TransportError::Unreachable("connection refused".into()));
        }
        if self.malformed {
            return Err(TransportError::Malformed("unexpected ASN.1 tag 0x7f".into()));
        }

        let restart = self.restart_after.is_some_and(|n| self.answered >= n);
        let mut results = match request {
            PduRequest::Get(identifiers) => identifiers
                .iter()
                .map(|id| {
                    let value = self.view.get(id).cloned().unwrap_or(VarValue::NoSuchObject);
                    RawResult::new(id.clone(), value)
                })
                .collect(),
            PduRequest::GetNext(start) => {
                let from = if restart { None } else { Some(start) };
                match self.successors(from, 1).pop() {
                    Some(result) => vec![result],
                    None => vec![RawResult::new(start.clone(), VarValue::EndOfMibView)],
                }
            }
            PduRequest::GetBulk {
                start,
                max_repetitions,
            } => {
                let from = if restart { None } else { Some(start) };
                let wanted = (*max_repetitions).max(1) as usize;
                let mut batch = self.successors(from, wanted);
                if batch.len() < wanted {
                    let last = batch
                        .last()
                        .map_or_else(|| start.clone(), |r| r.identifier.clone());
                    batch.push(RawResult::new(last, VarValue::EndOfMibView));
                }
                batch
            }
        };

        if let Some(limit) = self.truncate_to {
            results.truncate(limit);
        }
        self.answered += 1;
        Ok(results)
    }

    /// Up to `count` entries strictly after `start` (or from the beginning).
    fn successors(&self, start: Option<&Oid>, count: usize) -> Vec<RawResult> {
        let lower = match start {
            Some(oid) => Bound::Excluded(oid),
            None => Bound::Unbounded,
        };
        self.view
            .range::<Oid, _>((lower, Bound::Unbounded))
            .take(count)
            .map(|(id, value)| RawResult::new(id.clone(), value.clone()))
            .collect()
    }
}

/// Session that forwards to the agent registered for the binding's host.
struct MockSession {
    agents: Arc<Mutex<HashMap<String, Arc<MockAgent>>>>,
}

#[async_trait]
impl SnmpSession for MockSession {
    async fn exchange(
        &mut self,
        binding: &SessionBinding,
        request: &PduRequest,
    ) -> Result<Vec<RawResult>, TransportError> {
        let agent = self.agents.lock().unwrap().get(&binding.host).cloned();
        match agent {
            Some(agent) => agent.handle(binding, request).await,
            None => Err(TransportError::Unreachable(format!(
                "no route to {}",
                binding.address()
            ))),
        }
    }
}

/// Session factory over a set of simulated devices.
#[derive(Default)]
pub struct MockConnector {
    agents: Arc<Mutex<HashMap<String, Arc<MockAgent>>>>,
    sessions: AtomicUsize,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route requests for `host` to `agent`.
    pub fn register(&self, host: impl Into<String>, agent: Arc<MockAgent>) {
        self.agents.lock().unwrap().insert(host.into(), agent);
    }

    /// Sessions handed out to the pool so far.
    pub fn sessions_created(&self) -> usize {
        self.sessions.load(Ordering::Relaxed)
    }
}

impl SessionFactory for MockConnector {
    fn create(&self) -> Box<dyn SnmpSession> {
        self.sessions.fetch_add(1, Ordering::Relaxed);
        Box::new(MockSession {
            agents: Arc::clone(&self.agents),
        })
    }
}

/// A device with the SNMPv2-MIB system group populated.
pub fn system_group(descr: &str, name: &str) -> Vec<(Oid, VarValue)> {
    let sys = Oid::from_slice(&[1, 3, 6, 1, 2, 1, 1]);
    vec![
        (sys.join(&[1, 0]), VarValue::text(descr)),
        (
            sys.join(&[2, 0]),
            VarValue::ObjectIdentifier(Oid::from_slice(&[1, 3, 6, 1, 4, 1, 8072, 3, 2, 10])),
        ),
        (sys.join(&[3, 0]), VarValue::TimeTicks(8_640_000)),
        (sys.join(&[4, 0]), VarValue::text("noc@example.net")),
        (sys.join(&[5, 0]), VarValue::text(name)),
        (sys.join(&[6, 0]), VarValue::text("rack 4")),
        (sys.join(&[7, 0]), VarValue::Integer(72)),
    ]
}

/// IF-MIB `ifTable` rows for interfaces `1..=count` with columns
/// ifIndex, ifDescr, ifType, ifOperStatus.
pub fn if_table(count: u32) -> Vec<(Oid, VarValue)> {
    let entry = Oid::from_slice(&[1, 3, 6, 1, 2, 1, 2, 2, 1]);
    let mut rows = vec![(
        Oid::from_slice(&[1, 3, 6, 1, 2, 1, 2, 1, 0]),
        VarValue::Integer(i64::from(count)),
    )];
    for index in 1..=count {
        rows.push((entry.join(&[1, index]), VarValue::Integer(i64::from(index))));
        rows.push((entry.join(&[2, index]), VarValue::text(&format!("eth{}", index - 1))));
        rows.push((entry.join(&[3, index]), VarValue::Integer(6)));
        rows.push((entry.join(&[8, index]), VarValue::Integer(1)));
    }
    rows
}
