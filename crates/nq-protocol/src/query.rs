//! Structured device queries and their validation.
//!
//! A `Query` can only be obtained by validating a [`CandidateQuery`], either
//! explicitly through `TryFrom` or implicitly when deserializing a `Query`
//! (for example out of the query cache). The check is pure: no network or
//! name resolution happens here.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::oid::{Oid, OidParseError};

static HOST_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?$").expect("static regex")
});

/// The closed operation vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// Fetch exactly the named identifiers.
    #[serde(rename = "GET")]
    Get,
    /// Enumerate a subtree one GETNEXT at a time.
    #[serde(rename = "WALK")]
    Walk,
    /// Enumerate a subtree with multi-binding GETBULK requests.
    #[serde(rename = "BULKWALK")]
    BulkWalk,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Get => "GET",
            Operation::Walk => "WALK",
            Operation::BulkWalk => "BULKWALK",
        }
    }

    /// Walk operations take exactly one root identifier.
    pub fn is_walk(&self) -> bool {
        matches!(self, Operation::Walk | Operation::BulkWalk)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = ValidationError;

    /// Case-insensitive; accepts the `BULK`/`BULK_WALK` spellings providers
    /// tend to produce.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Operation::Get),
            "WALK" => Ok(Operation::Walk),
            "BULKWALK" | "BULK_WALK" | "BULK-WALK" | "BULK" => Ok(Operation::BulkWalk),
            _ => Err(ValidationError::UnsupportedOperation(s.to_string())),
        }
    }
}

/// Why a candidate query was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unsupported operation '{0}' (expected GET, WALK or BULKWALK)")]
    UnsupportedOperation(String),

    #[error("query carries no identifiers")]
    NoIdentifiers,

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(#[from] OidParseError),

    #[error("{operation} takes exactly one root identifier, got {count}")]
    RootCount { operation: Operation, count: usize },

    #[error("invalid target '{0}': expected an IP address or hostname")]
    InvalidTarget(String),
}

/// Unvalidated query as produced by an interpretation provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateQuery {
    /// IP address or hostname, optionally with `:port`.
    pub target: String,
    /// Operation name; parsed case-insensitively during validation.
    pub operation: String,
    /// Dotted-numeric identifiers.
    #[serde(default, alias = "oids")]
    pub identifiers: Vec<String>,
}

impl CandidateQuery {
    pub fn new(
        target: impl Into<String>,
        operation: impl Into<String>,
        identifiers: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            target: target.into(),
            operation: operation.into(),
            identifiers: identifiers.into_iter().map(Into::into).collect(),
        }
    }

    /// Run validation, producing an immutable [`Query`].
    pub fn validate(self) -> Result<Query, ValidationError> {
        Query::try_from(self)
    }
}

/// A validated query against exactly one device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "CandidateQuery")]
pub struct Query {
    target: String,
    operation: Operation,
    identifiers: Vec<Oid>,
}

impl Query {
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn identifiers(&self) -> &[Oid] {
        &self.identifiers
    }

    /// The walk root. For GET queries this is the first identifier.
    pub fn root(&self) -> &Oid {
        &self.identifiers[0]
    }

    /// Host part of the target, without port or IPv6 brackets.
    pub fn host(&self) -> &str {
        split_target(&self.target).map_or(&self.target, |(host, _)| host)
    }

    /// `host:port` socket address, using `default_port` when the target
    /// carries none.
    pub fn socket_addr(&self, default_port: u16) -> String {
        socket_addr(&self.target, default_port)
    }
}

impl TryFrom<CandidateQuery> for Query {
    type Error = ValidationError;

    fn try_from(candidate: CandidateQuery) -> Result<Self, Self::Error> {
        let operation: Operation = candidate.operation.parse()?;

        let target = candidate.target.trim().to_string();
        if !is_valid_target(&target) {
            return Err(ValidationError::InvalidTarget(candidate.target));
        }

        if candidate.identifiers.is_empty() {
            return Err(ValidationError::NoIdentifiers);
        }
        if operation.is_walk() && candidate.identifiers.len() != 1 {
            return Err(ValidationError::RootCount {
                operation,
                count: candidate.identifiers.len(),
            });
        }

        let identifiers = candidate
            .identifiers
            .iter()
            .map(|s| s.trim().parse::<Oid>())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Query {
            target,
            operation,
            identifiers,
        })
    }
}

/// Split `host[:port]` / `[v6]:port` into host and optional port.
///
/// Returns None when the port part is present but not a valid u16.
pub fn split_target(target: &str) -> Option<(&str, Option<u16>)> {
    if let Some(rest) = target.strip_prefix('[') {
        let (host, after) = rest.split_once(']')?;
        return match after.strip_prefix(':') {
            Some(port) => Some((host, Some(port.parse().ok()?))),
            None if after.is_empty() => Some((host, None)),
            None => None,
        };
    }
    // Bare IPv6 has several colons and no port.
    if target.matches(':').count() > 1 {
        return Some((target, None));
    }
    match target.split_once(':') {
        Some((host, port)) => Some((host, Some(port.parse().ok()?))),
        None => Some((target, None)),
    }
}

/// Format a target as `host:port`, bracketing IPv6 hosts.
pub fn socket_addr(target: &str, default_port: u16) -> String {
    let (host, port) = split_target(target).unwrap_or((target, None));
    let port = port.unwrap_or(default_port);
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

/// True for an IPv4/IPv6 literal or an RFC 1123 hostname, with optional port.
pub fn is_valid_target(target: &str) -> bool {
    let Some((host, _port)) = split_target(target) else {
        return false;
    };
    if host.is_empty() {
        return false;
    }
    if host.parse::<IpAddr>().is_ok() {
        return true;
    }
    is_valid_hostname(host)
}

fn is_valid_hostname(host: &str) -> bool {
    let host = host.strip_suffix('.').unwrap_or(host);
    if host.is_empty() || host.len() > 253 {
        return false;
    }
    let labels: Vec<&str> = host.split('.').collect();
    if !labels.iter().all(|label| HOST_LABEL.is_match(label)) {
        return false;
    }
    // An all-numeric last label is a malformed IPv4 address, not a hostname.
    labels
        .last()
        .is_some_and(|tld| !tld.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(target: &str, op: &str, ids: &[&str]) -> CandidateQuery {
        CandidateQuery::new(target, op, ids.iter().copied())
    }

    #[test]
    fn valid_get_query() {
        let q = candidate("192.168.1.1", "GET", &["1.3.6.1.2.1.1.1.0", "1.3.6.1.2.1.1.5.0"])
            .validate()
            .unwrap();
        assert_eq!(q.operation(), Operation::Get);
        assert_eq!(q.identifiers().len(), 2);
        assert_eq!(q.target(), "192.168.1.1");
    }

    #[test]
    fn operation_is_case_insensitive() {
        let q = candidate("10.0.0.1", "bulkwalk", &["1.3.6.1.2.1.2.2"])
            .validate()
            .unwrap();
        assert_eq!(q.operation(), Operation::BulkWalk);
        assert_eq!("walk".parse::<Operation>().unwrap(), Operation::Walk);
    }

    #[test]
    fn unknown_operation_rejected() {
        let err = candidate("10.0.0.1", "SET", &["1.3.6.1"]).validate().unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedOperation(op) if op == "SET"));
    }

    #[test]
    fn walk_requires_single_root() {
        let err = candidate("10.0.0.1", "WALK", &["1.3.6.1.2.1.1", "1.3.6.1.2.1.2"])
            .validate()
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::RootCount {
                operation: Operation::Walk,
                count: 2
            }
        );
    }

    #[test]
    fn empty_identifiers_rejected() {
        let err = candidate("10.0.0.1", "GET", &[]).validate().unwrap_err();
        assert_eq!(err, ValidationError::NoIdentifiers);
    }

    #[test]
    fn malformed_identifiers_rejected() {
        for bad in ["1..3", "sysDescr.0", "1.3.6.x", "", "1.3.6.1.", "1.3 6"] {
            let err = candidate("10.0.0.1", "GET", &[bad]).validate().unwrap_err();
            assert!(
                matches!(err, ValidationError::InvalidIdentifier(_)),
                "{bad:?} should be rejected, got {err:?}"
            );
        }
    }

    #[test]
    fn targets() {
        for good in [
            "10.0.0.1",
            "10.0.0.1:1161",
            "::1",
            "[fe80::1]:161",
            "router-1.example.com",
            "core-sw",
            "switch01.lab.",
        ] {
            assert!(is_valid_target(good), "{good} should be accepted");
        }
        for bad in [
            "",
            "999.1.1.1",
            "10.0.0.1:99999",
            "bad_host",
            "-leading.example.com",
            "a..b",
            "host name",
            "[::1",
        ] {
            assert!(!is_valid_target(bad), "{bad} should be rejected");
        }
    }

    #[test]
    fn socket_addr_formatting() {
        let q = candidate("10.0.0.1", "GET", &["1.3"]).validate().unwrap();
        assert_eq!(q.socket_addr(161), "10.0.0.1:161");
        let q = candidate("10.0.0.1:1161", "GET", &["1.3"]).validate().unwrap();
        assert_eq!(q.socket_addr(161), "10.0.0.1:1161");
        assert_eq!(q.host(), "10.0.0.1");
        let q = candidate("fe80::1", "GET", &["1.3"]).validate().unwrap();
        assert_eq!(q.socket_addr(161), "[fe80::1]:161");
    }

    #[test]
    fn deserialization_revalidates() {
        let ok = r#"{"target":"10.0.0.1","operation":"GET","identifiers":["1.3.6.1.2.1.1.1.0"]}"#;
        let q: Query = serde_json::from_str(ok).unwrap();
        assert_eq!(q.root().to_string(), "1.3.6.1.2.1.1.1.0");

        let bad = r#"{"target":"10.0.0.1","operation":"GET","identifiers":["1..3"]}"#;
        assert!(serde_json::from_str::<Query>(bad).is_err());
    }

    #[test]
    fn oids_alias_accepted() {
        let json = r#"{"target":"10.0.0.1","operation":"walk","oids":["1.3.6.1.2.1"]}"#;
        let c: CandidateQuery = serde_json::from_str(json).unwrap();
        assert_eq!(c.identifiers, vec!["1.3.6.1.2.1"]);
    }

    #[test]
    fn query_serializes_canonically() {
        let q = candidate("10.0.0.1", "bulk", &["1.3.6.1.2.1.2.2"]).validate().unwrap();
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["operation"], "BULKWALK");
        assert_eq!(json["identifiers"][0], "1.3.6.1.2.1.2.2");
        let back: Query = serde_json::from_value(json).unwrap();
        assert_eq!(back, q);
    }
}
