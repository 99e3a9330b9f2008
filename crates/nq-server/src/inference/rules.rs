//! Rule-based interpretation: pattern matching for common requests.
//!
//! Handles the usual system-group and interface questions, plus requests
//! that spell out numeric identifiers, without a network call. Anything it
//! cannot match (or that names no device) falls through to the LLM tier.

use async_trait::async_trait;
use nq_protocol::{CandidateQuery, is_dotted_numeric, is_valid_target, split_target};

use super::{InterpretationProvider, ModelConfig};

/// Pattern-matching provider for well-known objects.
pub struct RuleBasedProvider;

impl RuleBasedProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RuleBasedProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InterpretationProvider for RuleBasedProvider {
    async fn interpret(&self, text: &str, _model: &ModelConfig) -> Option<CandidateQuery> {
        parse_request(text)
    }

    fn tier_name(&self) -> &str {
        "local"
    }
}

struct NamedObject {
    keywords: &'static [&'static str],
    operation: &'static str,
    identifier: &'static str,
}

/// Checked in order; more specific phrases come first.
const NAMED_OBJECTS: &[NamedObject] = &[
    // IF-MIB
    NamedObject {
        keywords: &["number of interfaces", "interface count", "how many interfaces", "ifnumber"],
        operation: "GET",
        identifier: "1.3.6.1.2.1.2.1.0",
    },
    NamedObject {
        keywords: &["interface name", "interface description", "ifdescr"],
        operation: "WALK",
        identifier: "1.3.6.1.2.1.2.2.1.2",
    },
    NamedObject {
        keywords: &["interface status", "ifoperstatus", "link status"],
        operation: "WALK",
        identifier: "1.3.6.1.2.1.2.2.1.8",
    },
    NamedObject {
        keywords: &["interface", "iftable", "ports"],
        operation: "WALK",
        identifier: "1.3.6.1.2.1.2.2",
    },
    // SNMPv2-MIB system group
    NamedObject {
        keywords: &["system info", "system group", "everything about"],
        operation: "WALK",
        identifier: "1.3.6.1.2.1.1",
    },
    NamedObject {
        keywords: &["system description", "sysdescr", "description", "describe"],
        operation: "GET",
        identifier: "1.3.6.1.2.1.1.1.0",
    },
    NamedObject {
        keywords: &["object id", "sysobjectid", "vendor oid"],
        operation: "GET",
        identifier: "1.3.6.1.2.1.1.2.0",
    },
    NamedObject {
        keywords: &["uptime", "up time", "how long"],
        operation: "GET",
        identifier: "1.3.6.1.2.1.1.3.0",
    },
    NamedObject {
        keywords: &["contact"],
        operation: "GET",
        identifier: "1.3.6.1.2.1.1.4.0",
    },
    NamedObject {
        keywords: &["system name", "sysname", "hostname", "host name", "device name"],
        operation: "GET",
        identifier: "1.3.6.1.2.1.1.5.0",
    },
    NamedObject {
        keywords: &["location", "where is"],
        operation: "GET",
        identifier: "1.3.6.1.2.1.1.6.0",
    },
    NamedObject {
        keywords: &["services", "sysservices"],
        operation: "GET",
        identifier: "1.3.6.1.2.1.1.7.0",
    },
];

/// Words that introduce a hostname target ("uptime of core-sw1.lab").
const TARGET_MARKERS: &[&str] = &["on", "from", "at", "for", "of", "to", "device", "host"];

/// Core pattern matching logic.
fn parse_request(text: &str) -> Option<CandidateQuery> {
    let lower = text.to_lowercase();
    let tokens: Vec<&str> = lower.split_whitespace().map(clean_token).collect();

    let mut target = None;
    let mut identifiers = Vec::new();
    let mut rest = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        if target.is_none() && is_ipv4_target(token) {
            target = Some(token.to_string());
        } else if let Some(identifier) = as_identifier(token) {
            identifiers.push(identifier.to_string());
        } else if target.is_none()
            && i > 0
            && TARGET_MARKERS.contains(&tokens[i - 1])
            && is_hostname_target(token)
        {
            target = Some(token.to_string());
        } else {
            rest.push(*token);
        }
    }
    let target = target?;
    let rest = rest.join(" ");

    if !identifiers.is_empty() {
        let operation = if rest.contains("bulk") {
            "BULKWALK"
        } else if matches_any(&rest, &["walk", "list", "table", "subtree", "all "]) {
            "WALK"
        } else {
            "GET"
        };
        return Some(CandidateQuery::new(target, operation, identifiers));
    }

    let named = NAMED_OBJECTS
        .iter()
        .find(|named| matches_any(&rest, named.keywords))?;
    let operation = if named.operation == "WALK" && rest.contains("bulk") {
        "BULKWALK"
    } else {
        named.operation
    };
    Some(CandidateQuery::new(target, operation, [named.identifier]))
}

/// Check if the text contains any of the given patterns.
fn matches_any(text: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|p| text.contains(p))
}

/// Strip sentence punctuation and quotes around a word.
fn clean_token(token: &str) -> &str {
    token
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '(' | ')' | '`'))
        .trim_end_matches(|c: char| matches!(c, '?' | '!' | ',' | ';' | '.'))
}

/// `a.b.c.d[:port]`, excluding anything under the `iso.org` arc so that
/// short identifiers like `1.3.6.1` are not mistaken for addresses.
fn is_ipv4_target(token: &str) -> bool {
    if token.starts_with("1.3.") {
        return false;
    }
    let Some((host, _)) = split_target(token) else {
        return false;
    };
    let octets: Vec<&str> = host.split('.').collect();
    octets.len() == 4 && octets.iter().all(|o| !o.is_empty() && o.parse::<u8>().is_ok())
}

/// Dotted identifier with at least two arcs; a leading dot is allowed.
fn as_identifier(token: &str) -> Option<&str> {
    let identifier = token.strip_prefix('.').unwrap_or(token);
    (identifier.contains('.') && is_dotted_numeric(identifier)).then_some(identifier)
}

/// Qualified hostnames only, so ordinary words after "on"/"for" are ignored.
fn is_hostname_target(token: &str) -> bool {
    let host = split_target(token).map_or(token, |(host, _)| host);
    (host == "localhost" || (host.contains('.') && host.chars().any(|c| c.is_ascii_alphabetic())))
        && is_valid_target(token)
}
