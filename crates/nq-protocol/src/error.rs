use std::fmt;

use serde::{Deserialize, Serialize};

/// Category of a failure, shared by every layer so the boundary can map it
/// without knowing the concrete error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Device unreachable after all retries.
    Connect,
    /// Malformed or mismatched device reply.
    Protocol,
    /// Fewer bindings than requested.
    PartialResponse,
    /// Walk returned a non-increasing identifier.
    WalkBoundary,
    /// Unknown MIB module.
    NotFound,
    /// MIB content could not be parsed.
    Parse,
    /// Provider produced no usable candidate.
    Interpretation,
    /// Candidate failed validation.
    Validation,
    /// Cache backend failure; never fails a request.
    Cache,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Connect => "connect",
            ErrorKind::Protocol => "protocol",
            ErrorKind::PartialResponse => "partial_response",
            ErrorKind::WalkBoundary => "walk_boundary",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Parse => "parse",
            ErrorKind::Interpretation => "interpretation",
            ErrorKind::Validation => "validation",
            ErrorKind::Cache => "cache",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
