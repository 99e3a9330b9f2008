//! Session bindings, client settings and request PDUs.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use nq_protocol::Oid;
use serde::{Deserialize, Serialize};

/// Default SNMP agent port.
pub const DEFAULT_PORT: u16 = 161;

/// Community-based protocol versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SnmpVersion {
    V1,
    #[default]
    V2c,
}

impl SnmpVersion {
    /// v1 has no GETBULK.
    pub fn supports_bulk(&self) -> bool {
        matches!(self, SnmpVersion::V2c)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SnmpVersion::V1 => "1",
            SnmpVersion::V2c => "2c",
        }
    }
}

impl fmt::Display for SnmpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SnmpVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "v1" => Ok(SnmpVersion::V1),
            "2c" | "v2c" | "2" => Ok(SnmpVersion::V2c),
            other => Err(format!("unsupported SNMP version '{other}' (expected 1 or 2c)")),
        }
    }
}

impl TryFrom<String> for SnmpVersion {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SnmpVersion> for String {
    fn from(version: SnmpVersion) -> Self {
        version.as_str().to_string()
    }
}

/// Client-wide settings applied to every round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub version: SnmpVersion,
    pub community: String,
    /// Port used when the target does not carry one.
    pub port: u16,
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// Extra attempts after the first.
    pub retries: u32,
    /// Bindings requested per GETBULK.
    pub max_repetitions: u32,
    /// Idle sessions retained by the pool.
    pub pool_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            version: SnmpVersion::V2c,
            community: "public".into(),
            port: DEFAULT_PORT,
            timeout: Duration::from_secs(5),
            retries: 3,
            max_repetitions: 10,
            pool_size: 16,
        }
    }
}

/// Everything a session needs for one round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionBinding {
    pub host: String,
    pub port: u16,
    pub version: SnmpVersion,
    pub community: String,
    pub timeout: Duration,
    pub retries: u32,
}

impl SessionBinding {
    /// `host:port`, IPv6 hosts bracketed.
    pub fn address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Request PDU sent in one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PduRequest {
    Get(Vec<Oid>),
    GetNext(Oid),
    GetBulk { start: Oid, max_repetitions: u32 },
}

impl PduRequest {
    pub fn name(&self) -> &'static str {
        match self {
            PduRequest::Get(_) => "get",
            PduRequest::GetNext(_) => "getnext",
            PduRequest::GetBulk { .. } => "getbulk",
        }
    }
}
