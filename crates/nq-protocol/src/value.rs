//! SNMP variable bindings as returned by a device.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::oid::Oid;

/// Value carried by a single variable binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum VarValue {
    Integer(i64),
    OctetString(Vec<u8>),
    ObjectIdentifier(Oid),
    IpAddress([u8; 4]),
    Counter32(u32),
    Counter64(u64),
    Gauge32(u32),
    TimeTicks(u32),
    Null,
    NoSuchObject,
    NoSuchInstance,
    EndOfMibView,
}

/// Coarse classification of a [`VarValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Integer,
    String,
    /// Counters, gauges and time-ticks.
    Counter,
    ObjectIdentifier,
    /// Null and the v2c exception values.
    Null,
}

impl VarValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            VarValue::Integer(_) => ValueKind::Integer,
            VarValue::OctetString(_) | VarValue::IpAddress(_) => ValueKind::String,
            VarValue::Counter32(_)
            | VarValue::Counter64(_)
            | VarValue::Gauge32(_)
            | VarValue::TimeTicks(_) => ValueKind::Counter,
            VarValue::ObjectIdentifier(_) => ValueKind::ObjectIdentifier,
            VarValue::Null
            | VarValue::NoSuchObject
            | VarValue::NoSuchInstance
            | VarValue::EndOfMibView => ValueKind::Null,
        }
    }

    /// Shorthand for an octet string holding text.
    pub fn text(s: &str) -> Self {
        VarValue::OctetString(s.as_bytes().to_vec())
    }

    /// End of a walk: the agent has nothing further in its view.
    pub fn is_end_of_view(&self) -> bool {
        matches!(self, VarValue::EndOfMibView)
    }

    /// noSuchObject / noSuchInstance exceptions.
    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            VarValue::NoSuchObject | VarValue::NoSuchInstance | VarValue::EndOfMibView
        )
    }
}

impl fmt::Display for VarValue {
    /// Octet strings print as UTF-8 when they decode cleanly, otherwise as
    /// colon-separated hex (MAC addresses and other binary payloads).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarValue::Integer(n) => write!(f, "{n}"),
            VarValue::OctetString(bytes) => match std::str::from_utf8(bytes) {
                Ok(s) if !s.chars().any(|c| c.is_control() && c != '\n' && c != '\r' && c != '\t') => {
                    f.write_str(s)
                }
                _ => {
                    let hex: Vec<String> = bytes.iter().map(|b| format!("{b:02x}")).collect();
                    f.write_str(&hex.join(":"))
                }
            },
            VarValue::ObjectIdentifier(oid) => write!(f, "{oid}"),
            VarValue::IpAddress([a, b, c, d]) => write!(f, "{a}.{b}.{c}.{d}"),
            VarValue::Counter32(n) | VarValue::Gauge32(n) => write!(f, "{n}"),
            VarValue::Counter64(n) => write!(f, "{n}"),
            VarValue::TimeTicks(ticks) => {
                let secs = ticks / 100;
                let (days, rem) = (secs / 86_400, secs % 86_400);
                let (hours, rem) = (rem / 3600, rem % 3600);
                let (mins, secs) = (rem / 60, rem % 60);
                write!(f, "({ticks}) {days}d {hours:02}:{mins:02}:{secs:02}")
            }
            VarValue::Null => f.write_str("NULL"),
            VarValue::NoSuchObject => f.write_str("noSuchObject"),
            VarValue::NoSuchInstance => f.write_str("noSuchInstance"),
            VarValue::EndOfMibView => f.write_str("endOfMibView"),
        }
    }
}

/// One variable binding returned by a device, in device order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResult {
    pub identifier: Oid,
    pub value: VarValue,
}

impl RawResult {
    pub fn new(identifier: Oid, value: VarValue) -> Self {
        Self { identifier, value }
    }

    pub fn kind(&self) -> ValueKind {
        self.value.kind()
    }
}
