use serde::{Deserialize, Serialize};

use crate::oid::Oid;
use crate::value::VarValue;

/// One device result annotated from the schema repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEntry {
    /// Identifier exactly as the device returned it.
    pub identifier: Oid,
    pub value: VarValue,
    /// Symbolic name such as `ifDescr.2`; absent when unresolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Schema description, empty when unresolved.
    #[serde(default)]
    pub description: String,
    /// Whether the identifier matched a loaded schema entry.
    #[serde(default)]
    pub resolved: bool,
}

impl ResponseEntry {
    /// Entry for an identifier no loaded module knows about.
    pub fn unresolved(identifier: Oid, value: VarValue) -> Self {
        Self {
            identifier,
            value,
            name: None,
            description: String::new(),
            resolved: false,
        }
    }

    pub fn resolved(
        identifier: Oid,
        value: VarValue,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            identifier,
            value,
            name: Some(name.into()),
            description: description.into(),
            resolved: true,
        }
    }
}

/// Annotated answer to a query, entries in device order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub results: Vec<ResponseEntry>,
}

impl Response {
    pub fn new(results: Vec<ResponseEntry>) -> Self {
        Self { results }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_entry_shape() {
        let entry = ResponseEntry::unresolved("1.3.6.1.4.1.99.1".parse().unwrap(), VarValue::Integer(7));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["identifier"], "1.3.6.1.4.1.99.1");
        assert_eq!(json["description"], "");
        assert_eq!(json["resolved"], false);
        assert!(json.get("name").is_none());
    }

    #[test]
    fn response_json_roundtrip() {
        let response = Response::new(vec![ResponseEntry::resolved(
            "1.3.6.1.2.1.1.5.0".parse().unwrap(),
            VarValue::text("core-sw"),
            "sysName.0",
            "An administratively-assigned name for this managed node.",
        )]);
        let bytes = serde_json::to_vec(&response).unwrap();
        let back: Response = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, response);
        assert_eq!(back.results[0].name.as_deref(), Some("sysName.0"));
    }
}
