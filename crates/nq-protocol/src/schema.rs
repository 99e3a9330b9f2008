use serde::{Deserialize, Serialize};

use crate::oid::Oid;

/// Which MIB macro defined an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Plain `name OBJECT IDENTIFIER ::= { ... }` assignment.
    ObjectIdentifier,
    ModuleIdentity,
    ObjectIdentity,
    /// A managed object; only these match instance identifiers by prefix.
    ObjectType,
    NotificationType,
    ObjectGroup,
    NotificationGroup,
    ModuleCompliance,
}

impl EntryKind {
    pub fn is_object_type(&self) -> bool {
        matches!(self, EntryKind::ObjectType)
    }
}

/// A named node from a loaded MIB module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaEntry {
    /// Defining module, e.g. `IF-MIB`.
    pub module: String,
    pub name: String,
    pub identifier: Oid,
    #[serde(default)]
    pub description: String,
    /// SYNTAX clause as written, empty for non-object entries.
    #[serde(rename = "type", default)]
    pub syntax: String,
    pub kind: EntryKind,
}

impl SchemaEntry {
    /// `MODULE::name`.
    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.module, self.name)
    }
}
