//! Schema repository: loaded MIB modules indexed by identifier and name.
//!
//! Single writer, many readers. Loads are serialized by an async mutex held
//! across source I/O; the index sits behind a `RwLock` so lookups from
//! concurrent requests never wait on each other, only briefly on a load
//! swapping its entries in.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use nq_protocol::{Oid, SchemaEntry, dotted_suffix, is_dotted_numeric};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::base;
use crate::error::{SchemaError, SchemaResult};
use crate::parser;
use crate::source::ModuleSource;

/// A loaded module as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleInfo {
    pub name: String,
    pub entries: usize,
    pub builtin: bool,
    pub loaded_at: DateTime<Utc>,
}

/// What a `load_module` call did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadOutcome {
    pub module: String,
    pub entries: usize,
    /// False when the content was identical to what was already loaded.
    pub changed: bool,
    /// Definitions dropped because their parent could not be resolved.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unresolved: Vec<String>,
}

/// Result of loading several modules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub loaded: Vec<LoadOutcome>,
    pub failed: Vec<(String, String)>,
}

struct ModuleRecord {
    fingerprint: Option<u64>,
    identifiers: Vec<Oid>,
    loaded_at: DateTime<Utc>,
}

#[derive(Default)]
struct SchemaState {
    entries: BTreeMap<Oid, SchemaEntry>,
    names: HashMap<String, Oid>,
    modules: BTreeMap<String, ModuleRecord>,
}

impl SchemaState {
    /// Replace everything `module` contributed with `entries`.
    fn install(&mut self, module: &str, entries: Vec<SchemaEntry>, fingerprint: Option<u64>) {
        if let Some(previous) = self.modules.remove(module) {
            for identifier in previous.identifiers {
                if self
                    .entries
                    .get(&identifier)
                    .is_some_and(|e| e.module == module)
                {
                    self.entries.remove(&identifier);
                }
            }
        }

        let identifiers = entries.iter().map(|e| e.identifier.clone()).collect();
        for entry in entries {
            self.entries.insert(entry.identifier.clone(), entry);
        }
        self.modules.insert(
            module.to_string(),
            ModuleRecord {
                fingerprint,
                identifiers,
                loaded_at: Utc::now(),
            },
        );
        self.reindex_names();
    }

    fn reindex_names(&mut self) {
        self.names = self
            .entries
            .values()
            .map(|e| (e.name.clone(), e.identifier.clone()))
            .collect();
    }

    fn lookup_name(&self, module: Option<&str>, name: &str) -> Option<Oid> {
        match module {
            None => self.names.get(name).cloned(),
            Some(module) => self.modules.get(module)?.identifiers.iter().find_map(|id| {
                self.entries
                    .get(id)
                    .filter(|e| e.name == name && e.module == module)
                    .map(|e| e.identifier.clone())
            }),
        }
    }
}

fn fingerprint(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

/// Identifier ↔ name/description index over loaded MIB modules.
pub struct SchemaRepository {
    source: Arc<dyn ModuleSource>,
    state: RwLock<SchemaState>,
    load_lock: Mutex<()>,
    generation: AtomicU64,
}

impl SchemaRepository {
    /// Repository seeded with the built-in base modules.
    pub fn new(source: Arc<dyn ModuleSource>) -> Self {
        let mut state = SchemaState::default();
        for module in base::BASE_MODULES {
            if let Some(entries) = base::entries(module) {
                state.install(module, entries, None);
            }
        }
        Self {
            source,
            state: RwLock::new(state),
            load_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// Bumped by every load that changed the schema.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn read(&self) -> RwLockReadGuard<'_, SchemaState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SchemaState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Load (or reload) module `name` from the source.
    ///
    /// Identical content is a no-op. Changed content replaces the module's
    /// entries, dropping any it no longer defines.
    pub async fn load_module(&self, name: &str) -> SchemaResult<LoadOutcome> {
        let _guard = self.load_lock.lock().await;

        let text = self.source.read_module(name).await?;
        let digest = fingerprint(&text);

        {
            let state = self.read();
            if let Some(record) = state.modules.get(name)
                && record.fingerprint == Some(digest)
            {
                return Ok(LoadOutcome {
                    module: name.to_string(),
                    entries: record.identifiers.len(),
                    changed: false,
                    unresolved: Vec::new(),
                });
            }
        }

        let parsed = parser::parse(&text).map_err(|e| SchemaError::Parse {
            module: name.to_string(),
            line: e.line,
            message: e.message,
        })?;
        if parsed.name != name {
            warn!(module = name, declared = %parsed.name, "module name differs from its definition header");
        }

        let (entries, unresolved) = {
            let state = self.read();
            parsed.resolve(name, |parent| state.names.get(parent).cloned())
        };
        if !unresolved.is_empty() {
            warn!(module = name, unresolved = ?unresolved, "dropping definitions with unknown parents");
        }
        if entries.is_empty() && !parsed.definitions.is_empty() {
            return Err(SchemaError::Parse {
                module: name.to_string(),
                line: parsed.definitions[0].line,
                message: "no definition could be resolved to an identifier".into(),
            });
        }

        let count = entries.len();
        self.write().install(name, entries, Some(digest));
        self.generation.fetch_add(1, Ordering::SeqCst);
        info!(module = name, entries = count, "MIB module loaded");

        Ok(LoadOutcome {
            module: name.to_string(),
            entries: count,
            changed: true,
            unresolved,
        })
    }

    /// Load each named module, collecting failures instead of stopping.
    pub async fn load_modules(&self, names: &[String]) -> LoadSummary {
        let mut summary = LoadSummary::default();
        for name in names {
            match self.load_module(name).await {
                Ok(outcome) => summary.loaded.push(outcome),
                Err(e) => {
                    warn!(module = %name, error = %e, "MIB module failed to load");
                    summary.failed.push((name.clone(), e.to_string()));
                }
            }
        }
        summary
    }

    /// Load every module the source offers.
    pub async fn load_all(&self) -> SchemaResult<LoadSummary> {
        let names = self.available_modules().await?;
        Ok(self.load_modules(&names).await)
    }

    /// Modules the source could load.
    pub async fn available_modules(&self) -> SchemaResult<Vec<String>> {
        self.source.list_modules().await
    }

    /// Modules whose load completed, including the built-in ones.
    pub fn list_loaded_modules(&self) -> Vec<ModuleInfo> {
        self.read()
            .modules
            .iter()
            .map(|(name, record)| ModuleInfo {
                name: name.clone(),
                entries: record.identifiers.len(),
                builtin: record.fingerprint.is_none(),
                loaded_at: record.loaded_at,
            })
            .collect()
    }

    /// Entries of a loaded module, ordered by identifier.
    pub fn module_entries(&self, name: &str) -> SchemaResult<Vec<SchemaEntry>> {
        let state = self.read();
        let record = state
            .modules
            .get(name)
            .ok_or_else(|| SchemaError::NotFound(name.to_string()))?;
        let mut entries: Vec<SchemaEntry> = record
            .identifiers
            .iter()
            .filter_map(|id| state.entries.get(id))
            .filter(|e| e.module == name)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        Ok(entries)
    }

    /// Entry for `identifier`. An exact match wins; otherwise the closest
    /// enclosing OBJECT-TYPE is returned with the instance suffix appended to
    /// its name and `identifier` as given (`sysDescr.0`, `ifDescr.3`).
    pub fn resolve(&self, identifier: &Oid) -> Option<SchemaEntry> {
        let state = self.read();
        if let Some(entry) = state.entries.get(identifier) {
            return Some(entry.clone());
        }
        let arcs = identifier.arcs();
        (1..arcs.len()).rev().find_map(|len| {
            let prefix = Oid::from_slice(&arcs[..len]);
            let entry = state.entries.get(&prefix)?;
            if !entry.kind.is_object_type() {
                return None;
            }
            let mut instance = entry.clone();
            instance.name = format!("{}{}", entry.name, dotted_suffix(&arcs[len..]));
            instance.identifier = identifier.clone();
            Some(instance)
        })
    }

    /// Numeric identifier for a symbolic name.
    ///
    /// Accepts `sysDescr`, `SNMPv2-MIB::sysDescr`, instance notation such as
    /// `ifDescr.3`, and dotted-numeric identifiers (returned as-is).
    pub fn resolve_name(&self, name: &str) -> Option<Oid> {
        let name = name.trim();
        let dotted = name.strip_prefix('.').unwrap_or(name);
        if is_dotted_numeric(dotted) {
            return dotted.parse().ok();
        }

        let (module, symbol) = match name.split_once("::") {
            Some((module, symbol)) => (Some(module), symbol),
            None => (None, name),
        };
        let state = self.read();
        if let Some(oid) = state.lookup_name(module, symbol) {
            return Some(oid);
        }
        let (base, index) = symbol.split_once('.')?;
        if !is_dotted_numeric(index) {
            return None;
        }
        let base = state.lookup_name(module, base)?;
        let suffix: Vec<u32> = index
            .split('.')
            .map(str::parse)
            .collect::<Result<_, _>>()
            .ok()?;
        Some(base.join(&suffix))
    }

    /// `MODULE::name[.suffix]` for an identifier.
    pub fn translate(&self, identifier: &Oid) -> Option<String> {
        self.resolve(identifier).map(|entry| entry.qualified_name())
    }

    /// Total entries across all modules.
    pub fn entry_count(&self) -> usize {
        self.read().entries.len()
    }
}
