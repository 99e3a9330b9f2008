//! In-memory module source for tests.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::{SchemaError, SchemaResult};
use crate::source::ModuleSource;

/// Module source backed by a map of name to text.
#[derive(Default)]
pub struct MockModuleSource {
    modules: Mutex<BTreeMap<String, String>>,
    reads: AtomicUsize,
}

impl MockModuleSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(name: &str, text: &str) -> Self {
        let source = Self::new();
        source.insert(name, text);
        source
    }

    /// Add or replace a module.
    pub fn insert(&self, name: &str, text: &str) {
        self.modules
            .lock()
            .unwrap()
            .insert(name.to_string(), text.to_string());
    }

    pub fn remove(&self, name: &str) {
        self.modules.lock().unwrap().remove(name);
    }

    /// Number of `read_module` calls so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ModuleSource for MockModuleSource {
    async fn read_module(&self, name: &str) -> SchemaResult<String> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.modules
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| SchemaError::NotFound(name.to_string()))
    }

    async fn list_modules(&self) -> SchemaResult<Vec<String>> {
        Ok(self.modules.lock().unwrap().keys().cloned().collect())
    }
}
