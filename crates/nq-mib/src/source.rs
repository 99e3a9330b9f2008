//! Module source abstraction: where MIB text comes from.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{SchemaError, SchemaResult};

/// File extensions tried in order when reading a module.
const EXTENSIONS: [&str; 2] = ["mib", "txt"];

/// Supplies raw MIB module text by name.
///
/// Enables mocking in tests and alternative backends.
#[async_trait]
pub trait ModuleSource: Send + Sync {
    /// Read the full text of module `name`.
    async fn read_module(&self, name: &str) -> SchemaResult<String>;

    /// Names of every module this source can provide.
    async fn list_modules(&self) -> SchemaResult<Vec<String>>;
}

/// Reads `<root>/<name>.mib` (or `.txt`) from the local filesystem.
pub struct FileModuleSource {
    root: PathBuf,
}

impl FileModuleSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Module names are bare identifiers; anything that could escape the
/// repository directory is rejected.
fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

#[async_trait]
impl ModuleSource for FileModuleSource {
    async fn read_module(&self, name: &str) -> SchemaResult<String> {
        if !is_safe_name(name) {
            return Err(SchemaError::NotFound(name.to_string()));
        }
        for ext in EXTENSIONS {
            let path = self.root.join(format!("{name}.{ext}"));
            match tokio::fs::read(&path).await {
                Ok(bytes) => return Ok(String::from_utf8_lossy(&bytes).into_owned()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(SchemaError::Io(format!("{}: {e}", path.display()))),
            }
        }
        Err(SchemaError::NotFound(name.to_string()))
    }

    async fn list_modules(&self) -> SchemaResult<Vec<String>> {
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(SchemaError::Io(format!("{}: {e}", self.root.display()))),
        };

        let mut names = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| SchemaError::Io(format!("{}: {e}", self.root.display())))?
        {
            let path = entry.path();
            let has_mib_ext = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| EXTENSIONS.contains(&ext));
            if !has_mib_ext {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        names.dedup();
        Ok(names)
    }
}
