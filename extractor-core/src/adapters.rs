//! Default filesystem-backed and in-memory port implementations.

use crate::ports::{ModuleSource, OutputPort};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use extractor_types::ModuleDescriptor;
use fs_err as fs;
use glob::glob;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Loads every `*.json` module descriptor of a directory, sorted by file name.
#[derive(Debug, Clone)]
pub struct FsModuleSource {
    pub input_dir: Utf8PathBuf,
}

impl FsModuleSource {
    pub fn new(input_dir: Utf8PathBuf) -> Self {
        Self { input_dir }
    }
}

impl ModuleSource for FsModuleSource {
    fn load_modules(&self) -> anyhow::Result<Vec<ModuleDescriptor>> {
        let pattern = self.input_dir.join("*.json");
        let pattern_str = pattern.as_str();
        debug!(pattern = %pattern_str, "loading module descriptors");

        let mut paths = Vec::new();
        for entry in glob(pattern_str).with_context(|| format!("glob {}", pattern_str))? {
            let path = entry.map_err(|e| anyhow::anyhow!("glob error: {e}"))?;
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut modules = Vec::with_capacity(paths.len());
        for path in paths {
            let contents = fs::read_to_string(&path)?;
            let module: ModuleDescriptor = serde_json::from_str(&contents)
                .with_context(|| format!("parse module descriptor {}", path.display()))?;
            modules.push(module);
        }
        Ok(modules)
    }
}

/// Pre-loaded descriptors, returned in the order given.
#[derive(Debug, Clone, Default)]
pub struct InMemoryModuleSource {
    modules: Vec<ModuleDescriptor>,
}

impl InMemoryModuleSource {
    pub fn new(modules: Vec<ModuleDescriptor>) -> Self {
        Self { modules }
    }
}

impl ModuleSource for InMemoryModuleSource {
    fn load_modules(&self) -> anyhow::Result<Vec<ModuleDescriptor>> {
        Ok(self.modules.clone())
    }
}

/// Writes the generated project under `root`.
#[derive(Debug, Clone)]
pub struct FsOutput {
    root: Utf8PathBuf,
}

impl FsOutput {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }
}

impl OutputPort for FsOutput {
    fn exists(&self, path: &Utf8Path) -> anyhow::Result<bool> {
        Ok(self.root.join(path).is_file())
    }

    fn read(&self, path: &Utf8Path) -> anyhow::Result<Option<String>> {
        let path = self.root.join(path);
        if !path.is_file() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path).with_context(|| format!("read {}", path))?;
        Ok(Some(contents))
    }

    fn write(&self, path: &Utf8Path, contents: &str) -> anyhow::Result<()> {
        let path = self.root.join(path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create parent dir for {}", path))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path))
    }
}

/// Output kept in memory, for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemoryOutput {
    files: Mutex<BTreeMap<Utf8PathBuf, String>>,
}

impl InMemoryOutput {
    pub fn new() -> Self {
        Self::default()
    }

    fn files(&self) -> MutexGuard<'_, BTreeMap<Utf8PathBuf, String>> {
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed a file, as if the driver had already copied it.
    pub fn insert(&self, path: impl Into<Utf8PathBuf>, contents: impl Into<String>) {
        self.files().insert(path.into(), contents.into());
    }

    pub fn snapshot(&self) -> BTreeMap<Utf8PathBuf, String> {
        self.files().clone()
    }
}

impl OutputPort for InMemoryOutput {
    fn exists(&self, path: &Utf8Path) -> anyhow::Result<bool> {
        Ok(self.files().contains_key(path))
    }

    fn read(&self, path: &Utf8Path) -> anyhow::Result<Option<String>> {
        Ok(self.files().get(path).cloned())
    }

    fn write(&self, path: &Utf8Path, contents: &str) -> anyhow::Result<()> {
        self.files().insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }
}
