use crate::error::StoreError;
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use glob::glob;
use std::collections::BTreeMap;
use std::io::{ErrorKind, Write};
use std::sync::Mutex;
use tracing::debug;

/// Key-value working state. Keys are `/`-separated relative names.
pub trait WorkingStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Create a new entry; fails with [`StoreError::AlreadyExists`] if the key
    /// is taken.
    fn create(&self, key: &str, contents: &str) -> Result<(), StoreError>;

    /// Append one line, creating the entry if needed.
    fn append_line(&self, key: &str, line: &str) -> Result<(), StoreError>;

    /// Keys directly under `prefix`, sorted.
    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.read(key)?.is_some())
    }
}

/// In-memory store for single-process runs and tests.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of every entry, for assertions.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries().clone()
    }
}

impl WorkingStore for InMemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries().get(key).cloned())
    }

    fn create(&self, key: &str, contents: &str) -> Result<(), StoreError> {
        let mut entries = self.entries();
        if entries.contains_key(key) {
            return Err(StoreError::AlreadyExists {
                key: key.to_string(),
            });
        }
        entries.insert(key.to_string(), contents.to_string());
        Ok(())
    }

    fn append_line(&self, key: &str, line: &str) -> Result<(), StoreError> {
        let mut entries = self.entries();
        let entry = entries.entry(key.to_string()).or_default();
        entry.push_str(line);
        entry.push('\n');
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let dir = format!("{}/", prefix.trim_end_matches('/'));
        Ok(self
            .entries()
            .keys()
            .filter(|k| k.strip_prefix(&dir).is_some_and(|rest| !rest.contains('/')))
            .cloned()
            .collect())
    }
}

/// File-backed store: one file per key under `root`.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: Utf8PathBuf,
}

impl FsStore {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn path(&self, key: &str) -> Utf8PathBuf {
        self.root.join(key)
    }

    fn ensure_parent(path: &Utf8Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create parent dir for {}", path))?;
        }
        Ok(())
    }
}

impl WorkingStore for FsStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path(key);
        if !path.is_file() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path).with_context(|| format!("read {}", path))?;
        Ok(Some(contents))
    }

    fn create(&self, key: &str, contents: &str) -> Result<(), StoreError> {
        let path = self.path(key);
        Self::ensure_parent(&path)?;
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                return Err(StoreError::AlreadyExists {
                    key: key.to_string(),
                });
            }
            Err(err) => return Err(anyhow::Error::from(err).into()),
        };
        file.write_all(contents.as_bytes())
            .with_context(|| format!("write {}", path))?;
        debug!(key, path = %path, "created working-state entry");
        Ok(())
    }

    fn append_line(&self, key: &str, line: &str) -> Result<(), StoreError> {
        let path = self.path(key);
        Self::ensure_parent(&path)?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open {} for append", path))?;
        // One write per line keeps concurrent appends from interleaving.
        file.write_all(format!("{}\n", line).as_bytes())
            .with_context(|| format!("append to {}", path))?;
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let prefix = prefix.trim_end_matches('/');
        let pattern = self.path(prefix).join("*");
        let pattern_str = pattern.as_str();

        debug!(pattern = %pattern_str, "listing working-state entries");

        let mut out = Vec::new();
        for entry in glob(pattern_str).with_context(|| format!("glob {}", pattern_str))? {
            let path = entry.map_err(|e| anyhow::anyhow!("glob error: {e}"))?;
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            out.push(format!("{}/{}", prefix, name));
        }

        // Deterministic order matters.
        out.sort();
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fs_store() -> (TempDir, FsStore) {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        (temp, FsStore::new(root))
    }

    #[test]
    fn in_memory_create_is_create_new() {
        let store = InMemoryStore::new();
        store.create("a", "1").unwrap();
        let err = store.create("a", "2").unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { ref key } if key == "a"));
        assert_eq!(store.read("a").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn in_memory_list_is_one_level_and_sorted() {
        let store = InMemoryStore::new();
        store.create("partial/audit/b.json", "{}").unwrap();
        store.create("partial/audit/a.json", "{}").unwrap();
        store.create("partial/audit/nested/c.json", "{}").unwrap();
        store.create("partial/parent/a.json", "{}").unwrap();
        assert_eq!(
            store.list("partial/audit").unwrap(),
            vec!["partial/audit/a.json", "partial/audit/b.json"]
        );
    }

    #[test]
    fn in_memory_append_accumulates_lines() {
        let store = InMemoryStore::new();
        store.append_line("core-extensions", "quarkus-arc").unwrap();
        store.append_line("core-extensions", "quarkus-core").unwrap();
        assert_eq!(
            store.read("core-extensions").unwrap().as_deref(),
            Some("quarkus-arc\nquarkus-core\n")
        );
    }

    #[test]
    fn fs_create_refuses_existing_file() {
        let (_temp, store) = fs_store();
        store.create("bom-managed-keys", "io.quarkus:quarkus-arc\n").unwrap();
        let err = store.create("bom-managed-keys", "x").unwrap_err();
        assert!(err.is_precondition());
        assert_eq!(
            store.read("bom-managed-keys").unwrap().as_deref(),
            Some("io.quarkus:quarkus-arc\n")
        );
    }

    #[test]
    fn fs_read_missing_is_none() {
        let (_temp, store) = fs_store();
        assert_eq!(store.read("nope").unwrap(), None);
        assert!(!store.exists("nope").unwrap());
    }

    #[test]
    fn fs_append_and_list() {
        let (_temp, store) = fs_store();
        store.append_line("core-extensions", "quarkus-arc").unwrap();
        store.append_line("core-extensions", "quarkus-core").unwrap();
        assert_eq!(
            store.read("core-extensions").unwrap().as_deref(),
            Some("quarkus-arc\nquarkus-core\n")
        );

        store.create("partial/audit/z.json", "{}").unwrap();
        store.create("partial/audit/a.json", "{}").unwrap();
        assert_eq!(
            store.list("partial/audit").unwrap(),
            vec!["partial/audit/a.json", "partial/audit/z.json"]
        );
        assert!(store.list("partial/parent").unwrap().is_empty());
    }
}
