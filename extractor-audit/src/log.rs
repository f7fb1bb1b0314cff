use crate::key::{AuditEntry, AuditFragment, AuditKey};
use crate::render::render_summary;
use extractor_store::{StoreError, WorkingStore, keys};
use extractor_types::{DependencyRef, ManagementKey, PluginRef, Repository, Usage, schema};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// Accumulates every non-default decision of a run.
///
/// Shared by reference; recording takes `&self`. All merging is set union,
/// so merging the same fragments in any order, any number of times, gives
/// the same log.
#[derive(Debug, Default)]
pub struct AuditLog {
    entries: Mutex<BTreeMap<AuditKey, BTreeSet<Usage>>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<AuditKey, BTreeSet<Usage>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn record(&self, key: AuditKey, usage: Usage) {
        self.entries().entry(key).or_default().insert(usage);
    }

    /// A dependency pinned to `version` instead of being left to a BOM.
    pub fn record_unmanaged_dependency(
        &self,
        dependency: &DependencyRef,
        version: impl Into<String>,
        usage: &Usage,
    ) {
        let key = AuditKey::unmanaged_dependency(
            dependency.management_key(),
            version,
            dependency.is_test_jar(),
        );
        self.record(key, usage.clone());
    }

    pub fn record_repository(&self, repository: &Repository, usage: &Usage) {
        self.record(AuditKey::repository(repository), usage.clone());
    }

    pub fn record_plugin_repository(&self, repository: &Repository, usage: &Usage) {
        self.record(AuditKey::plugin_repository(repository), usage.clone());
    }

    pub fn record_dependency_management<'a, I>(&self, managed: I, usage: &Usage)
    where
        I: IntoIterator<Item = &'a DependencyRef>,
    {
        let managed: BTreeSet<ManagementKey> =
            managed.into_iter().map(DependencyRef::management_key).collect();
        if managed.is_empty() {
            return;
        }
        self.record(AuditKey::DependencyManagement { managed }, usage.clone());
    }

    pub fn record_build_plugin(&self, plugin: &PluginRef, usage: &Usage) {
        let key = AuditKey::BuildPlugin {
            artifact_id: plugin.artifact_id.clone(),
            version: plugin.version.clone(),
        };
        self.record(key, usage.clone());
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn usages(&self, key: &AuditKey) -> BTreeSet<Usage> {
        self.entries().get(key).cloned().unwrap_or_default()
    }

    pub fn snapshot(&self) -> BTreeMap<AuditKey, BTreeSet<Usage>> {
        self.entries().clone()
    }

    pub fn fragment(&self, module_id: &str) -> AuditFragment {
        let entries = self
            .entries()
            .iter()
            .map(|(key, usages)| AuditEntry {
                key: key.clone(),
                usages: usages.clone(),
            })
            .collect();
        AuditFragment {
            schema: schema::AUDIT_FRAGMENT_V1.to_string(),
            module_id: module_id.to_string(),
            entries,
        }
    }

    pub fn merge_fragment(&self, fragment: &AuditFragment) {
        let mut entries = self.entries();
        for entry in &fragment.entries {
            entries
                .entry(entry.key.clone())
                .or_default()
                .extend(entry.usages.iter().cloned());
        }
    }

    pub fn merge(&self, other: &AuditLog) {
        let incoming = other.snapshot();
        let mut entries = self.entries();
        for (key, usages) in incoming {
            entries.entry(key).or_default().extend(usages);
        }
    }

    /// Write this log as the partial fragment of `module_id`. Nothing is
    /// written for an empty log; returns whether a fragment was written.
    pub fn flush_partial(
        &self,
        store: &dyn WorkingStore,
        module_id: &str,
    ) -> Result<bool, StoreError> {
        if self.is_empty() {
            debug!(module = module_id, "no audit data to flush");
            return Ok(false);
        }
        let fragment = self.fragment(module_id);
        let key = keys::audit_partial(module_id);
        let json = serde_json::to_string_pretty(&fragment).map_err(|e| StoreError::Malformed {
            key: key.clone(),
            message: e.to_string(),
        })?;
        store.create(&key, &json)?;
        debug!(module = module_id, entries = fragment.entries.len(), "flushed audit fragment");
        Ok(true)
    }

    /// Union every persisted partial fragment into this log. Returns how many
    /// fragments were read.
    pub fn merge_partials(&self, store: &dyn WorkingStore) -> Result<usize, StoreError> {
        let fragment_keys = store.list(keys::AUDIT_PARTIALS)?;
        let mut merged = 0;
        for key in &fragment_keys {
            let Some(contents) = store.read(key)? else {
                continue;
            };
            let fragment: AuditFragment =
                serde_json::from_str(&contents).map_err(|e| StoreError::Malformed {
                    key: key.clone(),
                    message: e.to_string(),
                })?;
            self.merge_fragment(&fragment);
            merged += 1;
        }
        info!(fragments = merged, keys = self.len(), "merged audit fragments");
        Ok(merged)
    }

    /// Human-readable extraction summary.
    pub fn render(&self) -> String {
        render_summary(&self.entries())
    }
}
