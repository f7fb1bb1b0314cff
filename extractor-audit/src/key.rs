use extractor_types::{ManagementKey, Repository, Usage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Report section an audit key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AuditCategory {
    UnmanagedDependency,
    Repository,
    PluginRepository,
    DependencyManagement,
    BuildPlugin,
}

impl AuditCategory {
    pub const ALL: [AuditCategory; 5] = [
        AuditCategory::UnmanagedDependency,
        AuditCategory::Repository,
        AuditCategory::PluginRepository,
        AuditCategory::DependencyManagement,
        AuditCategory::BuildPlugin,
    ];

    pub fn heading(&self) -> &'static str {
        match self {
            Self::UnmanagedDependency => "=== UnmanagedDependencies:",
            Self::Repository => "=== Projects that have configured a repository in their POM:",
            Self::PluginRepository => {
                "=== Projects that have configured a plugin repository in their POM:"
            }
            Self::DependencyManagement => "=== Projects that have their own dependency managements",
            Self::BuildPlugin => "=== Projects that use build plugins:",
        }
    }
}

/// What a decision is about. Variant order is the report section order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum AuditKey {
    UnmanagedDependency {
        key: ManagementKey,
        version: String,
        #[serde(default)]
        test_jar: bool,
    },
    Repository {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        url: String,
    },
    PluginRepository {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        url: String,
    },
    /// The usage is the module owning the dependency management.
    DependencyManagement { managed: BTreeSet<ManagementKey> },
    BuildPlugin {
        artifact_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        version: Option<String>,
    },
}

impl AuditKey {
    pub fn unmanaged_dependency(key: ManagementKey, version: impl Into<String>, test_jar: bool) -> Self {
        Self::UnmanagedDependency {
            key,
            version: version.into(),
            test_jar,
        }
    }

    pub fn repository(repo: &Repository) -> Self {
        Self::Repository {
            id: repo.id.clone(),
            name: repo.name.clone(),
            url: repo.url.clone(),
        }
    }

    pub fn plugin_repository(repo: &Repository) -> Self {
        Self::PluginRepository {
            id: repo.id.clone(),
            name: repo.name.clone(),
            url: repo.url.clone(),
        }
    }

    pub fn category(&self) -> AuditCategory {
        match self {
            Self::UnmanagedDependency { .. } => AuditCategory::UnmanagedDependency,
            Self::Repository { .. } => AuditCategory::Repository,
            Self::PluginRepository { .. } => AuditCategory::PluginRepository,
            Self::DependencyManagement { .. } => AuditCategory::DependencyManagement,
            Self::BuildPlugin { .. } => AuditCategory::BuildPlugin,
        }
    }
}

/// One key and its usages, as persisted. JSON maps need string keys, so
/// fragments are lists of entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub key: AuditKey,
    pub usages: BTreeSet<Usage>,
}

/// Partial audit data written by one module pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditFragment {
    pub schema: String,
    pub module_id: String,
    pub entries: Vec<AuditEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_sort_in_section_order() {
        let plugin = AuditKey::BuildPlugin {
            artifact_id: "a".into(),
            version: None,
        };
        let dep = AuditKey::unmanaged_dependency(ManagementKey::new("z", "z"), "1", false);
        assert!(dep < plugin);
        assert_eq!(dep.category(), AuditCategory::UnmanagedDependency);
    }

    #[test]
    fn key_serializes_with_category_tag() {
        let key = AuditKey::unmanaged_dependency(
            ManagementKey::new("io.quarkus", "quarkus-test-maven"),
            "${community.quarkus.version}",
            true,
        );
        let value = serde_json::to_value(&key).unwrap();
        assert_eq!(value["category"], "unmanaged_dependency");
        assert_eq!(value["key"], "io.quarkus:quarkus-test-maven");
        assert_eq!(value["test_jar"], true);
    }
}
