//! Input model: one [`ModuleDescriptor`] per monorepo module, supplied by the
//! external build-graph driver with its effective dependency and plugin
//! versions already resolved.

use crate::key::ManagementKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_PACKAGING: &str = "jar";
pub const TEST_JAR_TYPE: &str = "test-jar";
pub const POM_TYPE: &str = "pom";
pub const TEST_SCOPE: &str = "test";
pub const COMPILE_SCOPE: &str = "compile";
pub const DEPLOYMENT_SUFFIX: &str = "-deployment";
pub const DEPLOYMENT_NAME_SUFFIX: &str = " - Deployment";
/// Property that stands for "this monorepo release" in declared versions.
pub const PROJECT_VERSION_PROPERTY: &str = "project.version";
pub const DEFAULT_PLUGIN_GROUP: &str = "org.apache.maven.plugins";

const WILDCARD: &str = "*";

/// Strips a trailing `-deployment` (artifact ids) or ` - Deployment`
/// (display names).
pub fn strip_deployment_suffix(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_suffix(DEPLOYMENT_SUFFIX) {
        return stripped;
    }
    if let Some(stripped) = text.strip_suffix(DEPLOYMENT_NAME_SUFFIX) {
        return stripped.trim();
    }
    text
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Exclusion {
    pub group_id: String,
    pub artifact_id: String,
}

impl Exclusion {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
        }
    }

    pub fn wildcard() -> Self {
        Self::new(WILDCARD, WILDCARD)
    }

    pub fn is_wildcard(&self) -> bool {
        self.group_id == WILDCARD && self.artifact_id == WILDCARD
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRef {
    pub group_id: String,
    pub artifact_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclusions: Vec<Exclusion>,
}

impl DependencyRef {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: None,
            scope: None,
            kind: None,
            classifier: None,
            exclusions: Vec::new(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_type(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }

    pub fn with_exclusion(mut self, exclusion: Exclusion) -> Self {
        self.exclusions.push(exclusion);
        self
    }

    pub fn management_key(&self) -> ManagementKey {
        ManagementKey::new(self.group_id.clone(), self.artifact_id.clone())
    }

    /// Declared version, if present and non-blank.
    pub fn version_str(&self) -> Option<&str> {
        self.version
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    pub fn has_empty_version(&self) -> bool {
        self.version_str().is_none()
    }

    /// True when the declared version references `project.version`.
    pub fn has_project_version_marker(&self) -> bool {
        self.version
            .as_deref()
            .is_some_and(|v| v.contains(PROJECT_VERSION_PROPERTY))
    }

    pub fn is_test_jar(&self) -> bool {
        self.kind
            .as_deref()
            .is_some_and(|k| k.eq_ignore_ascii_case(TEST_JAR_TYPE))
    }

    pub fn is_pom(&self) -> bool {
        self.kind
            .as_deref()
            .is_some_and(|k| k.eq_ignore_ascii_case(POM_TYPE))
    }

    pub fn is_deployment(&self) -> bool {
        self.artifact_id.ends_with(DEPLOYMENT_SUFFIX)
    }

    pub fn has_test_scope(&self) -> bool {
        self.scope
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case(TEST_SCOPE))
    }

    pub fn has_compile_scope(&self) -> bool {
        self.scope
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case(COMPILE_SCOPE))
    }

    /// Exactly one exclusion and it is `*:*`.
    pub fn has_single_wildcard_exclusion(&self) -> bool {
        self.exclusions.len() == 1 && self.exclusions[0].is_wildcard()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginExecution {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub goals: Vec<String>,
}

fn default_plugin_group() -> String {
    DEFAULT_PLUGIN_GROUP.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginRef {
    #[serde(default = "default_plugin_group")]
    pub group_id: String,

    pub artifact_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Plugin configuration, carried through verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub executions: Vec<PluginExecution>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<DependencyRef>,
}

impl PluginRef {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: None,
            configuration: None,
            executions: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_execution(mut self, id: impl Into<String>) -> Self {
        self.executions.push(PluginExecution {
            id: id.into(),
            phase: None,
            goals: Vec::new(),
        });
        self
    }

    pub fn with_configuration(mut self, configuration: serde_json::Value) -> Self {
        self.configuration = Some(configuration);
        self
    }

    pub fn version_str(&self) -> Option<&str> {
        self.version
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    /// No dependencies, no configuration and no executions.
    pub fn is_bare(&self) -> bool {
        self.dependencies.is_empty() && self.configuration.is_none() && self.executions.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildSection {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<PluginRef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugin_management: Vec<PluginRef>,
}

impl BuildSection {
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty() && self.plugin_management.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Repository {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<DependencyRef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependency_management: Vec<DependencyRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildSection>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl Profile {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

/// The `<parent>` element of a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentRef {
    pub group_id: String,
    pub artifact_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_path: Option<String>,
}

/// One ancestor in a module's parent chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleLink {
    pub artifact_id: String,
    pub relative_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// `/`-separated path relative to the monorepo root.
    pub relative_path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packaging: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentRef>,

    /// Ancestors, nearest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent_chain: Vec<ModuleLink>,

    #[serde(default)]
    pub dependencies: Vec<DependencyRef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependency_management: Vec<DependencyRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildSection>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub profiles: Vec<Profile>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repositories: Vec<Repository>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugin_repositories: Vec<Repository>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<String>,

    /// Effective dependencies with concrete versions.
    #[serde(default)]
    pub resolved_dependencies: Vec<DependencyRef>,

    /// Effective build plugins with concrete versions.
    #[serde(default)]
    pub resolved_build_plugins: Vec<PluginRef>,

    /// Effective plugin management with concrete versions.
    #[serde(default)]
    pub resolved_plugin_management: Vec<PluginRef>,

    #[serde(default)]
    pub contains_tests: bool,
}

impl ModuleDescriptor {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
        relative_path: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            name: None,
            relative_path: relative_path.into(),
            packaging: None,
            parent: None,
            parent_chain: Vec::new(),
            dependencies: Vec::new(),
            dependency_management: Vec::new(),
            build: None,
            profiles: Vec::new(),
            repositories: Vec::new(),
            plugin_repositories: Vec::new(),
            properties: BTreeMap::new(),
            modules: Vec::new(),
            resolved_dependencies: Vec::new(),
            resolved_build_plugins: Vec::new(),
            resolved_plugin_management: Vec::new(),
            contains_tests: false,
        }
    }

    pub fn packaging(&self) -> &str {
        self.packaging.as_deref().unwrap_or(DEFAULT_PACKAGING)
    }

    pub fn has_jar_packaging(&self) -> bool {
        self.packaging().eq_ignore_ascii_case(DEFAULT_PACKAGING)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.artifact_id)
    }

    /// Last path segment of the module directory.
    pub fn dir_name(&self) -> &str {
        last_segment(&self.relative_path)
    }

    /// Nearest ancestor with the given artifact id.
    pub fn find_ancestor(&self, artifact_id: &str) -> Option<&ModuleLink> {
        self.parent_chain
            .iter()
            .find(|link| link.artifact_id.eq_ignore_ascii_case(artifact_id))
    }

    /// First resolved version for a management key, if any.
    pub fn resolved_version_of(&self, key: &ManagementKey) -> Option<&str> {
        self.resolved_dependencies
            .iter()
            .filter(|d| &d.management_key() == key)
            .find_map(|d| d.version_str())
    }
}

pub fn last_segment(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
}

/// Parent directory of a `/`-separated relative path (empty at the root).
pub fn parent_path(path: &str) -> &str {
    match path.trim_end_matches('/').rsplit_once('/') {
        Some((parent, _)) => parent,
        None => "",
    }
}
