use crate::decision::ModuleClassification;
use crate::descriptor::{
    BuildSection, DependencyRef, ParentRef, Profile, Repository, last_segment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A consuming module and where it lands in the generated project.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Usage {
    pub module_id: String,
    pub target_path: String,
}

impl Usage {
    pub fn new(module_id: impl Into<String>, target_path: impl Into<String>) -> Self {
        Self {
            module_id: module_id.into(),
            target_path: target_path.into(),
        }
    }
}

/// String substitution or marker file inside the target module directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilePatch {
    Replace {
        path: String,
        from: String,
        to: String,
    },
    /// Create an empty file unless it already exists.
    Touch { path: String },
}

impl FilePatch {
    pub fn path(&self) -> &str {
        match self {
            Self::Replace { path, .. } | Self::Touch { path } => path,
        }
    }
}

/// Generated descriptor for one module of the standalone project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetModuleDescriptor {
    pub schema: String,

    /// Artifact id of the monorepo module this was generated from.
    pub source_module: String,
    pub source_path: String,
    pub classification: ModuleClassification,

    pub target_path: String,
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packaging: Option<String>,

    pub parent: ParentRef,

    /// Listed directly in a profile of the generated parent.
    pub direct_submodule: bool,

    /// Profile of the generated parent that lists this module.
    pub profile_name: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_dependency: Option<DependencyRef>,

    #[serde(default)]
    pub dependencies: Vec<DependencyRef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub runtime_counterparts: Vec<DependencyRef>,

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

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<String>,

    /// Test sources left out of the copied module.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_sources: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_patches: Vec<FilePatch>,
}

impl TargetModuleDescriptor {
    /// Self dependency first, then declared dependencies, then synthesized
    /// runtime counterparts. This is the order they are written in.
    pub fn all_dependencies(&self) -> impl Iterator<Item = &DependencyRef> {
        self.self_dependency
            .iter()
            .chain(self.dependencies.iter())
            .chain(self.runtime_counterparts.iter())
    }

    pub fn dir_name(&self) -> &str {
        last_segment(&self.target_path)
    }

    pub fn profile_mut(&mut self, id: &str) -> Option<&mut Profile> {
        self.profiles.iter_mut().find(|p| p.id.eq_ignore_ascii_case(id))
    }

    pub fn build_mut(&mut self) -> &mut BuildSection {
        self.build.get_or_insert_with(BuildSection::default)
    }
}
