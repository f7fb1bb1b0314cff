use crate::descriptor::{DependencyRef, Profile};
use crate::key::ManagementKey;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Template for the generated parent project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParentSkeleton {
    pub group_id: String,
    pub artifact_id: String,

    #[serde(default)]
    pub properties: BTreeMap<String, String>,

    #[serde(default)]
    pub dependency_management: Vec<DependencyRef>,

    #[serde(default)]
    pub profiles: Vec<Profile>,
}

impl ParentSkeleton {
    pub fn profile(&self, id: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.id.eq_ignore_ascii_case(id))
    }

    pub fn managed_keys(&self) -> BTreeSet<ManagementKey> {
        self.dependency_management
            .iter()
            .map(DependencyRef::management_key)
            .collect()
    }
}

/// What the metadata pass keeps from the shared build parent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildParentSnapshot {
    pub version: String,

    #[serde(default)]
    pub properties: BTreeMap<String, String>,

    /// Keys the build parent manages; modules drop them from their own
    /// dependency management.
    #[serde(default)]
    pub managed_keys: BTreeSet<ManagementKey>,
}

/// The finalized generated parent project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedParent {
    pub schema: String,
    pub group_id: String,
    pub artifact_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default)]
    pub properties: BTreeMap<String, String>,

    #[serde(default)]
    pub dependency_management: Vec<DependencyRef>,

    #[serde(default)]
    pub profiles: Vec<Profile>,
}

impl AggregatedParent {
    pub fn profile(&self, id: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.id.eq_ignore_ascii_case(id))
    }

    pub fn profile_modules(&self, id: &str) -> &[String] {
        self.profile(id).map(|p| p.modules.as_slice()).unwrap_or(&[])
    }
}
