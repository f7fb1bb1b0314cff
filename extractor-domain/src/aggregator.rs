//! Accumulates what every module contributes to the generated parent.
//!
//! Each module pass holds its own aggregator and flushes it as a parent
//! fragment; `finalize` merges every fragment over the skeleton.

use crate::error::ExtractError;
use crate::rules::{ExtractionRules, is_integration_test_path};
use extractor_store::{StoreError, WorkingStore, keys};
use extractor_types::{
    AggregatedParent, BuildParentSnapshot, BuildSection, DependencyRef, ManagementKey,
    ModuleClassification, ParentSkeleton, TargetModuleDescriptor, schema,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// One module's contribution, as persisted between passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentFragment {
    pub schema: String,
    pub module: String,

    /// Profile id to target paths.
    #[serde(default)]
    pub modules: BTreeMap<String, BTreeSet<String>>,

    #[serde(default)]
    pub managed: Vec<DependencyRef>,

    #[serde(default)]
    pub profile_builds: BTreeMap<String, BuildSection>,
}

pub struct ParentAggregator<'a> {
    rules: &'a ExtractionRules,
    skeleton: &'a ParentSkeleton,
    modules: BTreeMap<String, BTreeSet<String>>,
    managed: BTreeMap<ManagementKey, DependencyRef>,
    profile_builds: BTreeMap<String, BuildSection>,
}

impl<'a> ParentAggregator<'a> {
    pub fn new(rules: &'a ExtractionRules, skeleton: &'a ParentSkeleton) -> Self {
        Self {
            rules,
            skeleton,
            modules: BTreeMap::new(),
            managed: BTreeMap::new(),
            profile_builds: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
            && self.managed.is_empty()
            && self.profile_builds.is_empty()
    }

    /// List `target_path` in `profile`. Only skeleton profiles exist.
    pub fn add_module(&mut self, target_path: &str, profile: &str, module: &str) -> Result<(), ExtractError> {
        let profile = self.skeleton_profile(profile, module)?;
        self.modules
            .entry(profile)
            .or_default()
            .insert(target_path.to_string());
        Ok(())
    }

    /// First declaration of a key wins. Copy-as-is artifacts are produced by
    /// the generated project itself and always get its version.
    pub fn add_managed_dependency(&mut self, dep: &DependencyRef) {
        let mut dep = dep.clone();
        if self.rules.is_copy_as_is(&dep.artifact_id) {
            dep.version = Some(self.rules.project_version().to_string());
        }
        self.managed.entry(dep.management_key()).or_insert(dep);
    }

    pub fn set_profile_build(
        &mut self,
        profile: &str,
        build: BuildSection,
        module: &str,
    ) -> Result<(), ExtractError> {
        let profile = self.skeleton_profile(profile, module)?;
        self.profile_builds.insert(profile, build);
        Ok(())
    }

    /// Register a transformed module: listed modules go into their profile,
    /// copied modules become managed dependencies of the generated parent.
    pub fn add_target(&mut self, target: &TargetModuleDescriptor, listed: bool) -> Result<(), ExtractError> {
        if listed {
            self.add_module(&target.target_path, &target.profile_name, &target.source_module)?;
        }
        if target.classification != ModuleClassification::CopyAsIs {
            return Ok(());
        }

        self.add_managed_dependency(&DependencyRef::new(
            &self.rules.target_group_id,
            &target.artifact_id,
        ));
        let names = &self.rules.profiles;
        let managed_profile = if is_integration_test_path(&target.source_path) {
            if !target.direct_submodule {
                return Ok(());
            }
            format!(
                "{}{}",
                names.integration_managed_modules,
                self.rules.profile_suffix(&target.target_path)
            )
        } else {
            names.extension_managed_modules.clone()
        };
        self.add_module(&target.target_path, &managed_profile, &target.source_module)
    }

    pub fn fragment(&self, module: &str) -> ParentFragment {
        ParentFragment {
            schema: schema::PARENT_FRAGMENT_V1.to_string(),
            module: module.to_string(),
            modules: self.modules.clone(),
            managed: self.managed.values().cloned().collect(),
            profile_builds: self.profile_builds.clone(),
        }
    }

    /// Union a fragment into this aggregator. Module lists are sets, so merging
    /// the same fragment twice changes nothing.
    pub fn merge_fragment(&mut self, fragment: &ParentFragment) {
        for (profile, paths) in &fragment.modules {
            self.modules
                .entry(profile.clone())
                .or_default()
                .extend(paths.iter().cloned());
        }
        for dep in &fragment.managed {
            self.add_managed_dependency(dep);
        }
        for (profile, build) in &fragment.profile_builds {
            self.profile_builds.insert(profile.clone(), build.clone());
        }
    }

    /// Persist this module's contribution. Nothing is written when empty.
    pub fn flush_partial(&self, store: &dyn WorkingStore, module: &str) -> Result<bool, StoreError> {
        if self.is_empty() {
            return Ok(false);
        }
        let key = keys::parent_partial(module);
        let json = serde_json::to_string_pretty(&self.fragment(module)).map_err(|e| {
            StoreError::Malformed {
                key: key.clone(),
                message: e.to_string(),
            }
        })?;
        store.create(&key, &json)?;
        debug!(module, "flushed parent fragment");
        Ok(true)
    }

    pub fn merge_partials(&mut self, store: &dyn WorkingStore) -> Result<usize, StoreError> {
        let mut merged = 0;
        for key in store.list(keys::PARENT_PARTIALS)? {
            let Some(contents) = store.read(&key)? else {
                continue;
            };
            let fragment: ParentFragment =
                serde_json::from_str(&contents).map_err(|e| StoreError::Malformed {
                    key: key.clone(),
                    message: e.to_string(),
                })?;
            self.merge_fragment(&fragment);
            merged += 1;
        }
        info!(fragments = merged, "merged parent fragments");
        Ok(merged)
    }

    /// The generated parent: skeleton, overlaid by the build parent and every
    /// module's contribution. Module lists come out sorted.
    pub fn finalize(&self, build_parent: Option<&BuildParentSnapshot>) -> AggregatedParent {
        let mut properties = self.skeleton.properties.clone();
        let mut version = None;
        if let Some(build_parent) = build_parent {
            for (name, value) in &build_parent.properties {
                if !self.rules.is_ignored_property(name) {
                    properties.insert(name.clone(), value.clone());
                }
            }
            for name in [&self.rules.properties.platform, &self.rules.properties.community] {
                properties.insert(name.clone(), build_parent.version.clone());
            }
            version = Some(build_parent.version.clone());
        }

        let skeleton_keys = self.skeleton.managed_keys();
        let mut dependency_management = self.skeleton.dependency_management.clone();
        dependency_management.extend(
            self.managed
                .iter()
                .filter(|(key, _)| !skeleton_keys.contains(key))
                .map(|(_, dep)| dep.clone()),
        );

        let profiles = self
            .skeleton
            .profiles
            .iter()
            .map(|profile| {
                let mut profile = profile.clone();
                let mut listed: BTreeSet<String> = profile.modules.iter().cloned().collect();
                if let Some(added) = self.modules.get(&profile.id) {
                    listed.extend(added.iter().cloned());
                }
                profile.modules = listed.into_iter().collect();
                if let Some(build) = self.profile_builds.get(&profile.id) {
                    profile.build = Some(build.clone());
                }
                profile
            })
            .collect();

        AggregatedParent {
            schema: schema::AGGREGATED_PARENT_V1.to_string(),
            group_id: self.skeleton.group_id.clone(),
            artifact_id: self.skeleton.artifact_id.clone(),
            version,
            properties,
            dependency_management,
            profiles,
        }
    }

    fn skeleton_profile(&self, profile: &str, module: &str) -> Result<String, ExtractError> {
        self.skeleton
            .profile(profile)
            .map(|p| p.id.clone())
            .ok_or_else(|| ExtractError::UnknownProfile {
                profile: profile.to_string(),
                module: module.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton;
    use extractor_store::InMemoryStore;
    use pretty_assertions::assert_eq;

    fn fixtures() -> (ExtractionRules, ParentSkeleton) {
        let rules = ExtractionRules::default();
        let skeleton = skeleton::builtin(&rules);
        (rules, skeleton)
    }

    #[test]
    fn unknown_profile_is_fatal() {
        let (rules, skeleton) = fixtures();
        let mut agg = ParentAggregator::new(&rules, &skeleton);
        let err = agg
            .add_module("integration-tests/main", "integration-tests-17", "quarkus-integration-test-main")
            .unwrap_err();
        assert!(matches!(err, ExtractError::UnknownProfile { .. }));
    }

    #[test]
    fn managed_dependencies_dedupe_and_force_copy_as_is_version() {
        let (rules, skeleton) = fixtures();
        let mut agg = ParentAggregator::new(&rules, &skeleton);
        agg.add_managed_dependency(
            &DependencyRef::new("io.quarkus.qe.tests", "quarkus-integration-test-shared-library")
                .with_version("999-SNAPSHOT"),
        );
        agg.add_managed_dependency(&DependencyRef::new("org.acme", "acme").with_version("1"));
        agg.add_managed_dependency(&DependencyRef::new("org.acme", "acme").with_version("2"));

        let parent = agg.finalize(None);
        let added: Vec<(&str, Option<&str>)> = parent.dependency_management[1..]
            .iter()
            .map(|d| (d.artifact_id.as_str(), d.version.as_deref()))
            .collect();
        assert_eq!(
            added,
            vec![
                ("quarkus-integration-test-shared-library", Some("${project.version}")),
                ("acme", Some("1")),
            ]
        );
    }

    #[test]
    fn finalize_sets_versions_from_build_parent() {
        let (rules, skeleton) = fixtures();
        let agg = ParentAggregator::new(&rules, &skeleton);
        let build_parent = BuildParentSnapshot {
            version: "3.15.1".into(),
            properties: [("gpg.skip".to_string(), "true".to_string()), ("junit.version".to_string(), "5.10.5".to_string())]
                .into_iter()
                .collect(),
            managed_keys: Default::default(),
        };
        let parent = agg.finalize(Some(&build_parent));
        assert_eq!(parent.version.as_deref(), Some("3.15.1"));
        assert_eq!(parent.properties.get("quarkus.platform.version").map(String::as_str), Some("3.15.1"));
        assert_eq!(parent.properties.get("community.quarkus.version").map(String::as_str), Some("3.15.1"));
        assert_eq!(parent.properties.get("junit.version").map(String::as_str), Some("5.10.5"));
        assert!(!parent.properties.contains_key("gpg.skip"));
    }

    #[test]
    fn fragments_merge_idempotently_through_the_store() {
        let (rules, skeleton) = fixtures();
        let store = InMemoryStore::new();

        let mut first = ParentAggregator::new(&rules, &skeleton);
        first.add_module("integration-tests/main", "integration-tests", "main").unwrap();
        first.flush_partial(&store, "main").unwrap();

        let mut second = ParentAggregator::new(&rules, &skeleton);
        second.add_module("extensions/arc-deployment", "extensions", "arc").unwrap();
        second.add_module("integration-tests/main", "integration-tests", "arc").unwrap();
        second.flush_partial(&store, "arc").unwrap();

        assert!(!ParentAggregator::new(&rules, &skeleton).flush_partial(&store, "empty").unwrap());

        let mut merged = ParentAggregator::new(&rules, &skeleton);
        assert_eq!(merged.merge_partials(&store).unwrap(), 2);
        let once = merged.finalize(None);
        merged.merge_partials(&store).unwrap();
        assert_eq!(merged.finalize(None), once);

        assert_eq!(once.profile_modules("integration-tests"), ["integration-tests/main".to_string()]);
        assert_eq!(once.profile_modules("extensions"), ["extensions/arc-deployment".to_string()]);
    }

    #[test]
    fn flushing_twice_is_a_dirty_store() {
        let (rules, skeleton) = fixtures();
        let store = InMemoryStore::new();
        let mut agg = ParentAggregator::new(&rules, &skeleton);
        agg.add_module("integration-tests/main", "integration-tests", "main").unwrap();
        agg.flush_partial(&store, "main").unwrap();
        assert!(matches!(
            agg.flush_partial(&store, "main"),
            Err(StoreError::AlreadyExists { .. })
        ));
    }
}
