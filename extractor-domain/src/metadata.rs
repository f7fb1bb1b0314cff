//! What the `collect` pass extracts from well-known modules before any test
//! module is transformed.

use crate::error::ExtractError;
use crate::rules::ExtractionRules;
use extractor_types::{
    BuildParentSnapshot, DependencyRef, ManagementKey, ModuleDescriptor, PluginRef, VersionRef,
};
use std::collections::{BTreeMap, BTreeSet};

/// Every key the BOM manages, including its own dependencies.
pub fn bom_keys(bom: &ModuleDescriptor) -> Result<BTreeSet<ManagementKey>, ExtractError> {
    if bom.dependency_management.is_empty() {
        return Err(ExtractError::EmptyBom {
            module: bom.artifact_id.clone(),
        });
    }
    Ok(bom
        .dependency_management
        .iter()
        .chain(bom.dependencies.iter())
        .map(DependencyRef::management_key)
        .collect())
}

pub fn build_parent_snapshot(build_parent: &ModuleDescriptor) -> BuildParentSnapshot {
    BuildParentSnapshot {
        version: build_parent.version.clone(),
        properties: build_parent.properties.clone(),
        managed_keys: build_parent
            .dependency_management
            .iter()
            .map(DependencyRef::management_key)
            .collect(),
    }
}

/// Relative paths of the modules the integration-tests parent lists in its
/// test-modules profile.
pub fn integration_test_modules(
    rules: &ExtractionRules,
    it_parent: &ModuleDescriptor,
) -> Result<Vec<String>, ExtractError> {
    let profile_id = &rules.modules.test_modules_profile;
    let missing = || ExtractError::MissingTestModulesProfile {
        module: it_parent.artifact_id.clone(),
        profile: profile_id.clone(),
    };
    let profile = it_parent
        .profiles
        .iter()
        .find(|p| &p.id == profile_id)
        .ok_or_else(missing)?;
    if profile.modules.is_empty() {
        return Err(missing());
    }

    let base = it_parent.relative_path.trim_end_matches('/');
    Ok(profile
        .modules
        .iter()
        .map(|m| m.trim().trim_end_matches('/'))
        .filter(|m| !m.is_empty())
        .map(|m| if base.is_empty() { m.to_string() } else { format!("{}/{}", base, m) })
        .collect())
}

pub fn is_core_extension_module(rules: &ExtractionRules, module: &ModuleDescriptor) -> bool {
    let path = format!("/{}/", module.relative_path.trim_matches('/'));
    !module.artifact_id.is_empty()
        && path.contains("/extensions/")
        && !module
            .artifact_id
            .eq_ignore_ascii_case(&rules.modules.extensions_parent)
}

/// Lower-cased artifact id to version for every versioned plugin the shared
/// parent declares. `${property}` versions are resolved against the parent's
/// properties when possible.
pub fn parent_plugin_versions(shared_parent: &ModuleDescriptor) -> BTreeMap<String, String> {
    let Some(build) = &shared_parent.build else {
        return BTreeMap::new();
    };
    build
        .plugins
        .iter()
        .chain(build.plugin_management.iter())
        .filter_map(|plugin| {
            let version = plugin.version_str()?;
            Some((
                plugin_key(plugin),
                resolve_property(version, &shared_parent.properties),
            ))
        })
        .collect()
}

fn plugin_key(plugin: &PluginRef) -> String {
    plugin.artifact_id.trim().to_ascii_lowercase()
}

fn resolve_property(version: &str, properties: &BTreeMap<String, String>) -> String {
    match VersionRef::parse(version) {
        VersionRef::Property(name) => properties.get(&name).cloned().unwrap_or_else(|| version.to_string()),
        VersionRef::Literal(literal) => literal,
    }
}
