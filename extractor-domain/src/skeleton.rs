//! Built-in template for the generated parent project.

use crate::rules::ExtractionRules;
use extractor_types::descriptor::{DEFAULT_PLUGIN_GROUP, POM_TYPE};
use extractor_types::{
    BuildSection, DependencyRef, ManagementKey, ParentSkeleton, PluginRef, Profile,
};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};

const QUARKUS_GROUP: &str = "io.quarkus";
const SKELETON_ARTIFACT: &str = "quarkus-main-tests";
const IMPORT_SCOPE: &str = "import";

/// Parent skeleton written by `init`. Its profile set is closed: a module
/// can only be listed in a profile declared here.
pub fn builtin(rules: &ExtractionRules) -> ParentSkeleton {
    let names = &rules.profiles;
    let java21 = |id: &str| format!("{}{}", id, names.java21_suffix);

    let mut profiles: Vec<Profile> = [
        names.extensions.clone(),
        names.integration_tests.clone(),
        java21(&names.integration_tests),
        names.integration_tests_build.clone(),
        names.extension_managed_modules.clone(),
        names.integration_managed_modules.clone(),
        java21(&names.integration_managed_modules),
    ]
    .into_iter()
    .map(Profile::new)
    .collect();

    let mut runtime = Profile::new(&names.create_extension_runtime);
    runtime.build = Some(BuildSection {
        plugins: vec![
            PluginRef::new(QUARKUS_GROUP, "quarkus-extension-maven-plugin")
                .with_version(rules.core_version().to_string())
                .with_execution("extension-descriptor")
                .with_configuration(json!({
                    "deployment": "${project.groupId}:${project.artifactId}-deployment:${project.version}"
                })),
        ],
        plugin_management: Vec::new(),
    });
    profiles.push(runtime);

    let mut deployment = Profile::new(&names.create_extension_deployment);
    deployment.build = Some(BuildSection {
        plugins: vec![
            PluginRef::new(DEFAULT_PLUGIN_GROUP, "maven-compiler-plugin")
                .with_version(format!("${{{}}}", rules.properties.compiler_plugin))
                .with_configuration(json!({
                    "annotationProcessorPaths": [{
                        "groupId": QUARKUS_GROUP,
                        "artifactId": "quarkus-extension-processor",
                        "version": rules.community_version().to_string(),
                    }]
                })),
        ],
        plugin_management: Vec::new(),
    });
    profiles.push(deployment);

    let platform_bom = DependencyRef::new(rules.platform_group_id().to_string(), &rules.modules.bom)
        .with_version(rules.platform_version().to_string())
        .with_type(POM_TYPE)
        .with_scope(IMPORT_SCOPE);

    let properties: BTreeMap<String, String> = [
        (rules.properties.platform_group_id.clone(), QUARKUS_GROUP.to_string()),
        ("maven.compiler.release".to_string(), "17".to_string()),
    ]
    .into_iter()
    .collect();

    ParentSkeleton {
        group_id: rules.target_group_id.clone(),
        artifact_id: SKELETON_ARTIFACT.to_string(),
        properties,
        dependency_management: vec![platform_bom],
        profiles,
    }
}

/// Keys the generated parent manages for its modules. Imported BOMs are not
/// managed artifacts.
pub fn test_parent_managed_keys(skeleton: &ParentSkeleton) -> BTreeSet<ManagementKey> {
    skeleton
        .dependency_management
        .iter()
        .filter(|d| !d.scope.as_deref().is_some_and(|s| s.eq_ignore_ascii_case(IMPORT_SCOPE)))
        .map(DependencyRef::management_key)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skeleton_declares_every_listing_profile() {
        let rules = ExtractionRules::default();
        let skeleton = builtin(&rules);
        for id in [
            "extensions",
            "integration-tests",
            "integration-tests-21",
            "integration-tests-build",
            "extension-tests-managed-modules",
            "integration-tests-managed-modules",
            "integration-tests-managed-modules-21",
        ] {
            assert!(skeleton.profile(id).is_some(), "missing profile {id}");
        }
        assert_eq!(skeleton.group_id, "io.quarkus.qe.tests");
    }

    #[test]
    fn extension_profiles_carry_plugins() {
        let skeleton = builtin(&ExtractionRules::default());
        let runtime = skeleton
            .profile("create-extension-runtime-module")
            .and_then(|p| p.build.as_ref())
            .unwrap();
        assert_eq!(runtime.plugins[0].artifact_id, "quarkus-extension-maven-plugin");
        assert_eq!(runtime.plugins[0].version.as_deref(), Some("${core.quarkus.version}"));
    }

    #[test]
    fn imports_platform_bom() {
        let skeleton = builtin(&ExtractionRules::default());
        let bom = &skeleton.dependency_management[0];
        assert_eq!(bom.group_id, "${quarkus.platform.group-id}");
        assert_eq!(bom.version.as_deref(), Some("${quarkus.platform.version}"));
        assert!(bom.is_pom());
        assert!(test_parent_managed_keys(&skeleton).is_empty());
    }
}
