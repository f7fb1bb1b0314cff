//! Module-specific adjustments applied after the default transformation.
//!
//! Each customizer is keyed by the source module's artifact id. They patch
//! upstream quirks that no general rule should know about.

use crate::error::ExtractError;
use crate::rules::ExtractionRules;
use extractor_types::{
    DependencyRef, FilePatch, ModuleDescriptor, ParentSkeleton, TargetModuleDescriptor,
};

/// What a customizer may consult besides the target it mutates.
pub struct CustomizeContext<'a> {
    pub rules: &'a ExtractionRules,
    pub skeleton: &'a ParentSkeleton,
    pub module: &'a ModuleDescriptor,
}

pub trait ModuleCustomizer: Send + Sync {
    /// Source artifact ids this customizer applies to.
    fn artifact_ids(&self) -> &'static [&'static str];

    fn customize(
        &self,
        cx: &CustomizeContext<'_>,
        target: &mut TargetModuleDescriptor,
    ) -> Result<(), ExtractError>;
}

pub fn builtin_customizers() -> Vec<Box<dyn ModuleCustomizer>> {
    vec![
        Box::new(KotlinWebSocketsCustomizer),
        Box::new(DevtoolsPlatformMetadataCustomizer),
        Box::new(PackagingRemovedResourceCustomizer),
        Box::new(MainApplicationPropertiesCustomizer),
        Box::new(MavenItCustomizer),
        Box::new(PanacheKotlinCustomizer),
        Box::new(ExtensionPluginsCustomizer),
        Box::new(DisableNativeCustomizer),
        Box::new(VirtualThreadsCustomizer),
    ]
}

/// Customizers looked up by source artifact id.
pub struct CustomizerRegistry {
    customizers: Vec<Box<dyn ModuleCustomizer>>,
}

impl Default for CustomizerRegistry {
    fn default() -> Self {
        Self::new(builtin_customizers())
    }
}

impl CustomizerRegistry {
    pub fn new(customizers: Vec<Box<dyn ModuleCustomizer>>) -> Self {
        Self { customizers }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn has_customizer(&self, artifact_id: &str) -> bool {
        self.customizers
            .iter()
            .any(|c| c.artifact_ids().contains(&artifact_id))
    }

    /// Run every customizer registered for `cx.module`, in registration order.
    pub fn apply(
        &self,
        cx: &CustomizeContext<'_>,
        target: &mut TargetModuleDescriptor,
    ) -> Result<usize, ExtractError> {
        let mut applied = 0;
        for customizer in &self.customizers {
            if customizer
                .artifact_ids()
                .contains(&cx.module.artifact_id.as_str())
            {
                customizer.customize(cx, target)?;
                applied += 1;
            }
        }
        Ok(applied)
    }
}

fn replace(path: &str, from: &str, to: &str) -> FilePatch {
    FilePatch::Replace {
        path: path.to_string(),
        from: from.to_string(),
        to: to.to_string(),
    }
}

/// Kotlin WebSocket tests need the Jackson Kotlin module registered.
struct KotlinWebSocketsCustomizer;

impl ModuleCustomizer for KotlinWebSocketsCustomizer {
    fn artifact_ids(&self) -> &'static [&'static str] {
        &["quarkus-websockets-next-deployment"]
    }

    fn customize(
        &self,
        _cx: &CustomizeContext<'_>,
        target: &mut TargetModuleDescriptor,
    ) -> Result<(), ExtractError> {
        target
            .dependencies
            .push(DependencyRef::new("io.quarkus", "quarkus-kotlin"));
        target.dependencies.push(DependencyRef::new(
            "com.fasterxml.jackson.module",
            "jackson-module-kotlin",
        ));
        Ok(())
    }
}

/// Only reached when `integration-tests/devtools` is dropped from
/// `unsupported_paths` in the rules.
struct DevtoolsPlatformMetadataCustomizer;

impl ModuleCustomizer for DevtoolsPlatformMetadataCustomizer {
    fn artifact_ids(&self) -> &'static [&'static str] {
        &["quarkus-integration-test-devtools"]
    }

    fn customize(
        &self,
        cx: &CustomizeContext<'_>,
        target: &mut TargetModuleDescriptor,
    ) -> Result<(), ExtractError> {
        const FILE: &str = "src/test/resources/platform-metadata.json";
        let props = &cx.rules.properties;
        target.file_patches.push(replace(
            FILE,
            "{project.version}",
            &format!("{{{}}}", props.core),
        ));
        target.file_patches.push(replace(
            FILE,
            "{project.groupId}",
            &format!("{{{}}}", props.platform_group_id),
        ));
        Ok(())
    }
}

/// Removed-resource tests spell out the shared library's coordinates, which
/// now live under the generated group.
struct PackagingRemovedResourceCustomizer;

impl ModuleCustomizer for PackagingRemovedResourceCustomizer {
    fn artifact_ids(&self) -> &'static [&'static str] {
        &["quarkus-integration-test-packaging"]
    }

    fn customize(
        &self,
        cx: &CustomizeContext<'_>,
        target: &mut TargetModuleDescriptor,
    ) -> Result<(), ExtractError> {
        target.file_patches.push(replace(
            "src/test/java/io/quarkus/removedclasses/AbstractRemovedResourceTest.java",
            r"io.quarkus\\:quarkus-integration-test-shared-library",
            &format!(
                r"{}\\:quarkus-integration-test-shared-library",
                cx.rules.target_group_id
            ),
        ));
        Ok(())
    }
}

struct MainApplicationPropertiesCustomizer;

impl ModuleCustomizer for MainApplicationPropertiesCustomizer {
    fn artifact_ids(&self) -> &'static [&'static str] {
        &["quarkus-integration-test-main"]
    }

    fn customize(
        &self,
        cx: &CustomizeContext<'_>,
        target: &mut TargetModuleDescriptor,
    ) -> Result<(), ExtractError> {
        const FILE: &str = "src/main/resources/application.properties";
        for artifact in [
            "quarkus-integration-test-shared-library",
            "quarkus-integration-test-main",
        ] {
            target.file_patches.push(replace(
                FILE,
                &format!(r"io.quarkus\:{}", artifact),
                &format!(r"{}\:{}", cx.rules.target_group_id, artifact),
            ));
        }
        Ok(())
    }
}

/// Maven plugin tests resolve the platform descriptor and recurse on the
/// compiler source/target properties unless they point at the release.
struct MavenItCustomizer;

impl ModuleCustomizer for MavenItCustomizer {
    fn artifact_ids(&self) -> &'static [&'static str] {
        &["quarkus-integration-test-maven"]
    }

    fn customize(
        &self,
        cx: &CustomizeContext<'_>,
        target: &mut TargetModuleDescriptor,
    ) -> Result<(), ExtractError> {
        for name in ["maven.compiler.source", "maven.compiler.target"] {
            target
                .properties
                .insert(name.to_string(), "${maven.compiler.release}".to_string());
        }
        let platform_version = cx.rules.platform_version().to_string();
        target.dependencies.push(
            DependencyRef::new(
                cx.rules.platform_group_id().to_string(),
                "quarkus-bom-quarkus-platform-descriptor",
            )
            .with_version(platform_version.clone())
            .with_classifier(platform_version)
            .with_type("json"),
        );
        Ok(())
    }
}

/// Only the transitive Kotlin extension may provide the serialization
/// capability.
struct PanacheKotlinCustomizer;

impl ModuleCustomizer for PanacheKotlinCustomizer {
    fn artifact_ids(&self) -> &'static [&'static str] {
        &["quarkus-integration-test-hibernate-reactive-panache-kotlin"]
    }

    fn customize(
        &self,
        _cx: &CustomizeContext<'_>,
        target: &mut TargetModuleDescriptor,
    ) -> Result<(), ExtractError> {
        target
            .dependencies
            .retain(|d| !d.artifact_id.eq_ignore_ascii_case("quarkus-rest-kotlin"));
        Ok(())
    }
}

/// The class-transformer test extension is built like a real extension.
struct ExtensionPluginsCustomizer;

impl ExtensionPluginsCustomizer {
    const RUNTIME: &'static str = "quarkus-integration-test-class-transformer";
    const DEPLOYMENT: &'static str = "quarkus-integration-test-class-transformer-deployment";
}

impl ModuleCustomizer for ExtensionPluginsCustomizer {
    fn artifact_ids(&self) -> &'static [&'static str] {
        &[Self::RUNTIME, Self::DEPLOYMENT]
    }

    fn customize(
        &self,
        cx: &CustomizeContext<'_>,
        target: &mut TargetModuleDescriptor,
    ) -> Result<(), ExtractError> {
        let profile_id = if cx.module.artifact_id == Self::DEPLOYMENT {
            &cx.rules.profiles.create_extension_deployment
        } else {
            &cx.rules.profiles.create_extension_runtime
        };
        let profile = cx
            .skeleton
            .profile(profile_id)
            .ok_or_else(|| ExtractError::UnknownProfile {
                profile: profile_id.clone(),
                module: cx.module.artifact_id.clone(),
            })?;
        let plugins = profile
            .build
            .as_ref()
            .map(|b| b.plugins.clone())
            .unwrap_or_default();
        target.build_mut().plugins.extend(plugins);
        Ok(())
    }
}

/// Bouncy Castle JSSE tests cannot run in native mode.
struct DisableNativeCustomizer;

impl ModuleCustomizer for DisableNativeCustomizer {
    fn artifact_ids(&self) -> &'static [&'static str] {
        &[
            "quarkus-integration-test-bouncycastle-jsse",
            "quarkus-integration-test-bouncycastle-fips-jsse",
        ]
    }

    fn customize(
        &self,
        _cx: &CustomizeContext<'_>,
        target: &mut TargetModuleDescriptor,
    ) -> Result<(), ExtractError> {
        target.properties.insert(
            "quarkus.build.skip".to_string(),
            "${quarkus.native.enabled}".to_string(),
        );
        target.file_patches.push(FilePatch::Touch {
            path: "disable-native-profile".to_string(),
        });
        Ok(())
    }
}

/// `maven.compiler.release` is stripped everywhere, but virtual-thread tests
/// need Java 21 in their run profile.
struct VirtualThreadsCustomizer;

impl ModuleCustomizer for VirtualThreadsCustomizer {
    fn artifact_ids(&self) -> &'static [&'static str] {
        &["quarkus-virtual-threads-integration-tests-parent"]
    }

    fn customize(
        &self,
        cx: &CustomizeContext<'_>,
        target: &mut TargetModuleDescriptor,
    ) -> Result<(), ExtractError> {
        const PROFILE: &str = "run-virtual-thread-tests";
        let profile = target
            .profile_mut(PROFILE)
            .ok_or_else(|| ExtractError::UnknownProfile {
                profile: PROFILE.to_string(),
                module: cx.module.artifact_id.clone(),
            })?;
        profile
            .properties
            .entry("maven.compiler.release".to_string())
            .or_insert_with(|| "21".to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton;
    use extractor_types::{ModuleClassification, ParentRef, Profile, schema};
    use pretty_assertions::assert_eq;

    fn target(artifact: &str) -> TargetModuleDescriptor {
        TargetModuleDescriptor {
            schema: schema::TARGET_MODULE_V1.to_string(),
            source_module: artifact.to_string(),
            source_path: "integration-tests/x".to_string(),
            classification: ModuleClassification::IntegrationTestModule,
            target_path: "integration-tests/x".to_string(),
            group_id: "io.quarkus.qe.tests".to_string(),
            artifact_id: artifact.to_string(),
            version: "999-SNAPSHOT".to_string(),
            name: None,
            description: None,
            packaging: None,
            parent: ParentRef {
                group_id: "io.quarkus.qe.tests".to_string(),
                artifact_id: "quarkus-main-tests".to_string(),
                version: Some("999-SNAPSHOT".to_string()),
                relative_path: Some("../..".to_string()),
            },
            direct_submodule: true,
            profile_name: "integration-tests".to_string(),
            properties: Default::default(),
            self_dependency: None,
            dependencies: Vec::new(),
            runtime_counterparts: Vec::new(),
            dependency_management: Vec::new(),
            build: None,
            profiles: Vec::new(),
            repositories: Vec::new(),
            plugin_repositories: Vec::new(),
            modules: Vec::new(),
            excluded_sources: Vec::new(),
            file_patches: Vec::new(),
        }
    }

    fn run(artifact: &str, target: &mut TargetModuleDescriptor) -> Result<usize, ExtractError> {
        let rules = ExtractionRules::default();
        let skeleton = skeleton::builtin(&rules);
        let module = ModuleDescriptor::new("io.quarkus", artifact, "999-SNAPSHOT", "integration-tests/x");
        let cx = CustomizeContext {
            rules: &rules,
            skeleton: &skeleton,
            module: &module,
        };
        CustomizerRegistry::default().apply(&cx, target)
    }

    #[test]
    fn unknown_module_is_untouched() {
        let mut t = target("quarkus-integration-test-other");
        let before = t.clone();
        assert_eq!(run("quarkus-integration-test-other", &mut t).unwrap(), 0);
        assert_eq!(t, before);
    }

    #[test]
    fn packaging_patch_keeps_escaped_backslashes() {
        let mut t = target("quarkus-integration-test-packaging");
        run("quarkus-integration-test-packaging", &mut t).unwrap();
        assert_eq!(
            t.file_patches,
            vec![FilePatch::Replace {
                path: "src/test/java/io/quarkus/removedclasses/AbstractRemovedResourceTest.java".into(),
                from: "io.quarkus\\\\:quarkus-integration-test-shared-library".into(),
                to: "io.quarkus.qe.tests\\\\:quarkus-integration-test-shared-library".into(),
            }]
        );
    }

    #[test]
    fn devtools_patch_uses_property_names() {
        let mut t = target("quarkus-integration-test-devtools");
        run("quarkus-integration-test-devtools", &mut t).unwrap();
        assert_eq!(
            t.file_patches[0],
            FilePatch::Replace {
                path: "src/test/resources/platform-metadata.json".into(),
                from: "{project.version}".into(),
                to: "{core.quarkus.version}".into(),
            }
        );
    }

    #[test]
    fn maven_it_adds_platform_descriptor() {
        let mut t = target("quarkus-integration-test-maven");
        run("quarkus-integration-test-maven", &mut t).unwrap();
        let dep = t.dependencies.last().unwrap();
        assert_eq!(dep.group_id, "${quarkus.platform.group-id}");
        assert_eq!(dep.classifier.as_deref(), Some("${quarkus.platform.version}"));
        assert_eq!(dep.kind.as_deref(), Some("json"));
        assert_eq!(
            t.properties.get("maven.compiler.source").map(String::as_str),
            Some("${maven.compiler.release}")
        );
    }

    #[test]
    fn class_transformer_gets_skeleton_plugins() {
        let mut t = target("quarkus-integration-test-class-transformer-deployment");
        run("quarkus-integration-test-class-transformer-deployment", &mut t).unwrap();
        let plugins = &t.build.as_ref().unwrap().plugins;
        assert_eq!(plugins[0].artifact_id, "maven-compiler-plugin");
    }

    #[test]
    fn bouncycastle_is_disabled_in_native() {
        let mut t = target("quarkus-integration-test-bouncycastle-jsse");
        run("quarkus-integration-test-bouncycastle-jsse", &mut t).unwrap();
        assert!(t.file_patches.contains(&FilePatch::Touch {
            path: "disable-native-profile".into()
        }));
        assert!(t.properties.contains_key("quarkus.build.skip"));
    }

    #[test]
    fn virtual_threads_profile_is_required() {
        let mut t = target("quarkus-virtual-threads-integration-tests-parent");
        let err = run("quarkus-virtual-threads-integration-tests-parent", &mut t).unwrap_err();
        assert!(matches!(err, ExtractError::UnknownProfile { .. }));

        let mut profile = Profile::new("run-virtual-thread-tests");
        profile.properties.insert("maven.compiler.release".into(), "23".into());
        t.profiles.push(profile);
        run("quarkus-virtual-threads-integration-tests-parent", &mut t).unwrap();
        assert_eq!(
            t.profiles[0].properties.get("maven.compiler.release").map(String::as_str),
            Some("23")
        );
    }

    #[test]
    fn panache_kotlin_drops_rest_kotlin() {
        let mut t = target("quarkus-integration-test-hibernate-reactive-panache-kotlin");
        t.dependencies = vec![
            DependencyRef::new("io.quarkus", "quarkus-rest-kotlin"),
            DependencyRef::new("io.quarkus", "quarkus-kotlin"),
        ];
        run("quarkus-integration-test-hibernate-reactive-panache-kotlin", &mut t).unwrap();
        assert_eq!(t.dependencies.len(), 1);
        assert_eq!(t.dependencies[0].artifact_id, "quarkus-kotlin");
    }
}
