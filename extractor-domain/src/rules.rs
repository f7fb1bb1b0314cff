//! Declarative rule tables driving classification and version decisions.
//!
//! `ExtractionRules::default()` is the built-in rule set. Every table can be
//! overridden from the `[rules]` section of `extractor.toml`; tables that are
//! not named keep their defaults.

use extractor_types::{ManagementKey, VersionRef};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const EXTENSIONS_DIR: &str = "extensions";
pub const INTEGRATION_TESTS_DIR: &str = "integration-tests";
const DEPLOYMENT_DIR: &str = "deployment";
const CENTRAL_REPOSITORY_ID: &str = "central";

/// Artifact ids of modules with a fixed role in the monorepo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WellKnownModules {
    pub bom: String,
    pub build_parent: String,
    /// Parent declaring plugin versions for the whole monorepo.
    pub shared_parent: String,
    pub integration_tests_parent: String,
    /// Profile of the integration-tests parent listing the test modules.
    pub test_modules_profile: String,
    pub extensions_parent: String,
    /// Module processed last by the external build order.
    pub terminal: String,
}

impl Default for WellKnownModules {
    fn default() -> Self {
        Self {
            bom: "quarkus-bom".to_string(),
            build_parent: "quarkus-build-parent".to_string(),
            shared_parent: "quarkus-parent".to_string(),
            integration_tests_parent: "quarkus-integration-tests-parent".to_string(),
            test_modules_profile: "test-modules".to_string(),
            extensions_parent: "quarkus-extensions-parent".to_string(),
            terminal: "quarkus-documentation".to_string(),
        }
    }
}

/// Property names the generated project resolves versions through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionProperties {
    pub community: String,
    pub core: String,
    pub platform: String,
    pub platform_group_id: String,
    pub compiler_plugin: String,
    pub project: String,
}

impl Default for VersionProperties {
    fn default() -> Self {
        Self {
            community: "community.quarkus.version".to_string(),
            core: "core.quarkus.version".to_string(),
            platform: "quarkus.platform.version".to_string(),
            platform_group_id: "quarkus.platform.group-id".to_string(),
            compiler_plugin: "version.compiler.plugin".to_string(),
            project: "project.version".to_string(),
        }
    }
}

/// Profile ids of the parent skeleton.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileNames {
    pub extensions: String,
    pub integration_tests: String,
    pub extension_managed_modules: String,
    pub integration_managed_modules: String,
    pub integration_tests_build: String,
    pub java21_suffix: String,
    pub create_extension_runtime: String,
    pub create_extension_deployment: String,
}

impl Default for ProfileNames {
    fn default() -> Self {
        Self {
            extensions: "extensions".to_string(),
            integration_tests: "integration-tests".to_string(),
            extension_managed_modules: "extension-tests-managed-modules".to_string(),
            integration_managed_modules: "integration-tests-managed-modules".to_string(),
            integration_tests_build: "integration-tests-build".to_string(),
            java21_suffix: "-21".to_string(),
            create_extension_runtime: "create-extension-runtime-module".to_string(),
            create_extension_deployment: "create-extension-deployment-module".to_string(),
        }
    }
}

/// Test source left out of the copied module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisabledTest {
    /// Path suffix of the source file, e.g. `io/quarkus/it/FooTest.java`.
    pub source: String,
    pub artifact_ids: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionRules {
    pub modules: WellKnownModules,
    pub properties: VersionProperties,
    pub profiles: ProfileNames,

    /// Group of every generated module.
    pub target_group_id: String,
    /// Prefix for artifact ids of extracted extension test modules.
    pub extension_test_prefix: String,

    pub unsupported_paths: Vec<String>,
    pub copy_as_is_artifacts: BTreeSet<String>,
    /// Path fragments of extension modules other tests need but which are
    /// not deployment modules.
    pub supplementary_paths: Vec<String>,

    /// Released with the community version only.
    pub community_dependencies: BTreeSet<String>,
    pub test_framework_dependencies: BTreeSet<String>,
    pub productized_not_managed: BTreeSet<String>,
    pub community_test_jars: BTreeSet<ManagementKey>,
    /// Managed by the core BOM but absent from the product platform BOM;
    /// pinned to the owner's resolved version.
    pub bom_managed_but_not_product: BTreeSet<ManagementKey>,
    /// Artifacts that follow the platform release rather than core.
    pub platform_version_artifacts: BTreeSet<String>,

    /// Deployment artifacts without a runtime half.
    pub no_runtime_counterpart: BTreeSet<String>,
    pub no_runtime_counterpart_fragments: Vec<String>,
    /// Dependency-management entries dropped from every module.
    pub ignored_managed_artifacts: BTreeSet<String>,

    pub ignored_properties: BTreeSet<String>,
    pub ignored_plugins: BTreeSet<String>,
    /// Plugins whose version always comes from the generated parent.
    pub parent_managed_plugins: BTreeSet<String>,
    /// Plugin artifact id to the property holding its version.
    pub plugin_version_properties: BTreeMap<String, String>,

    pub java21_path_fragments: Vec<String>,
    pub disabled_tests: Vec<DisabledTest>,
}

fn set<const N: usize>(items: [&str; N]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ExtractionRules {
    fn default() -> Self {
        Self {
            modules: WellKnownModules::default(),
            properties: VersionProperties::default(),
            profiles: ProfileNames::default(),
            target_group_id: "io.quarkus.qe.tests".to_string(),
            extension_test_prefix: "tests-".to_string(),
            unsupported_paths: [
                "integration-tests/kubernetes/maven-invoker-way",
                "integration-tests/test-extension",
                "integration-tests/grpc-external-proto-test",
                "integration-tests/logging-gelf",
                "integration-tests/devtools",
                "integration-tests/jpa-oracle",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            copy_as_is_artifacts: set([
                "quarkus-integration-test-class-transformer-parent",
                "quarkus-integration-test-class-transformer-deployment",
                "quarkus-integration-test-class-transformer",
                "quarkus-integration-test-shared-library",
                "quarkus-integration-test-test-extension",
                "quarkus-integration-test-test-extension-extension",
                "quarkus-integration-test-test-extension-extension-deployment",
                "integration-test-extension-that-defines-junit-test-extensions-deployment",
                "integration-test-extension-that-defines-junit-test-extensions",
                "integration-test-extension-that-defines-junit-test-extensions-parent",
                "quarkus-arc-test-supplement",
                "quarkus-security-test-utils",
                "quarkus-integration-test-common-jpa-entities",
            ]),
            supplementary_paths: vec![
                "test-supplement".to_string(),
                "security/test-utils".to_string(),
            ],
            community_dependencies: set([
                "quarkus-grpc-protoc-plugin",
                "quarkus-extension-processor",
                "quarkus-test-grpc",
            ]),
            test_framework_dependencies: set(["quarkus-test-maven", "quarkus-devmode-test-utils"]),
            productized_not_managed: set(["quarkus-reactive-datasource-deployment"]),
            community_test_jars: [ManagementKey::new("io.quarkus.gizmo", "gizmo")]
                .into_iter()
                .collect(),
            bom_managed_but_not_product: [ManagementKey::new("org.bouncycastle", "bctls-jdk18on")]
                .into_iter()
                .collect(),
            platform_version_artifacts: set([
                "quarkus-maven-plugin",
                "quarkus-bom-quarkus-platform-descriptor",
            ]),
            no_runtime_counterpart: set(["quarkus-devservices-deployment"]),
            no_runtime_counterpart_fragments: vec!["-spi".to_string()],
            ignored_managed_artifacts: set(["quarkus-bom-test"]),
            ignored_properties: set([
                "docker-prune.location",
                "revapi.buildFailureMessage",
                "project.build.outputTimestamp",
                "revapi.reportSeverity",
                "volume.access.modifier",
                "os.detected.name",
                "os.detected.arch",
                "os.detected.bitness",
                "os.detected.classifier",
                "os.detected.version",
                "os.detected.version.major",
                "os.detected.version.minor",
                "os.detected.release",
                "os.detected.release.version",
                "os.detected.release.like.fedora",
                "jdk.min.version",
                "minimum-java-version",
                "native.surefire.skip",
                "impsort.skip",
                "gpg.skip",
                "maven.deploy.skip",
                "maven.compiler.argument.testTarget",
                "maven.compiler.release",
                "maven.compiler.source",
                "maven.compiler.testSource",
                "maven.compiler.argument.target",
                "maven.compiler.target",
                "maven.compiler.argument.testSource",
                "maven.compiler.argument.source",
                "maven.compiler.testTarget",
                "failsafe.argLine.additional",
                "develocity.pts.active",
                "revapi.newVersion",
            ]),
            ignored_plugins: set([
                "forbiddenapis",
                "templating-maven-plugin",
                "maven-enforcer-plugin",
                "impsort-maven-plugin",
            ]),
            parent_managed_plugins: set(["maven-surefire-plugin", "maven-failsafe-plugin"]),
            plugin_version_properties: [
                ("kotlin-maven-plugin", "kotlin.version"),
                ("jandex-maven-plugin", "jandex.version"),
                (
                    "smallrye-certificate-generator-maven-plugin",
                    "smallrye-certificate-generator.version",
                ),
                ("properties-maven-plugin", "properties-maven-plugin.version"),
                ("maven-clean-plugin", "version.clean.plugin"),
                ("nexus-staging-maven-plugin", "version.nexus-staging.plugin"),
                ("maven-resources-plugin", "version.resources.plugin"),
                ("scala-maven-plugin", "scala-maven-plugin.version"),
                ("quarkus-extension-maven-plugin", "core.quarkus.version"),
                ("maven-invoker-plugin", "maven-invoker-plugin.version"),
                ("build-helper-maven-plugin", "build-helper-plugin.version"),
                (
                    "quarkus-platform-bom-maven-plugin",
                    "quarkus-platform-bom-plugin.version",
                ),
            ]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
            java21_path_fragments: vec!["integration-tests/virtual-threads".to_string()],
            disabled_tests: vec![DisabledTest {
                source: "io/quarkus/it/kubernetes/KindWithDefaultsTest.java".to_string(),
                artifact_ids: set([
                    "quarkus-integration-test-kubernetes-parent",
                    "quarkus-integration-test-kubernetes-standard",
                ]),
            }],
        }
    }
}

impl ExtractionRules {
    pub fn community_version(&self) -> VersionRef {
        VersionRef::property(&self.properties.community)
    }

    pub fn core_version(&self) -> VersionRef {
        VersionRef::property(&self.properties.core)
    }

    pub fn platform_version(&self) -> VersionRef {
        VersionRef::property(&self.properties.platform)
    }

    pub fn platform_group_id(&self) -> VersionRef {
        VersionRef::property(&self.properties.platform_group_id)
    }

    pub fn project_version(&self) -> VersionRef {
        VersionRef::property(&self.properties.project)
    }

    /// Matches whole path segments: `integration-tests/devtools` covers
    /// `integration-tests/devtools/common` but not `integration-tests/devtools-x`.
    pub fn is_unsupported_path(&self, path: &str) -> bool {
        let path = with_trailing_slash(path);
        self.unsupported_paths
            .iter()
            .any(|entry| path.starts_with(&with_trailing_slash(entry)))
    }

    pub fn is_copy_as_is(&self, artifact_id: &str) -> bool {
        self.copy_as_is_artifacts.contains(artifact_id)
    }

    pub fn is_supplementary_path(&self, path: &str) -> bool {
        self.supplementary_paths
            .iter()
            .any(|fragment| path.contains(fragment.as_str()))
    }

    /// `extensions/<..>/deployment` or a supplementary module under `extensions/`.
    pub fn is_extension_test_path(&self, path: &str) -> bool {
        is_extension_path(path)
            && (is_deployment_dir(path) || self.is_supplementary_path(path))
    }

    pub fn is_ignored_property(&self, name: &str) -> bool {
        self.ignored_properties.contains(name)
    }

    pub fn is_ignored_plugin(&self, artifact_id: &str) -> bool {
        self.ignored_plugins.contains(artifact_id)
    }

    pub fn is_parent_managed_plugin(&self, artifact_id: &str) -> bool {
        self.parent_managed_plugins
            .iter()
            .any(|p| p.eq_ignore_ascii_case(artifact_id))
    }

    pub fn has_no_runtime_counterpart(&self, deployment_artifact: &str, runtime_artifact: &str) -> bool {
        self.no_runtime_counterpart.contains(deployment_artifact)
            || self.no_runtime_counterpart.contains(runtime_artifact)
            || self
                .no_runtime_counterpart_fragments
                .iter()
                .any(|f| deployment_artifact.contains(f.as_str()))
    }

    pub fn is_community_test_jar(&self, key: &ManagementKey) -> bool {
        self.community_test_jars
            .iter()
            .any(|k| k.group_id == key.group_id && k.artifact_id.eq_ignore_ascii_case(&key.artifact_id))
    }

    pub fn is_bom_managed_but_not_product(&self, key: &ManagementKey) -> bool {
        self.bom_managed_but_not_product.iter().any(|k| {
            k.group_id.eq_ignore_ascii_case(&key.group_id)
                && k.artifact_id.eq_ignore_ascii_case(&key.artifact_id)
        })
    }

    pub fn is_non_central_repository(&self, id: &str) -> bool {
        !id.eq_ignore_ascii_case(CENTRAL_REPOSITORY_ID)
    }

    /// `-21` for modules that only run on Java 21, otherwise empty.
    pub fn profile_suffix(&self, target_path: &str) -> &str {
        if self
            .java21_path_fragments
            .iter()
            .any(|f| target_path.contains(f.as_str()))
        {
            &self.profiles.java21_suffix
        } else {
            ""
        }
    }

    /// Profile of the generated parent listing a test module.
    pub fn target_profile(&self, source_path: &str, target_path: &str) -> String {
        if is_extension_path(source_path) {
            self.profiles.extensions.clone()
        } else {
            format!(
                "{}{}",
                self.profiles.integration_tests,
                self.profile_suffix(target_path)
            )
        }
    }

    pub fn disabled_tests_for(&self, artifact_id: &str) -> Vec<String> {
        self.disabled_tests
            .iter()
            .filter(|t| t.artifact_ids.contains(artifact_id))
            .map(|t| t.source.clone())
            .collect()
    }
}

pub fn is_extension_path(path: &str) -> bool {
    path.starts_with(&format!("{}/", EXTENSIONS_DIR))
}

pub fn is_integration_test_path(path: &str) -> bool {
    path.starts_with(&format!("{}/", INTEGRATION_TESTS_DIR))
}

fn is_deployment_dir(path: &str) -> bool {
    path.trim_end_matches('/')
        .ends_with(&format!("/{}", DEPLOYMENT_DIR))
}

fn with_trailing_slash(path: &str) -> String {
    format!("{}/", path.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_paths_match_on_segments() {
        let rules = ExtractionRules::default();
        assert!(rules.is_unsupported_path("integration-tests/devtools"));
        assert!(rules.is_unsupported_path("integration-tests/devtools/common"));
        assert!(!rules.is_unsupported_path("integration-tests/devtools-registry-client"));
        assert!(!rules.is_unsupported_path("integration-tests/main"));
    }

    #[test]
    fn extension_test_paths() {
        let rules = ExtractionRules::default();
        assert!(rules.is_extension_test_path("extensions/arc/deployment"));
        assert!(rules.is_extension_test_path("extensions/arc/test-supplement"));
        assert!(rules.is_extension_test_path("extensions/security/test-utils"));
        assert!(!rules.is_extension_test_path("extensions/arc/runtime"));
        assert!(!rules.is_extension_test_path("integration-tests/arc/deployment"));
    }

    #[test]
    fn java21_profile_suffix() {
        let rules = ExtractionRules::default();
        assert_eq!(
            rules.target_profile(
                "integration-tests/virtual-threads/grpc",
                "integration-tests/virtual-threads/grpc"
            ),
            "integration-tests-21"
        );
        assert_eq!(
            rules.target_profile("integration-tests/main", "integration-tests/main"),
            "integration-tests"
        );
        assert_eq!(
            rules.target_profile("extensions/arc/deployment", "extensions/arc-deployment"),
            "extensions"
        );
    }

    #[test]
    fn runtime_counterpart_exceptions() {
        let rules = ExtractionRules::default();
        assert!(rules.has_no_runtime_counterpart("quarkus-devservices-deployment", "quarkus-devservices"));
        assert!(rules.has_no_runtime_counterpart("quarkus-arc-spi-deployment", "quarkus-arc-spi"));
        assert!(!rules.has_no_runtime_counterpart("quarkus-arc-deployment", "quarkus-arc"));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let rules: ExtractionRules = toml::from_str(
            r#"
            target_group_id = "org.acme.tests"
            community_test_jars = ["io.quarkus.gizmo:gizmo", "org.acme:fixtures"]

            [modules]
            terminal = "acme-docs"
            "#,
        )
        .unwrap();
        assert_eq!(rules.target_group_id, "org.acme.tests");
        assert_eq!(rules.modules.terminal, "acme-docs");
        assert_eq!(rules.modules.bom, "quarkus-bom");
        assert_eq!(rules.community_test_jars.len(), 2);
        assert!(rules.is_ignored_plugin("maven-enforcer-plugin"));
    }

    #[test]
    fn disabled_tests_by_artifact() {
        let rules = ExtractionRules::default();
        assert_eq!(
            rules.disabled_tests_for("quarkus-integration-test-kubernetes-standard"),
            vec!["io/quarkus/it/kubernetes/KindWithDefaultsTest.java".to_string()]
        );
        assert!(rules.disabled_tests_for("quarkus-integration-test-main").is_empty());
    }
}
