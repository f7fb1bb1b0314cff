//! Per-module transformation into the standalone project's descriptor.
//!
//! Two dependency flows exist. Extension deployment test modules get a self
//! dependency on the artifact they used to build plus synthesized runtime
//! counterparts; everything else (integration tests, supplementary modules,
//! copied modules and every profile) goes through the integration-test flow.

use crate::customizers::{CustomizeContext, CustomizerRegistry};
use crate::error::ExtractError;
use crate::plugin_policy::PluginVersionResolutionPolicy;
use crate::rules::ExtractionRules;
use crate::version_policy::VersionResolutionPolicy;
use extractor_audit::AuditLog;
use extractor_store::ResolutionContext;
use extractor_types::descriptor::{TEST_SCOPE, last_segment, parent_path, strip_deployment_suffix};
use extractor_types::{
    BuildSection, DependencyRef, ManagementKey, ModuleClassification, ModuleDescriptor, ParentRef,
    Profile, Repository, TargetModuleDescriptor, Usage, schema,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

const QUARKUS_ARTIFACT_PREFIX: &str = "quarkus-";
const QUARKUS_GROUP_PREFIX: &str = "io.quarkus";

/// Why a module produced no target descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// BOM or build parent; consumed by the `collect` pass.
    CollectedMetadata,
    /// Extension module without test sources.
    NoTests,
    NotATestModule,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::CollectedMetadata => "collected_metadata",
            SkipReason::NoTests => "no_tests",
            SkipReason::NotATestModule => "not_a_test_module",
        }
    }
}

/// Removal of an unsupported module from its already generated parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detach {
    pub parent_target_path: String,
    pub module_dir: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransformOutcome {
    Module {
        target: Box<TargetModuleDescriptor>,
        /// Listed in a module profile of the generated parent.
        listed: bool,
    },
    /// Build of the integration-tests parent, carried by the generated
    /// parent's integration-tests build profile.
    IntegrationTestsBuild(BuildSection),
    Unsupported { detach: Option<Detach> },
    Skipped { reason: SkipReason },
}

pub struct ProjectTransformer<'a> {
    rules: &'a ExtractionRules,
    ctx: &'a ResolutionContext,
    customizers: &'a CustomizerRegistry,
}

/// Per-module state shared by the individual preparation steps.
struct Scope<'m> {
    module: &'m ModuleDescriptor,
    target_path: String,
    usage: Usage,
    test_module: bool,
    parent_properties: BTreeMap<String, String>,
}

impl<'a> ProjectTransformer<'a> {
    pub fn new(
        rules: &'a ExtractionRules,
        ctx: &'a ResolutionContext,
        customizers: &'a CustomizerRegistry,
    ) -> Self {
        Self {
            rules,
            ctx,
            customizers,
        }
    }

    fn versions(&self) -> VersionResolutionPolicy<'a> {
        VersionResolutionPolicy::new(self.rules, self.ctx)
    }

    fn plugins(&self) -> PluginVersionResolutionPolicy<'a> {
        PluginVersionResolutionPolicy::new(self.rules, self.ctx)
    }

    pub fn transform(
        &self,
        module: &ModuleDescriptor,
        classification: ModuleClassification,
        audit: &AuditLog,
    ) -> Result<TransformOutcome, ExtractError> {
        use ModuleClassification::*;
        match classification {
            BomSource | BuildParentSource => Ok(TransformOutcome::Skipped {
                reason: SkipReason::CollectedMetadata,
            }),
            Unsupported => Ok(TransformOutcome::Unsupported {
                detach: self.detach(module),
            }),
            OrdinarySkip => {
                if module.artifact_id == self.rules.modules.integration_tests_parent {
                    if let Some(build) = self.integration_tests_build(module, audit)? {
                        return Ok(TransformOutcome::IntegrationTestsBuild(build));
                    }
                }
                Ok(TransformOutcome::Skipped {
                    reason: SkipReason::NotATestModule,
                })
            }
            ExtensionDeploymentTestModule | ExtensionSupplementaryModule
                if !module.contains_tests =>
            {
                warn!(
                    module = %module.artifact_id,
                    path = %module.relative_path,
                    "extension module has no tests, skipping"
                );
                Ok(TransformOutcome::Skipped {
                    reason: SkipReason::NoTests,
                })
            }
            ExtensionDeploymentTestModule
            | ExtensionSupplementaryModule
            | IntegrationTestModule
            | IntegrationTestSubmodule
            | CopyAsIs => self.extract(module, classification, audit),
        }
    }

    /// The integration-tests parent's own build, prepared like a module's.
    pub fn integration_tests_build(
        &self,
        module: &ModuleDescriptor,
        audit: &AuditLog,
    ) -> Result<Option<BuildSection>, ExtractError> {
        let Some(mut build) = module.build.clone() else {
            return Ok(None);
        };
        let usage = Usage::new(&module.artifact_id, &module.relative_path);
        self.plugins()
            .prepare_build(&mut build, module, &module.relative_path, audit, &usage)?;
        Ok(Some(build))
    }

    fn extract(
        &self,
        module: &ModuleDescriptor,
        classification: ModuleClassification,
        audit: &AuditLog,
    ) -> Result<TransformOutcome, ExtractError> {
        let source_path = module.relative_path.trim_end_matches('/');
        let extension_flag = self.rules.is_extension_test_path(source_path);
        let copy_as_is = classification == ModuleClassification::CopyAsIs;
        let deployment_tests = classification == ModuleClassification::ExtensionDeploymentTestModule;

        let target_path = if extension_flag {
            self.extension_target_path(module)?
        } else {
            source_path.to_string()
        };
        let direct = extension_flag || self.ctx.is_direct_it_module(source_path);
        let test_module = if extension_flag {
            module.contains_tests
        } else {
            classification.is_integration_test()
                || crate::rules::is_integration_test_path(source_path)
        };

        let scope = Scope {
            module,
            usage: Usage::new(&module.artifact_id, &target_path),
            target_path,
            test_module,
            parent_properties: self.ctx.parent_properties(),
        };

        let (artifact_id, name) = if deployment_tests {
            (
                format!(
                    "{}{}",
                    self.rules.extension_test_prefix,
                    strip_deployment_suffix(&module.artifact_id)
                ),
                Some(strip_deployment_suffix(module.display_name()).to_string()),
            )
        } else {
            (module.artifact_id.clone(), module.name.clone())
        };

        let mut dependencies = self.prepare_dependencies(&module.dependencies, &scope, deployment_tests, audit);
        let self_dependency = deployment_tests.then(|| self.self_dependency(module));
        let mut runtime_counterparts = if deployment_tests {
            self.runtime_counterparts(self_dependency.iter().chain(dependencies.iter()))
        } else {
            Vec::new()
        };
        for dep in dependencies.iter_mut().chain(runtime_counterparts.iter_mut()) {
            if self.rules.is_copy_as_is(&dep.artifact_id) {
                dep.version = None;
            }
        }

        let build = match &module.build {
            Some(build) => {
                let mut build = build.clone();
                self.plugins().prepare_build(
                    &mut build,
                    module,
                    &scope.target_path,
                    audit,
                    &scope.usage,
                )?;
                Some(build)
            }
            None => None,
        };

        let profiles = module
            .profiles
            .iter()
            .map(|p| self.prepare_profile(p, &scope, audit))
            .collect::<Result<Vec<_>, _>>()?;

        let (properties, repositories, plugin_repositories, packaging, modules, description) =
            if copy_as_is {
                (
                    module.properties.clone(),
                    module.repositories.clone(),
                    module.plugin_repositories.clone(),
                    module.packaging.clone(),
                    module.modules.clone(),
                    None,
                )
            } else {
                (
                    self.properties(&module.properties, &scope),
                    self.repositories(&module.repositories, &scope, audit, false),
                    self.repositories(&module.plugin_repositories, &scope, audit, true),
                    None,
                    Vec::new(),
                    Some(format!("Tests extracted from project {}", module.display_name())),
                )
            };

        let mut target = TargetModuleDescriptor {
            schema: schema::TARGET_MODULE_V1.to_string(),
            source_module: module.artifact_id.clone(),
            source_path: source_path.to_string(),
            classification,
            target_path: scope.target_path.clone(),
            group_id: self.rules.target_group_id.clone(),
            artifact_id,
            version: module.version.clone(),
            name,
            description,
            packaging,
            parent: self.parent_ref(module, &scope.target_path, direct),
            direct_submodule: direct,
            profile_name: self.rules.target_profile(source_path, &scope.target_path),
            properties,
            self_dependency,
            dependencies,
            runtime_counterparts,
            dependency_management: self.prepare_dependency_management(
                &module.dependency_management,
                &scope,
                audit,
            ),
            build,
            profiles,
            repositories,
            plugin_repositories,
            modules,
            excluded_sources: self.rules.disabled_tests_for(&module.artifact_id),
            file_patches: Vec::new(),
        };

        let cx = CustomizeContext {
            rules: self.rules,
            skeleton: &self.ctx.skeleton,
            module,
        };
        let customized = self.customizers.apply(&cx, &mut target)?;

        debug!(
            module = %module.artifact_id,
            target = %target.target_path,
            classification = classification.as_str(),
            customized,
            "transformed module"
        );
        Ok(TransformOutcome::Module {
            target: Box::new(target),
            listed: direct && test_module,
        })
    }

    /// `extensions/<ext>/deployment` lands next to its extension directory
    /// as `extensions/<ext>-deployment`.
    fn extension_target_path(&self, module: &ModuleDescriptor) -> Result<String, ExtractError> {
        let parent_id = &self.rules.modules.extensions_parent;
        let ancestor = module
            .find_ancestor(parent_id)
            .ok_or_else(|| ExtractError::MissingExtensionsParent {
                module: module.artifact_id.clone(),
                path: module.relative_path.clone(),
                parent: parent_id.clone(),
            })?;
        let dir = format!(
            "{}-{}",
            last_segment(parent_path(&module.relative_path)),
            module.dir_name()
        );
        let base = ancestor.relative_path.trim_end_matches('/');
        Ok(if base.is_empty() {
            dir
        } else {
            format!("{}/{}", base, dir)
        })
    }

    fn parent_ref(&self, module: &ModuleDescriptor, target_path: &str, direct: bool) -> ParentRef {
        match (&module.parent, direct) {
            (Some(parent), false) => ParentRef {
                group_id: self.rules.target_group_id.clone(),
                ..parent.clone()
            },
            _ => ParentRef {
                group_id: self.rules.target_group_id.clone(),
                artifact_id: self.ctx.skeleton.artifact_id.clone(),
                version: Some(module.version.clone()),
                relative_path: Some(relative_path_to_root(target_path)),
            },
        }
    }

    fn detach(&self, module: &ModuleDescriptor) -> Option<Detach> {
        let path = module.relative_path.trim_end_matches('/');
        if self.ctx.is_direct_it_module(path) || self.rules.is_extension_test_path(path) {
            return None;
        }
        let parent = parent_path(path);
        if parent.is_empty() {
            return None;
        }
        Some(Detach {
            parent_target_path: parent.to_string(),
            module_dir: last_segment(path).to_string(),
        })
    }

    fn self_dependency(&self, module: &ModuleDescriptor) -> DependencyRef {
        let dep = DependencyRef::new(&module.group_id, &module.artifact_id).with_scope(TEST_SCOPE);
        if self.ctx.is_bom_managed(&dep.management_key()) {
            dep
        } else {
            dep.with_version(self.rules.core_version().to_string())
        }
    }

    fn prepare_dependencies(
        &self,
        declared: &[DependencyRef],
        scope: &Scope<'_>,
        deployment_tests: bool,
        audit: &AuditLog,
    ) -> Vec<DependencyRef> {
        let owner = scope.module;
        let policy = self.versions();

        let mut deps: Vec<DependencyRef> = declared
            .iter()
            .filter(|d| !is_build_ordering_dependency(d, &owner.version, deployment_tests))
            .filter(|d| deployment_tests || !(is_quarkus_own(d, &owner.version) && d.is_pom()))
            .cloned()
            .collect();

        for dep in &mut deps {
            if deployment_tests {
                // Standalone, these may legitimately need transitive test dependencies.
                if is_quarkus_own(dep, &owner.version) && dep.has_single_wildcard_exclusion() {
                    dep.exclusions.clear();
                }
            } else if dep.has_compile_scope() {
                dep.scope = None;
            }

            if deployment_tests || VersionResolutionPolicy::applies_to(dep) {
                let decision = policy.resolve(dep, owner, audit, &scope.usage);
                VersionResolutionPolicy::apply(dep, &decision);
            }
            self.correct_group(dep);
        }
        deps
    }

    /// Every non-test deployment artifact of a core extension needs its
    /// runtime half on the test classpath.
    fn runtime_counterparts<'d>(
        &self,
        deps: impl Iterator<Item = &'d DependencyRef> + Clone,
    ) -> Vec<DependencyRef> {
        let present: BTreeSet<String> = deps
            .clone()
            .filter(|d| !d.is_test_jar() && !d.is_pom())
            .map(|d| d.artifact_id.to_ascii_lowercase())
            .collect();

        let mut counterparts: BTreeMap<ManagementKey, DependencyRef> = BTreeMap::new();
        for dep in deps {
            if dep.has_test_scope() || !dep.is_deployment() || dep.is_test_jar() || dep.is_pom() {
                continue;
            }
            let runtime = strip_deployment_suffix(&dep.artifact_id);
            if self.rules.has_no_runtime_counterpart(&dep.artifact_id, runtime)
                || !self.ctx.is_core_extension(runtime)
                || present.contains(&runtime.to_ascii_lowercase())
            {
                continue;
            }
            let counterpart = DependencyRef {
                artifact_id: runtime.to_string(),
                ..dep.clone()
            };
            counterparts
                .entry(counterpart.management_key())
                .or_insert(counterpart);
        }
        counterparts.into_values().collect()
    }

    /// Artifacts the generated parent manages move to the generated group.
    fn correct_group(&self, dep: &mut DependencyRef) {
        if self.versions().is_test_parent_managed(&dep.artifact_id) {
            dep.group_id = self.rules.target_group_id.clone();
            dep.version = Some(self.rules.project_version().to_string());
        }
    }

    fn prepare_dependency_management(
        &self,
        managed: &[DependencyRef],
        scope: &Scope<'_>,
        audit: &AuditLog,
    ) -> Vec<DependencyRef> {
        let kept: Vec<DependencyRef> = managed
            .iter()
            .filter(|d| !self.ctx.is_managed_by_build_parent(&d.management_key()))
            .filter(|d| !self.rules.ignored_managed_artifacts.contains(&d.artifact_id))
            .cloned()
            .map(|mut d| {
                self.correct_group(&mut d);
                if self.rules.is_copy_as_is(&d.artifact_id) {
                    d.version = Some(scope.module.version.clone());
                }
                d
            })
            .collect();
        if !kept.is_empty() {
            audit.record_dependency_management(kept.iter(), &scope.usage);
        }
        kept
    }

    fn prepare_profile(
        &self,
        profile: &Profile,
        scope: &Scope<'_>,
        audit: &AuditLog,
    ) -> Result<Profile, ExtractError> {
        let mut prepared = profile.clone();
        if let Some(build) = prepared.build.as_mut() {
            self.plugins().prepare_build(
                build,
                scope.module,
                &scope.target_path,
                audit,
                &scope.usage,
            )?;
        }
        prepared.dependency_management =
            self.prepare_dependency_management(&profile.dependency_management, scope, audit);
        prepared.dependencies = self.prepare_dependencies(&profile.dependencies, scope, false, audit);
        prepared.properties = self.properties(&profile.properties, scope);
        Ok(prepared)
    }

    /// Test modules only keep what the generated parent does not already
    /// define with the same value.
    fn properties(
        &self,
        properties: &BTreeMap<String, String>,
        scope: &Scope<'_>,
    ) -> BTreeMap<String, String> {
        if !scope.test_module {
            return properties.clone();
        }
        properties
            .iter()
            .filter(|(k, _)| !self.rules.is_ignored_property(k))
            .filter(|(k, v)| scope.parent_properties.get(*k) != Some(*v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn repositories(
        &self,
        repositories: &[Repository],
        scope: &Scope<'_>,
        audit: &AuditLog,
        plugin: bool,
    ) -> Vec<Repository> {
        repositories
            .iter()
            .filter(|r| self.rules.is_non_central_repository(&r.id))
            .inspect(|r| {
                if plugin {
                    audit.record_plugin_repository(r, &scope.usage);
                } else {
                    audit.record_repository(r, &scope.usage);
                }
            })
            .cloned()
            .collect()
    }
}

/// `../` once per directory level of the target path.
pub fn relative_path_to_root(target_path: &str) -> String {
    let separators = target_path.trim_matches('/').matches('/').count();
    "../".repeat(separators + 1)
}

/// Artifacts released together with the module itself.
fn is_quarkus_own(dep: &DependencyRef, owner_version: &str) -> bool {
    (dep.artifact_id.starts_with(QUARKUS_ARTIFACT_PREFIX)
        || dep.artifact_id.starts_with(QUARKUS_GROUP_PREFIX))
        && (dep.has_empty_version()
            || dep.has_project_version_marker()
            || dep
                .version_str()
                .is_some_and(|v| v.eq_ignore_ascii_case(owner_version)))
}

/// POM-typed, wildcard-excluded dependencies on the monorepo's own artifacts
/// exist only to order its build.
fn is_build_ordering_dependency(dep: &DependencyRef, owner_version: &str, deployment_tests: bool) -> bool {
    (dep.has_test_scope() || deployment_tests)
        && is_quarkus_own(dep, owner_version)
        && dep.has_single_wildcard_exclusion()
        && dep.is_pom()
}
