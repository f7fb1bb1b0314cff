//! Build plugin versions.
//!
//! An unversioned plugin would make the generated build non-reproducible, so
//! the cascade either finds a version or fails with
//! [`ExtractError::UnresolvablePluginVersion`].

use crate::error::ExtractError;
use crate::rules::ExtractionRules;
use extractor_audit::AuditLog;
use extractor_store::ResolutionContext;
use extractor_types::{BuildSection, ModuleDescriptor, PluginRef, Usage, VersionRef};
use tracing::debug;

const COMPILER_PLUGIN: &str = "maven-compiler-plugin";
const EXTENSION_PLUGIN: &str = "quarkus-extension-maven-plugin";
const QUARKUS_MAVEN_PLUGIN: &str = "quarkus-maven-plugin";
const QUARKUS_GROUP: &str = "io.quarkus";
const DEFAULT_COMPILE_EXECUTION: &str = "default-compile";
/// The compiler plugin of this module carries arguments the generated build needs.
const KEEP_COMPILER_PLUGIN_PATH: &str = "integration-tests/test-extension/extension/";

/// Where a plugin version came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginVersionSource {
    SharedParent,
    PluginProperty,
    ConventionProperty,
    ResolvedBuild,
    ResolvedPluginManagement,
}

pub struct PluginVersionResolutionPolicy<'a> {
    rules: &'a ExtractionRules,
    ctx: &'a ResolutionContext,
}

impl<'a> PluginVersionResolutionPolicy<'a> {
    pub fn new(rules: &'a ExtractionRules, ctx: &'a ResolutionContext) -> Self {
        Self { rules, ctx }
    }

    /// First hit wins: shared-parent map, plugin property table,
    /// `<artifactId>.version` property, resolved build plugins, resolved
    /// plugin management.
    pub fn resolve(
        &self,
        plugin: &PluginRef,
        owner: &ModuleDescriptor,
    ) -> Result<(VersionRef, PluginVersionSource), ExtractError> {
        let artifact = plugin.artifact_id.trim();

        if owner.artifact_id != self.rules.modules.shared_parent
            && let Some(version) = self.ctx.parent_plugin_version(artifact)
        {
            return Ok((VersionRef::parse(version), PluginVersionSource::SharedParent));
        }

        if let Some(property) = self.rules.plugin_version_properties.get(artifact)
            && self.ctx.has_parent_property(property)
        {
            return Ok((VersionRef::property(property), PluginVersionSource::PluginProperty));
        }

        let convention = format!("{}.version", artifact);
        if self.ctx.has_parent_property(&convention) {
            return Ok((VersionRef::property(convention), PluginVersionSource::ConventionProperty));
        }

        if let Some(version) = find_version(&owner.resolved_build_plugins, artifact) {
            return Ok((VersionRef::literal(version), PluginVersionSource::ResolvedBuild));
        }
        if let Some(version) = find_version(&owner.resolved_plugin_management, artifact) {
            return Ok((
                VersionRef::literal(version),
                PluginVersionSource::ResolvedPluginManagement,
            ));
        }

        Err(ExtractError::UnresolvablePluginVersion {
            plugin: artifact.to_string(),
            module: owner.artifact_id.clone(),
        })
    }

    /// Prepare a build section for the generated module: drop plugins the
    /// generated parent already provides, version everything else and record
    /// each kept plugin in the audit log.
    pub fn prepare_build(
        &self,
        build: &mut BuildSection,
        owner: &ModuleDescriptor,
        target_path: &str,
        audit: &AuditLog,
        usage: &Usage,
    ) -> Result<(), ExtractError> {
        build
            .plugins
            .retain(|plugin| !self.is_dropped(plugin, target_path));

        for plugin in &mut build.plugins {
            if plugin.artifact_id.eq_ignore_ascii_case(COMPILER_PLUGIN) {
                plugin.version = Some(self.compiler_version().to_string());
            }
            if self.is_quarkus_maven_plugin(plugin) {
                self.relocate_quarkus_maven_plugin(plugin);
            }
            if plugin.version_str().is_none() && !self.rules.is_parent_managed_plugin(&plugin.artifact_id) {
                let (version, source) = self.resolve(plugin, owner)?;
                debug!(
                    module = %owner.artifact_id,
                    plugin = %plugin.artifact_id,
                    version = %version,
                    source = ?source,
                    "resolved plugin version"
                );
                plugin.version = Some(version.to_string());
            }
            // Parent-managed plugins stay versionless and are not reported.
            if plugin.version.is_some() {
                audit.record_build_plugin(plugin, usage);
            }
        }

        for plugin in &mut build.plugin_management {
            if self.is_quarkus_maven_plugin(plugin) {
                self.relocate_quarkus_maven_plugin(plugin);
            }
        }
        Ok(())
    }

    fn is_dropped(&self, plugin: &PluginRef, target_path: &str) -> bool {
        let artifact = plugin.artifact_id.as_str();
        if self.rules.is_ignored_plugin(artifact) {
            return true;
        }
        if artifact.eq_ignore_ascii_case(COMPILER_PLUGIN) {
            if plugin.is_bare() {
                return true;
            }
            if !target_path.contains(KEEP_COMPILER_PLUGIN_PATH)
                && plugin.executions.len() == 1
                && plugin.executions[0]
                    .id
                    .eq_ignore_ascii_case(DEFAULT_COMPILE_EXECUTION)
            {
                return true;
            }
        }
        artifact.eq_ignore_ascii_case(EXTENSION_PLUGIN) && plugin.is_bare()
    }

    fn compiler_version(&self) -> VersionRef {
        VersionRef::property(&self.rules.properties.compiler_plugin)
    }

    fn is_quarkus_maven_plugin(&self, plugin: &PluginRef) -> bool {
        plugin.artifact_id.eq_ignore_ascii_case(QUARKUS_MAVEN_PLUGIN)
            && plugin.group_id.eq_ignore_ascii_case(QUARKUS_GROUP)
    }

    /// The platform may publish the plugin under another group.
    fn relocate_quarkus_maven_plugin(&self, plugin: &mut PluginRef) {
        plugin.group_id = self.rules.platform_group_id().to_string();
        plugin.version = Some(self.rules.platform_version().to_string());
    }
}

fn find_version<'p>(plugins: &'p [PluginRef], artifact_id: &str) -> Option<&'p str> {
    plugins
        .iter()
        .filter(|p| p.artifact_id.eq_ignore_ascii_case(artifact_id))
        .find_map(PluginRef::version_str)
}
