//! Per-dependency version decisions.
//!
//! `decide` is a pure function of the dependency, the owning module's
//! resolved snapshot and the loaded [`ResolutionContext`]. Anything other
//! than [`VersionDecision::Unmanaged`] is routine but must be reviewed by a
//! human, so `resolve` records it in the audit log.

use crate::rules::ExtractionRules;
use extractor_audit::AuditLog;
use extractor_store::ResolutionContext;
use extractor_types::{
    DecisionReason, DependencyRef, ModuleDescriptor, Usage, VersionDecision, VersionRef,
    descriptor::strip_deployment_suffix,
};
use tracing::debug;

const INTEGRATION_TEST_ARTIFACT_PREFIX: &str = "quarkus-integration-test";

pub struct VersionResolutionPolicy<'a> {
    rules: &'a ExtractionRules,
    ctx: &'a ResolutionContext,
}

impl<'a> VersionResolutionPolicy<'a> {
    pub fn new(rules: &'a ExtractionRules, ctx: &'a ResolutionContext) -> Self {
        Self { rules, ctx }
    }

    /// Artifacts the generated parent manages for its own modules.
    pub fn is_test_parent_managed(&self, artifact_id: &str) -> bool {
        self.rules.is_copy_as_is(artifact_id)
            || artifact_id.starts_with(INTEGRATION_TEST_ARTIFACT_PREFIX)
            || self.ctx.is_test_parent_managed_artifact(artifact_id)
    }

    /// Outside extension test modules, deployment artifacts are managed by
    /// convention and only get a decision when this holds.
    pub fn applies_to(dep: &DependencyRef) -> bool {
        !dep.is_deployment() || dep.is_test_jar() || dep.has_project_version_marker()
    }

    pub fn decide(&self, dep: &DependencyRef, owner: &ModuleDescriptor) -> VersionDecision {
        let key = dep.management_key();

        // BOM precedence holds over every rule below, community test jars
        // included. Only artifacts the product platform BOM lacks are pinned.
        if self.ctx.is_bom_managed(&key) || self.is_test_parent_managed(&dep.artifact_id) {
            return self.not_in_product_bom(dep, owner);
        }

        if dep.has_project_version_marker() {
            return self.marker_fallback(dep);
        }
        if !dep.has_empty_version() {
            return VersionDecision::Unmanaged;
        }

        if dep.is_test_jar() && self.rules.is_community_test_jar(&key) {
            return match owner.resolved_version_of(&key) {
                Some(resolved) if !resolved.eq_ignore_ascii_case(&owner.version) => {
                    VersionDecision::pinned(
                        VersionRef::literal(resolved),
                        DecisionReason::CommunityFallback,
                    )
                }
                _ => self.community(),
            };
        }

        if dep.is_deployment() && dep.is_test_jar() {
            return self.community();
        }

        if has_deployment_counterpart(dep, owner) {
            return VersionDecision::Unmanaged;
        }

        self.fallback(dep, owner)
    }

    /// `decide`, plus an audit record for every pinned decision.
    pub fn resolve(
        &self,
        dep: &DependencyRef,
        owner: &ModuleDescriptor,
        audit: &AuditLog,
        usage: &Usage,
    ) -> VersionDecision {
        let decision = self.decide(dep, owner);
        if let VersionDecision::Pinned { version, reason } = &decision {
            debug!(
                module = %owner.artifact_id,
                dependency = %dep.management_key(),
                version = %version,
                reason = reason.as_str(),
                "pinned dependency version"
            );
            audit.record_unmanaged_dependency(dep, version.to_string(), usage);
        }
        decision
    }

    /// Writes a decision back into the dependency. A `${project.version}`
    /// marker never survives: unmanaged marker dependencies lose their version.
    pub fn apply(dep: &mut DependencyRef, decision: &VersionDecision) {
        match decision {
            VersionDecision::Pinned { version, .. } => dep.version = Some(version.to_string()),
            VersionDecision::Unmanaged if dep.has_project_version_marker() => dep.version = None,
            VersionDecision::Unmanaged => {}
        }
    }

    fn fallback(&self, dep: &DependencyRef, owner: &ModuleDescriptor) -> VersionDecision {
        let artifact = dep.artifact_id.as_str();
        if self.rules.test_framework_dependencies.contains(artifact) {
            return VersionDecision::pinned(
                self.rules.community_version(),
                DecisionReason::TestFrameworkFallback,
            );
        }
        if self.rules.productized_not_managed.contains(artifact) {
            return VersionDecision::pinned(
                self.rules.core_version(),
                DecisionReason::ProductizedFallback,
            );
        }
        if self.rules.community_dependencies.contains(artifact) {
            return self.community();
        }
        match owner.resolved_version_of(&dep.management_key()) {
            None => VersionDecision::pinned(self.rules.core_version(), DecisionReason::PlatformFallback),
            // Another artifact of the same monorepo release; its literal
            // version must not leak into the generated project.
            Some(resolved) if resolved.eq_ignore_ascii_case(&owner.version) => self.community(),
            Some(resolved) => {
                VersionDecision::pinned(VersionRef::literal(resolved), DecisionReason::ResolvedPin)
            }
        }
    }

    fn not_in_product_bom(&self, dep: &DependencyRef, owner: &ModuleDescriptor) -> VersionDecision {
        let key = dep.management_key();
        if !dep.has_empty_version() || !self.rules.is_bom_managed_but_not_product(&key) {
            return VersionDecision::Unmanaged;
        }
        match owner.resolved_version_of(&key) {
            Some(resolved) => {
                VersionDecision::pinned(VersionRef::literal(resolved), DecisionReason::ResolvedPin)
            }
            None => VersionDecision::Unmanaged,
        }
    }

    fn marker_fallback(&self, dep: &DependencyRef) -> VersionDecision {
        let artifact = dep.artifact_id.as_str();
        if self.rules.community_dependencies.contains(artifact) {
            self.community()
        } else if self.rules.platform_version_artifacts.contains(artifact) {
            VersionDecision::pinned(self.rules.platform_version(), DecisionReason::PlatformFallback)
        } else {
            VersionDecision::pinned(self.rules.core_version(), DecisionReason::PlatformFallback)
        }
    }

    fn community(&self) -> VersionDecision {
        VersionDecision::pinned(self.rules.community_version(), DecisionReason::CommunityFallback)
    }
}

/// The owner also declares `<artifact>-deployment`, so the runtime artifact
/// is managed wherever the deployment one is.
fn has_deployment_counterpart(dep: &DependencyRef, owner: &ModuleDescriptor) -> bool {
    owner.dependencies.iter().any(|other| {
        other.is_deployment()
            && other.artifact_id != dep.artifact_id
            && other.artifact_id.starts_with(&dep.artifact_id)
            && strip_deployment_suffix(&other.artifact_id) == dep.artifact_id
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use extractor_types::ManagementKey;
    use pretty_assertions::assert_eq;

    const OWNER_VERSION: &str = "999-SNAPSHOT";

    fn ctx() -> ResolutionContext {
        ResolutionContext {
            bom_managed: [ManagementKey::new("io.quarkus", "quarkus-arc")].into_iter().collect(),
            core_extensions: ["quarkus-arc".to_string()].into_iter().collect(),
            integration_test_modules: ["integration-tests/main".to_string()].into_iter().collect(),
            ..Default::default()
        }
    }

    fn owner() -> ModuleDescriptor {
        let mut owner = ModuleDescriptor::new(
            "io.quarkus",
            "quarkus-vertx-http-deployment",
            OWNER_VERSION,
            "extensions/vertx-http/deployment",
        );
        owner.resolved_dependencies = vec![
            DependencyRef::new("io.vertx", "vertx-web-client").with_version("4.5.11"),
            DependencyRef::new("io.quarkus", "quarkus-junit5-internal").with_version(OWNER_VERSION),
            DependencyRef::new("io.quarkus.gizmo", "gizmo").with_version("1.8.0"),
        ];
        owner
    }

    fn pinned(version: &str, reason: DecisionReason) -> VersionDecision {
        VersionDecision::pinned(VersionRef::parse(version), reason)
    }

    #[test]
    fn resolved_pin_uses_exact_version() {
        let rules = ExtractionRules::default();
        let ctx = ctx();
        let policy = VersionResolutionPolicy::new(&rules, &ctx);
        let dep = DependencyRef::new("io.vertx", "vertx-web-client");
        assert_eq!(
            policy.decide(&dep, &owner()),
            pinned("4.5.11", DecisionReason::ResolvedPin)
        );
    }

    #[test]
    fn own_release_version_becomes_community_placeholder() {
        let rules = ExtractionRules::default();
        let ctx = ctx();
        let policy = VersionResolutionPolicy::new(&rules, &ctx);
        let dep = DependencyRef::new("io.quarkus", "quarkus-junit5-internal");
        assert_eq!(
            policy.decide(&dep, &owner()),
            pinned("${community.quarkus.version}", DecisionReason::CommunityFallback)
        );
    }

    #[test]
    fn absent_from_snapshot_is_platform_fallback() {
        let rules = ExtractionRules::default();
        let ctx = ctx();
        let policy = VersionResolutionPolicy::new(&rules, &ctx);
        let dep = DependencyRef::new("org.acme", "unknown");
        assert_eq!(
            policy.decide(&dep, &owner()),
            pinned("${core.quarkus.version}", DecisionReason::PlatformFallback)
        );
    }

    #[test]
    fn allowlists_take_their_tracks() {
        let rules = ExtractionRules::default();
        let ctx = ctx();
        let policy = VersionResolutionPolicy::new(&rules, &ctx);
        let owner = owner();
        assert_eq!(
            policy.decide(&DependencyRef::new("io.quarkus", "quarkus-test-maven"), &owner),
            pinned("${community.quarkus.version}", DecisionReason::TestFrameworkFallback)
        );
        assert_eq!(
            policy.decide(&DependencyRef::new("io.quarkus", "quarkus-test-grpc"), &owner),
            pinned("${community.quarkus.version}", DecisionReason::CommunityFallback)
        );
    }

    #[test]
    fn productized_runtime_artifact_takes_core_track() {
        let mut rules = ExtractionRules::default();
        rules.productized_not_managed.insert("quarkus-reactive-datasource".to_string());
        let ctx = ctx();
        let policy = VersionResolutionPolicy::new(&rules, &ctx);
        assert_eq!(
            policy.decide(
                &DependencyRef::new("io.quarkus", "quarkus-reactive-datasource"),
                &owner()
            ),
            pinned("${core.quarkus.version}", DecisionReason::ProductizedFallback)
        );
    }

    #[test]
    fn bom_managed_stays_unmanaged_even_with_marker() {
        let rules = ExtractionRules::default();
        let ctx = ctx();
        let policy = VersionResolutionPolicy::new(&rules, &ctx);
        let dep = DependencyRef::new("io.quarkus", "quarkus-arc").with_version("${project.version}");
        let decision = policy.decide(&dep, &owner());
        assert_eq!(decision, VersionDecision::Unmanaged);

        let mut applied = dep.clone();
        VersionResolutionPolicy::apply(&mut applied, &decision);
        assert_eq!(applied.version, None);
    }

    #[test]
    fn marker_picks_community_platform_or_core() {
        let rules = ExtractionRules::default();
        let ctx = ctx();
        let policy = VersionResolutionPolicy::new(&rules, &ctx);
        let owner = owner();
        let marked = |a: &str| DependencyRef::new("io.quarkus", a).with_version("${project.version}");
        assert_eq!(
            policy.decide(&marked("quarkus-extension-processor"), &owner),
            pinned("${community.quarkus.version}", DecisionReason::CommunityFallback)
        );
        assert_eq!(
            policy.decide(&marked("quarkus-maven-plugin"), &owner),
            pinned("${quarkus.platform.version}", DecisionReason::PlatformFallback)
        );
        assert_eq!(
            policy.decide(&marked("quarkus-vertx"), &owner),
            pinned("${core.quarkus.version}", DecisionReason::PlatformFallback)
        );
    }

    #[test]
    fn explicit_version_is_left_alone() {
        let rules = ExtractionRules::default();
        let ctx = ctx();
        let policy = VersionResolutionPolicy::new(&rules, &ctx);
        let dep = DependencyRef::new("org.assertj", "assertj-core").with_version("3.26.0");
        assert_eq!(policy.decide(&dep, &owner()), VersionDecision::Unmanaged);
    }

    #[test]
    fn deployment_artifacts_are_managed_by_convention_unless_test_jar() {
        let rules = ExtractionRules::default();
        let ctx = ctx();
        let policy = VersionResolutionPolicy::new(&rules, &ctx);
        let dep = DependencyRef::new("io.quarkus", "quarkus-vertx-deployment");
        assert!(!VersionResolutionPolicy::applies_to(&dep));
        let test_jar = dep.with_type("test-jar");
        assert!(VersionResolutionPolicy::applies_to(&test_jar));
        assert_eq!(
            policy.decide(&test_jar, &owner()),
            pinned("${community.quarkus.version}", DecisionReason::CommunityFallback)
        );
    }

    #[test]
    fn resolved_deployment_artifact_is_pinned_when_asked() {
        let rules = ExtractionRules::default();
        let ctx = ctx();
        let policy = VersionResolutionPolicy::new(&rules, &ctx);
        let mut owner = owner();
        owner
            .resolved_dependencies
            .push(DependencyRef::new("io.quarkus", "vertx-http-deployment").with_version("3.15.3"));
        let dep = DependencyRef::new("io.quarkus", "vertx-http-deployment");
        assert_eq!(
            policy.decide(&dep, &owner),
            pinned("3.15.3", DecisionReason::ResolvedPin)
        );
    }

    #[test]
    fn community_test_jar_uses_resolved_version() {
        let rules = ExtractionRules::default();
        let ctx = ctx();
        let policy = VersionResolutionPolicy::new(&rules, &ctx);
        let dep = DependencyRef::new("io.quarkus.gizmo", "gizmo").with_type("test-jar");
        assert_eq!(
            policy.decide(&dep, &owner()),
            pinned("1.8.0", DecisionReason::CommunityFallback)
        );
        let mut bare = owner();
        bare.resolved_dependencies.clear();
        assert_eq!(
            policy.decide(&dep, &bare),
            pinned("${community.quarkus.version}", DecisionReason::CommunityFallback)
        );
    }

    #[test]
    fn bctls_is_pinned_although_bom_managed() {
        let rules = ExtractionRules::default();
        let mut ctx = ctx();
        ctx.bom_managed.insert(ManagementKey::new("org.bouncycastle", "bctls-jdk18on"));
        let policy = VersionResolutionPolicy::new(&rules, &ctx);
        let mut jsse = owner();
        jsse.resolved_dependencies
            .push(DependencyRef::new("org.bouncycastle", "bctls-jdk18on").with_version("1.78"));
        let dep = DependencyRef::new("org.bouncycastle", "bctls-jdk18on");
        assert_eq!(policy.decide(&dep, &jsse), pinned("1.78", DecisionReason::ResolvedPin));

        let audit = AuditLog::new();
        let usage = Usage::new(
            "quarkus-integration-test-bouncycastle-jsse",
            "integration-tests/bouncycastle-jsse",
        );
        policy.resolve(&dep, &jsse, &audit, &usage);
        assert_eq!(audit.len(), 1);

        // Explicit versions and missing snapshot entries are left to the BOM.
        let explicit = dep.clone().with_version("1.77");
        assert_eq!(policy.decide(&explicit, &jsse), VersionDecision::Unmanaged);
        assert_eq!(policy.decide(&dep, &owner()), VersionDecision::Unmanaged);
    }

    #[test]
    fn bom_managed_community_test_jar_stays_unmanaged() {
        let rules = ExtractionRules::default();
        let mut ctx = ctx();
        ctx.bom_managed.insert(ManagementKey::new("io.quarkus.gizmo", "gizmo"));
        let policy = VersionResolutionPolicy::new(&rules, &ctx);
        let dep = DependencyRef::new("io.quarkus.gizmo", "gizmo").with_type("test-jar");
        assert_eq!(policy.decide(&dep, &owner()), VersionDecision::Unmanaged);
    }

    #[test]
    fn deployment_sibling_suppresses_runtime_pin() {
        let rules = ExtractionRules::default();
        let ctx = ctx();
        let policy = VersionResolutionPolicy::new(&rules, &ctx);
        let mut owner = owner();
        owner.dependencies = vec![
            DependencyRef::new("io.quarkus", "quarkus-kafka-client"),
            DependencyRef::new("io.quarkus", "quarkus-kafka-client-deployment"),
        ];
        let dep = DependencyRef::new("io.quarkus", "quarkus-kafka-client");
        assert_eq!(policy.decide(&dep, &owner), VersionDecision::Unmanaged);
    }

    #[test]
    fn test_parent_artifacts_are_unmanaged() {
        let rules = ExtractionRules::default();
        let ctx = ctx();
        let policy = VersionResolutionPolicy::new(&rules, &ctx);
        let dep = DependencyRef::new("io.quarkus", "quarkus-integration-test-shared-library")
            .with_version("${project.version}");
        assert_eq!(policy.decide(&dep, &owner()), VersionDecision::Unmanaged);
    }

    #[test]
    fn resolve_records_only_pinned_decisions() {
        let rules = ExtractionRules::default();
        let ctx = ctx();
        let policy = VersionResolutionPolicy::new(&rules, &ctx);
        let audit = AuditLog::new();
        let usage = Usage::new("quarkus-vertx-http-deployment", "extensions/vertx-http-deployment");
        let owner = owner();
        policy.resolve(&DependencyRef::new("io.quarkus", "quarkus-arc"), &owner, &audit, &usage);
        assert!(audit.is_empty());
        policy.resolve(&DependencyRef::new("io.vertx", "vertx-web-client"), &owner, &audit, &usage);
        assert_eq!(audit.len(), 1);
        assert!(audit.render().contains("'io.vertx:vertx-web-client' is not managed by Quarkus BOM, going to use '4.5.11'"));
    }
}
