//! End-to-end transformation of representative modules: classify, transform,
//! register with the parent aggregator.

use extractor_audit::AuditLog;
use extractor_domain::{
    CustomizerRegistry, ExtractionRules, ModuleClassifier, ParentAggregator, ProjectTransformer,
    TransformOutcome, skeleton,
};
use extractor_store::ResolutionContext;
use extractor_types::{
    DependencyRef, Exclusion, FilePatch, ManagementKey, ModuleClassification, ModuleDescriptor,
    ModuleLink, TargetModuleDescriptor,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::BTreeSet;

const VERSION: &str = "999-SNAPSHOT";

fn context(rules: &ExtractionRules, core_extensions: &[&str]) -> ResolutionContext {
    let skeleton = skeleton::builtin(rules);
    ResolutionContext {
        bom_managed: [ManagementKey::new("io.quarkus", "quarkus-arc")].into_iter().collect(),
        test_parent_managed: skeleton::test_parent_managed_keys(&skeleton),
        core_extensions: core_extensions.iter().map(|s| s.to_string()).collect(),
        integration_test_modules: ["integration-tests/foo".to_string()].into_iter().collect(),
        skeleton,
        ..Default::default()
    }
}

fn extension_module(artifact: &str, ext_dir: &str) -> ModuleDescriptor {
    let mut module = ModuleDescriptor::new(
        "io.quarkus",
        artifact,
        VERSION,
        format!("extensions/{ext_dir}/deployment"),
    );
    module.contains_tests = true;
    module.parent_chain = vec![ModuleLink {
        artifact_id: "quarkus-extensions-parent".into(),
        relative_path: "extensions".into(),
    }];
    module
}

fn transform(
    rules: &ExtractionRules,
    ctx: &ResolutionContext,
    customizers: &CustomizerRegistry,
    module: &ModuleDescriptor,
    audit: &AuditLog,
) -> (TargetModuleDescriptor, bool) {
    let classification =
        ModuleClassifier::new(rules, ctx).classify(&module.relative_path, &module.artifact_id, module.packaging());
    match ProjectTransformer::new(rules, ctx, customizers)
        .transform(module, classification, audit)
        .unwrap()
    {
        TransformOutcome::Module { target, listed } => (*target, listed),
        other => panic!("expected a module for {}, got {other:?}", module.artifact_id),
    }
}

#[test]
fn unmanaged_deployment_dependency_is_pinned_to_resolved_version() {
    let rules = ExtractionRules::default();
    let ctx = context(&rules, &["quarkus-arc"]);
    let customizers = CustomizerRegistry::empty();
    let audit = AuditLog::new();

    let mut module = extension_module("vertx-http-deployment", "vertx-http");
    module.dependencies = vec![DependencyRef::new("io.quarkus", "vertx-http-deployment")];
    module.resolved_dependencies =
        vec![DependencyRef::new("io.quarkus", "vertx-http-deployment").with_version("3.15.3")];

    let (target, _) = transform(&rules, &ctx, &customizers, &module, &audit);
    assert_eq!(target.classification, ModuleClassification::ExtensionDeploymentTestModule);
    assert_eq!(target.dependencies[0].version.as_deref(), Some("3.15.3"));
    assert!(
        audit
            .render()
            .contains("'io.quarkus:vertx-http-deployment' is not managed by Quarkus BOM, going to use '3.15.3'")
    );
}

#[test]
fn build_ordering_dependency_is_stripped_from_integration_test() {
    let rules = ExtractionRules::default();
    let ctx = context(&rules, &["quarkus-arc"]);
    let customizers = CustomizerRegistry::default();
    let audit = AuditLog::new();

    let mut module = ModuleDescriptor::new(
        "io.quarkus",
        "quarkus-integration-test-foo",
        VERSION,
        "integration-tests/foo",
    );
    module.dependencies = vec![
        DependencyRef::new("io.quarkus", "quarkus-foo-deployment")
            .with_version("${project.version}")
            .with_type("pom")
            .with_scope("test")
            .with_exclusion(Exclusion::wildcard()),
        DependencyRef::new("io.quarkus", "quarkus-arc"),
    ];

    let (target, listed) = transform(&rules, &ctx, &customizers, &module, &audit);
    assert!(listed);
    assert_eq!(target.classification, ModuleClassification::IntegrationTestModule);
    let artifacts: Vec<&str> = target.dependencies.iter().map(|d| d.artifact_id.as_str()).collect();
    assert_eq!(artifacts, vec!["quarkus-arc"]);

    let mut parent = ParentAggregator::new(&rules, &ctx.skeleton);
    parent.add_target(&target, listed).unwrap();
    assert_eq!(
        parent.finalize(None).profile_modules("integration-tests"),
        ["integration-tests/foo".to_string()]
    );
}

#[test]
fn registered_customizer_runs_after_transformation() {
    let rules = ExtractionRules::default();
    let ctx = context(&rules, &["quarkus-websockets-next"]);
    let customizers = CustomizerRegistry::default();
    let audit = AuditLog::new();

    let module = extension_module("quarkus-websockets-next-deployment", "websockets-next");
    let (target, _) = transform(&rules, &ctx, &customizers, &module, &audit);
    assert_eq!(target.artifact_id, "tests-quarkus-websockets-next");
    assert_eq!(target.target_path, "extensions/websockets-next-deployment");
    let artifacts: Vec<&str> = target.dependencies.iter().map(|d| d.artifact_id.as_str()).collect();
    assert_eq!(artifacts, vec!["quarkus-kotlin", "jackson-module-kotlin"]);
}

#[test]
fn devtools_metadata_is_patched_once_the_module_is_supported() {
    let mut rules = ExtractionRules::default();
    let mut ctx = context(&rules, &["quarkus-arc"]);
    ctx.integration_test_modules.insert("integration-tests/devtools".to_string());
    let customizers = CustomizerRegistry::default();
    let audit = AuditLog::new();
    let module = ModuleDescriptor::new(
        "io.quarkus",
        "quarkus-integration-test-devtools",
        VERSION,
        "integration-tests/devtools",
    );

    let classifier = ModuleClassifier::new(&rules, &ctx);
    assert_eq!(
        classifier.classify(&module.relative_path, &module.artifact_id, module.packaging()),
        ModuleClassification::Unsupported
    );

    rules.unsupported_paths.retain(|p| p != "integration-tests/devtools");
    let (target, listed) = transform(&rules, &ctx, &customizers, &module, &audit);
    assert!(listed);
    assert!(target.file_patches.contains(&FilePatch::Replace {
        path: "src/test/resources/platform-metadata.json".into(),
        from: "{project.version}".into(),
        to: "{core.quarkus.version}".into(),
    }));
}

#[test]
fn copied_module_is_managed_by_generated_parent() {
    let rules = ExtractionRules::default();
    let ctx = context(&rules, &["quarkus-arc"]);
    let customizers = CustomizerRegistry::default();
    let audit = AuditLog::new();

    let mut module = ModuleDescriptor::new(
        "io.quarkus",
        "quarkus-arc-test-supplement",
        VERSION,
        "extensions/arc/test-supplement",
    );
    module.parent_chain = vec![ModuleLink {
        artifact_id: "quarkus-extensions-parent".into(),
        relative_path: "extensions".into(),
    }];

    let (target, listed) = transform(&rules, &ctx, &customizers, &module, &audit);
    assert_eq!(target.classification, ModuleClassification::CopyAsIs);
    assert_eq!(target.target_path, "extensions/arc-test-supplement");
    assert!(!listed);

    let mut parent = ParentAggregator::new(&rules, &ctx.skeleton);
    parent.add_target(&target, listed).unwrap();
    let finalized = parent.finalize(None);
    assert_eq!(
        finalized.profile_modules("extension-tests-managed-modules"),
        ["extensions/arc-test-supplement".to_string()]
    );
    assert!(finalized.dependency_management.iter().any(|d| {
        d.group_id == "io.quarkus.qe.tests"
            && d.artifact_id == "quarkus-arc-test-supplement"
            && d.version.as_deref() == Some("${project.version}")
    }));
}

fn arb_extensions() -> impl Strategy<Value = Vec<(String, bool, bool)>> {
    // (extension name, is core extension, runtime already declared)
    prop::collection::vec(
        (
            prop::string::string_regex(r"[a-z]{3,10}").unwrap(),
            any::<bool>(),
            any::<bool>(),
        ),
        1..8,
    )
    .prop_map(|mut v| {
        v.sort_by(|a, b| a.0.cmp(&b.0));
        v.dedup_by(|a, b| a.0 == b.0);
        v
    })
}

proptest! {
    #[test]
    fn runtime_counterparts_are_complete(extensions in arb_extensions()) {
        let rules = ExtractionRules::default();
        let core: Vec<String> = extensions
            .iter()
            .filter(|(_, core, _)| *core)
            .map(|(name, _, _)| format!("quarkus-{name}"))
            .collect();
        let core_refs: Vec<&str> = core.iter().map(String::as_str).collect();
        let ctx = context(&rules, &core_refs);
        let customizers = CustomizerRegistry::empty();

        let mut module = extension_module("quarkus-owner-deployment", "owner");
        for (name, _, declared) in &extensions {
            module
                .dependencies
                .push(DependencyRef::new("io.quarkus", format!("quarkus-{name}-deployment")));
            if *declared {
                module.dependencies.push(DependencyRef::new("io.quarkus", format!("quarkus-{name}")));
            }
        }

        let (target, _) = transform(&rules, &ctx, &customizers, &module, &AuditLog::new());
        let runtime: BTreeSet<&str> = target
            .all_dependencies()
            .filter(|d| !d.is_deployment())
            .map(|d| d.artifact_id.as_str())
            .collect();

        for (name, is_core, _) in &extensions {
            let artifact = format!("quarkus-{name}");
            if *is_core && !rules.has_no_runtime_counterpart(&format!("{artifact}-deployment"), &artifact) {
                prop_assert!(runtime.contains(artifact.as_str()), "missing runtime {}", artifact);
            }
        }
        let synthesized: BTreeSet<&str> =
            target.runtime_counterparts.iter().map(|d| d.artifact_id.as_str()).collect();
        prop_assert_eq!(synthesized.len(), target.runtime_counterparts.len());
    }
}
