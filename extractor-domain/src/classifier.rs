use crate::rules::{ExtractionRules, is_integration_test_path};
use extractor_store::ResolutionContext;
use extractor_types::ModuleClassification;
use extractor_types::descriptor::DEFAULT_PACKAGING;

/// Maps a module to its role. Rules are evaluated in order and the first
/// match wins.
pub struct ModuleClassifier<'a> {
    rules: &'a ExtractionRules,
    ctx: &'a ResolutionContext,
}

impl<'a> ModuleClassifier<'a> {
    pub fn new(rules: &'a ExtractionRules, ctx: &'a ResolutionContext) -> Self {
        Self { rules, ctx }
    }

    pub fn classify(&self, path: &str, artifact_id: &str, packaging: &str) -> ModuleClassification {
        let path = path.trim_end_matches('/');
        let modules = &self.rules.modules;

        if self.rules.is_unsupported_path(path) {
            return ModuleClassification::Unsupported;
        }
        if artifact_id == modules.bom {
            return ModuleClassification::BomSource;
        }
        if artifact_id == modules.build_parent {
            return ModuleClassification::BuildParentSource;
        }
        if self.rules.is_copy_as_is(artifact_id)
            || (is_integration_test_path(path)
                && !packaging.eq_ignore_ascii_case(DEFAULT_PACKAGING))
        {
            return ModuleClassification::CopyAsIs;
        }
        if self.rules.is_extension_test_path(path) {
            return if self.rules.is_supplementary_path(path) {
                ModuleClassification::ExtensionSupplementaryModule
            } else {
                ModuleClassification::ExtensionDeploymentTestModule
            };
        }
        if is_integration_test_path(path) {
            return if self.ctx.is_direct_it_module(path) {
                ModuleClassification::IntegrationTestModule
            } else {
                ModuleClassification::IntegrationTestSubmodule
            };
        }
        ModuleClassification::OrdinarySkip
    }
}
