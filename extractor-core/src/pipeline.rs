//! The extraction passes, extracted from the CLI.
//!
//! Every pass is I/O-agnostic: module descriptors come from a
//! [`ModuleSource`], working state goes through a [`WorkingStore`] and the
//! generated project through an [`OutputPort`].
//!
//! Pass order is `init`, `collect`, one `extract` per module, `finalize`.
//! Each pass may run in its own process.

use crate::ports::{ModuleSource, OutputPort};
use crate::settings::{CollectSettings, ExtractSettings};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use extractor_audit::AuditLog;
use extractor_domain::{
    CustomizerRegistry, Detach, ExtractError, ExtractionRules, ModuleClassifier, ParentAggregator,
    ProjectTransformer, SkipReason, TransformOutcome, metadata, skeleton,
};
use extractor_store::{ResolutionContext, StoreError, WorkingStore, keys};
use extractor_types::{
    AggregatedParent, FilePatch, ModuleClassification, ModuleDescriptor, ParentSkeleton,
    TargetModuleDescriptor,
};
use tracing::{debug, info, warn};

/// File holding each generated module's descriptor, inside its target path.
pub const MODULE_DESCRIPTOR_FILE: &str = "module.json";
/// Generated parent, at the output root.
pub const PARENT_DESCRIPTOR_FILE: &str = "parent.json";
pub const SUMMARY_FILE: &str = "extraction-summary.md";
/// Empty marker file the generated project's build expects at its root.
pub const EMPTY_FILE_MARKER: &str = "empty-file";

/// Error type for pipeline results. Exit code 2 = wrong pass order or dirty
/// directory, 1 = anything else.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("{0:#}")]
    Io(#[from] anyhow::Error),
}

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        PipelineError::Extract(err.into())
    }
}

impl PipelineError {
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::Extract(err) => err.exit_code(),
            PipelineError::Io(_) => 1,
        }
    }
}

// ---------------------------------------------------------------------------
// init

/// Persist the generated parent's skeleton and the keys it manages.
pub fn run_init(
    rules: &ExtractionRules,
    store: &dyn WorkingStore,
) -> Result<ParentSkeleton, PipelineError> {
    let skeleton = skeleton::builtin(rules);
    let json = serde_json::to_string_pretty(&skeleton).context("serialize parent skeleton")?;
    store.create(keys::PARENT_SKELETON, &json)?;

    let managed = skeleton::test_parent_managed_keys(&skeleton);
    store.create(keys::TEST_PARENT_MANAGED_KEYS, &keys::to_lines(&managed))?;

    info!(
        artifact = %skeleton.artifact_id,
        managed = managed.len(),
        profiles = skeleton.profiles.len(),
        "initialized working state"
    );
    Ok(skeleton)
}

// ---------------------------------------------------------------------------
// collect

/// What the collect pass recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectOutcome {
    pub bom_keys: usize,
    pub build_parent: bool,
    pub integration_test_modules: usize,
    pub parent_plugin_versions: usize,
    pub core_extensions: Vec<String>,
}

impl CollectOutcome {
    pub fn merge(&mut self, other: CollectOutcome) {
        self.bom_keys += other.bom_keys;
        self.build_parent |= other.build_parent;
        self.integration_test_modules += other.integration_test_modules;
        self.parent_plugin_versions += other.parent_plugin_versions;
        self.core_extensions.extend(other.core_extensions);
    }
}

/// Record the metadata one module contributes to later passes.
pub fn collect_module(
    rules: &ExtractionRules,
    store: &dyn WorkingStore,
    module: &ModuleDescriptor,
) -> Result<CollectOutcome, PipelineError> {
    let modules = &rules.modules;
    let mut outcome = CollectOutcome::default();

    if module.artifact_id == modules.bom {
        let bom = metadata::bom_keys(module)?;
        store.create(keys::BOM_MANAGED_KEYS, &keys::to_lines(&bom))?;
        outcome.bom_keys = bom.len();
    } else if module.artifact_id == modules.build_parent {
        let snapshot = metadata::build_parent_snapshot(module);
        let json = serde_json::to_string_pretty(&snapshot).context("serialize build parent")?;
        store.create(keys::BUILD_PARENT, &json)?;
        outcome.build_parent = true;
    } else if module.artifact_id == modules.integration_tests_parent {
        let paths = metadata::integration_test_modules(rules, module)?;
        store.create(keys::INTEGRATION_TEST_MODULES, &keys::to_lines(&paths))?;
        outcome.integration_test_modules = paths.len();
    } else if module.artifact_id == modules.shared_parent {
        let versions = metadata::parent_plugin_versions(module);
        let lines = versions
            .iter()
            .map(|(artifact, version)| format!("{artifact}{}{version}", keys::ENTRY_SEPARATOR));
        store.create(keys::PARENT_PLUGIN_VERSIONS, &keys::to_lines(lines))?;
        outcome.parent_plugin_versions = versions.len();
    }

    if metadata::is_core_extension_module(rules, module) {
        store.append_line(keys::CORE_EXTENSIONS, &module.artifact_id)?;
        outcome.core_extensions.push(module.artifact_id.clone());
    }

    debug!(module = %module.artifact_id, ?outcome, "collected module metadata");
    Ok(outcome)
}

/// Run the collect pass over every module of `source`.
pub fn run_collect(
    settings: &CollectSettings,
    store: &dyn WorkingStore,
    source: &dyn ModuleSource,
) -> Result<CollectOutcome, PipelineError> {
    let modules = source.load_modules()?;
    let mut outcome = CollectOutcome::default();
    for module in &modules {
        outcome.merge(collect_module(&settings.rules, store, module)?);
    }
    info!(
        modules = modules.len(),
        bom_keys = outcome.bom_keys,
        core_extensions = outcome.core_extensions.len(),
        integration_test_modules = outcome.integration_test_modules,
        "collect pass finished"
    );
    Ok(outcome)
}

// ---------------------------------------------------------------------------
// extract

/// What happened to one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleAction {
    Written { target_path: String, listed: bool },
    /// The integration-tests parent's build went into the generated parent.
    ParentBuild,
    Detached { parent_target_path: String },
    Unsupported,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleOutcome {
    pub module: String,
    pub classification: ModuleClassification,
    pub action: ModuleAction,
    /// A partial audit fragment was written for this module.
    pub audited: bool,
}

/// Outcome of `finalize`.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizeOutcome {
    pub parent: AggregatedParent,
    pub summary: String,
    pub audit_fragments: usize,
    pub parent_fragments: usize,
}

/// Outcome of `run_extract`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractOutcome {
    pub modules: Vec<ModuleOutcome>,
    pub finalized: Option<FinalizeOutcome>,
}

impl ExtractOutcome {
    pub fn written(&self) -> usize {
        self.modules
            .iter()
            .filter(|m| matches!(m.action, ModuleAction::Written { .. }))
            .count()
    }
}

/// Per-module pass over a loaded [`ResolutionContext`].
pub struct Extractor<'a> {
    settings: &'a ExtractSettings,
    store: &'a dyn WorkingStore,
    output: &'a dyn OutputPort,
    ctx: ResolutionContext,
    customizers: CustomizerRegistry,
}

impl<'a> Extractor<'a> {
    /// Load the collected metadata. Fails when `init` or `collect` has not run.
    pub fn new(
        settings: &'a ExtractSettings,
        store: &'a dyn WorkingStore,
        output: &'a dyn OutputPort,
    ) -> Result<Self, PipelineError> {
        let ctx = ResolutionContext::load(store)?;
        Ok(Self {
            settings,
            store,
            output,
            ctx,
            customizers: CustomizerRegistry::default(),
        })
    }

    pub fn with_customizers(mut self, customizers: CustomizerRegistry) -> Self {
        self.customizers = customizers;
        self
    }

    pub fn context(&self) -> &ResolutionContext {
        &self.ctx
    }

    fn rules(&self) -> &'a ExtractionRules {
        &self.settings.rules
    }

    /// The module after which the external build order has processed
    /// everything else.
    pub fn is_terminal(&self, module: &ModuleDescriptor) -> bool {
        module.artifact_id == self.rules().modules.terminal
    }

    pub fn run_module(&self, module: &ModuleDescriptor) -> Result<ModuleOutcome, PipelineError> {
        let rules = self.rules();
        let classification = ModuleClassifier::new(rules, &self.ctx).classify(
            &module.relative_path,
            &module.artifact_id,
            module.packaging(),
        );
        debug!(
            module = %module.artifact_id,
            path = %module.relative_path,
            classification = classification.as_str(),
            "classified module"
        );

        let audit = AuditLog::new();
        let mut parent = ParentAggregator::new(rules, &self.ctx.skeleton);
        let transformer = ProjectTransformer::new(rules, &self.ctx, &self.customizers);

        let action = match transformer.transform(module, classification, &audit)? {
            TransformOutcome::Module { target, listed } => {
                self.emit(&target)?;
                parent.add_target(&target, listed)?;
                info!(
                    module = %module.artifact_id,
                    target = %target.target_path,
                    listed,
                    "module written"
                );
                ModuleAction::Written {
                    target_path: target.target_path.clone(),
                    listed,
                }
            }
            TransformOutcome::IntegrationTestsBuild(build) => {
                parent.set_profile_build(
                    &rules.profiles.integration_tests_build,
                    build,
                    &module.artifact_id,
                )?;
                ModuleAction::ParentBuild
            }
            TransformOutcome::Unsupported { detach: Some(detach) } => {
                if self.detach(&detach, &module.artifact_id)? {
                    ModuleAction::Detached {
                        parent_target_path: detach.parent_target_path,
                    }
                } else {
                    ModuleAction::Unsupported
                }
            }
            TransformOutcome::Unsupported { detach: None } => ModuleAction::Unsupported,
            TransformOutcome::Skipped { reason } => {
                debug!(module = %module.artifact_id, reason = reason.as_str(), "module skipped");
                ModuleAction::Skipped(reason)
            }
        };

        parent.flush_partial(self.store, &module.artifact_id)?;
        let audited = audit.flush_partial(self.store, &module.artifact_id)?;

        Ok(ModuleOutcome {
            module: module.artifact_id.clone(),
            classification,
            action,
            audited,
        })
    }

    /// Merge every partial, write the generated parent and the summary.
    /// Runs once per working directory; a second call fails on the existing
    /// summary entry.
    pub fn finalize(&self) -> Result<FinalizeOutcome, PipelineError> {
        let audit = AuditLog::new();
        let audit_fragments = audit.merge_partials(self.store)?;
        let summary = audit.render();

        let mut aggregator = ParentAggregator::new(self.rules(), &self.ctx.skeleton);
        let parent_fragments = aggregator.merge_partials(self.store)?;
        let parent = aggregator.finalize(self.ctx.build_parent.as_ref());

        // The summary entry marks the run finalized, so it is created only
        // after every output file is in place.
        let json = serde_json::to_string_pretty(&parent).context("serialize generated parent")?;
        write_same_or_new(self.output, Utf8Path::new(PARENT_DESCRIPTOR_FILE), &json)?;
        write_same_or_new(self.output, Utf8Path::new(SUMMARY_FILE), &summary)?;
        let marker = Utf8Path::new(EMPTY_FILE_MARKER);
        if !self.output.exists(marker)? {
            self.output.write(marker, "")?;
        }
        self.store.create(keys::EXTRACTION_SUMMARY, &summary)?;

        info!(
            audit_fragments,
            parent_fragments,
            modules = parent.profiles.iter().map(|p| p.modules.len()).sum::<usize>(),
            "generated parent finalized"
        );
        Ok(FinalizeOutcome {
            parent,
            summary,
            audit_fragments,
            parent_fragments,
        })
    }

    /// Claim the target path, write the descriptor and apply file patches.
    fn emit(&self, target: &TargetModuleDescriptor) -> Result<(), PipelineError> {
        let claim = keys::target_path_claim(&target.target_path);
        match self.store.create(&claim, &target.target_path) {
            Ok(()) => {}
            Err(StoreError::AlreadyExists { .. }) => {
                return Err(ExtractError::DuplicateTargetPath {
                    path: target.target_path.clone(),
                    module: target.source_module.clone(),
                }
                .into());
            }
            Err(err) => return Err(err.into()),
        }

        let json = serde_json::to_string_pretty(target)
            .with_context(|| format!("serialize descriptor of {}", target.source_module))?;
        write_new(self.output, &descriptor_path(&target.target_path), &json)?;

        for patch in &target.file_patches {
            self.apply_patch(target, patch)?;
        }
        Ok(())
    }

    fn apply_patch(&self, target: &TargetModuleDescriptor, patch: &FilePatch) -> Result<(), PipelineError> {
        let path = Utf8PathBuf::from(&target.target_path).join(patch.path());
        match patch {
            FilePatch::Replace { from, to, .. } => {
                let Some(contents) = self.output.read(&path)? else {
                    warn!(module = %target.source_module, path = %path, "file to patch is missing");
                    return Ok(());
                };
                if !contents.contains(from.as_str()) {
                    debug!(module = %target.source_module, path = %path, "patch text not found");
                    return Ok(());
                }
                self.output.write(&path, &contents.replace(from.as_str(), to))?;
            }
            FilePatch::Touch { .. } => {
                if !self.output.exists(&path)? {
                    self.output.write(&path, "")?;
                }
            }
        }
        debug!(module = %target.source_module, path = %path, "applied file patch");
        Ok(())
    }

    /// Drop an unsupported module from its generated parent. Returns false
    /// when the parent was never generated.
    fn detach(&self, detach: &Detach, module: &str) -> Result<bool, PipelineError> {
        let path = descriptor_path(&detach.parent_target_path);
        let Some(contents) = self.output.read(&path)? else {
            debug!(module, parent = %detach.parent_target_path, "no generated parent to detach from");
            return Ok(false);
        };
        let mut parent: TargetModuleDescriptor =
            serde_json::from_str(&contents).with_context(|| format!("parse {}", path))?;

        let keep = |m: &String| m.trim_end_matches('/') != detach.module_dir;
        parent.modules.retain(keep);
        for profile in &mut parent.profiles {
            profile.modules.retain(keep);
        }

        let json = serde_json::to_string_pretty(&parent).with_context(|| format!("serialize {}", path))?;
        self.output.write(&path, &json)?;
        warn!(
            module,
            parent = %detach.parent_target_path,
            dir = %detach.module_dir,
            "unsupported module detached from its parent"
        );
        Ok(true)
    }
}

/// Run the module pass over every module of `source`, finalizing after the
/// terminal module when `auto_finalize` is set.
pub fn run_extract(
    settings: &ExtractSettings,
    store: &dyn WorkingStore,
    output: &dyn OutputPort,
    source: &dyn ModuleSource,
) -> Result<ExtractOutcome, PipelineError> {
    let modules = source.load_modules()?;
    let extractor = Extractor::new(settings, store, output)?;

    let mut outcome = ExtractOutcome::default();
    for module in &modules {
        outcome.modules.push(extractor.run_module(module)?);
        if settings.auto_finalize && extractor.is_terminal(module) {
            outcome.finalized = Some(extractor.finalize()?);
        }
    }

    info!(
        modules = modules.len(),
        written = outcome.written(),
        finalized = outcome.finalized.is_some(),
        "extract pass finished"
    );
    Ok(outcome)
}

/// Explicit finalize, for drivers that know every module has been processed.
pub fn run_finalize(
    settings: &ExtractSettings,
    store: &dyn WorkingStore,
    output: &dyn OutputPort,
) -> Result<FinalizeOutcome, PipelineError> {
    Extractor::new(settings, store, output)?.finalize()
}

pub fn descriptor_path(target_path: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(target_path.trim_end_matches('/')).join(MODULE_DESCRIPTOR_FILE)
}

/// Create-new write: an existing output means the directory is not clean.
fn write_new(output: &dyn OutputPort, path: &Utf8Path, contents: &str) -> Result<(), PipelineError> {
    if output.exists(path)? {
        return Err(ExtractError::OutputExists {
            path: path.to_string(),
        }
        .into());
    }
    output.write(path, contents)?;
    Ok(())
}

/// Like [`write_new`], but an existing file with the same contents is left
/// in place so an interrupted finalize can be rerun.
fn write_same_or_new(
    output: &dyn OutputPort,
    path: &Utf8Path,
    contents: &str,
) -> Result<(), PipelineError> {
    match output.read(path)? {
        Some(existing) if existing == contents => Ok(()),
        Some(_) => Err(ExtractError::OutputExists {
            path: path.to_string(),
        }
        .into()),
        None => {
            output.write(path, contents)?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryOutput;
    use extractor_store::InMemoryStore;

    #[test]
    fn store_errors_keep_their_exit_code() {
        let err = PipelineError::from(StoreError::MissingPriorPass {
            key: keys::BOM_MANAGED_KEYS.to_string(),
            pass: keys::pass::COLLECT,
        });
        assert_eq!(err.exit_code(), 2);

        let err = PipelineError::from(anyhow::anyhow!("disk full"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn init_twice_is_dirty() {
        let store = InMemoryStore::new();
        let rules = ExtractionRules::default();
        run_init(&rules, &store).unwrap();
        let err = run_init(&rules, &store).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn write_new_refuses_existing_output() {
        let output = InMemoryOutput::new();
        output.insert("parent.json", "{}");
        let err = write_new(&output, Utf8Path::new("parent.json"), "{}").unwrap_err();
        assert!(matches!(err, PipelineError::Extract(ExtractError::OutputExists { .. })));
    }

    #[test]
    fn write_same_or_new_accepts_identical_output_only() {
        let output = InMemoryOutput::new();
        output.insert("parent.json", "{}");
        write_same_or_new(&output, Utf8Path::new("parent.json"), "{}").unwrap();
        let err = write_same_or_new(&output, Utf8Path::new("parent.json"), "[]").unwrap_err();
        assert!(matches!(err, PipelineError::Extract(ExtractError::OutputExists { .. })));
        write_same_or_new(&output, Utf8Path::new("extraction-summary.md"), "# summary").unwrap();
        assert_eq!(
            output.read(Utf8Path::new("extraction-summary.md")).unwrap().as_deref(),
            Some("# summary")
        );
    }

    #[test]
    fn descriptor_path_ignores_trailing_slash() {
        assert_eq!(
            descriptor_path("integration-tests/main/"),
            Utf8PathBuf::from("integration-tests/main/module.json")
        );
    }

    #[test]
    fn extractor_requires_collect() {
        let store = InMemoryStore::new();
        let output = InMemoryOutput::new();
        let settings = ExtractSettings::default();
        run_init(&settings.rules, &store).unwrap();

        let err = match Extractor::new(&settings, &store, &output) {
            Ok(_) => panic!("extractor started without collected metadata"),
            Err(err) => err,
        };
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("'collect' pass"));
    }
}
