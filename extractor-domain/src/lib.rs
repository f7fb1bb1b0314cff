//! Domain logic: classify monorepo modules, decide dependency and plugin
//! versions, and turn each test module into a descriptor of the standalone
//! project.
//!
//! This crate owns *what* the generated project looks like. Reading module
//! descriptors and writing outputs belongs to `extractor-core`.

mod aggregator;
mod classifier;
mod customizers;
mod error;
pub mod metadata;
mod plugin_policy;
pub mod rules;
pub mod skeleton;
mod transformer;
mod version_policy;

pub use aggregator::{ParentAggregator, ParentFragment};
pub use classifier::ModuleClassifier;
pub use customizers::{CustomizeContext, CustomizerRegistry, ModuleCustomizer, builtin_customizers};
pub use error::ExtractError;
pub use plugin_policy::{PluginVersionResolutionPolicy, PluginVersionSource};
pub use rules::ExtractionRules;
pub use transformer::{
    Detach, ProjectTransformer, SkipReason, TransformOutcome, relative_path_to_root,
};
pub use version_policy::VersionResolutionPolicy;
