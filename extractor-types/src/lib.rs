//! Shared DTOs (schemas-as-code) for the extractor workspace.
//!
//! # Design constraints
//! - Module descriptors arrive from the external build-graph driver as JSON.
//! - Target descriptors, parent fragments and audit fragments are persisted
//!   between passes and may be read by a different process.
//! - Prefer adding optional fields over changing semantics.

pub mod decision;
pub mod descriptor;
pub mod key;
pub mod parent;
pub mod target;

pub use decision::{DecisionReason, ModuleClassification, VersionDecision, VersionRef};
pub use descriptor::{
    BuildSection, DependencyRef, Exclusion, ModuleDescriptor, ModuleLink, ParentRef,
    PluginExecution, PluginRef, Profile, Repository,
};
pub use key::{ManagementKey, ParseKeyError};
pub use parent::{AggregatedParent, BuildParentSnapshot, ParentSkeleton};
pub use target::{FilePatch, TargetModuleDescriptor, Usage};

/// Schema identifiers.
pub mod schema {
    pub const TARGET_MODULE_V1: &str = "extractor.target-module.v1";
    pub const AGGREGATED_PARENT_V1: &str = "extractor.parent.v1";
    pub const PARENT_FRAGMENT_V1: &str = "extractor.parent-fragment.v1";
    pub const AUDIT_FRAGMENT_V1: &str = "extractor.audit-fragment.v1";
}
