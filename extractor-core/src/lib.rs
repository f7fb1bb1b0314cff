//! Embeddable extraction pipeline.
//!
//! Clap-free and I/O-abstracted so the passes can be driven by the CLI, by a
//! build-graph driver linked in-process, or by tests.
//!
//! # Port traits
//!
//! - [`ModuleSource`](ports::ModuleSource) supplies module descriptors
//! - [`OutputPort`](ports::OutputPort) reads and writes files of the
//!   generated project
//!
//! Working state between passes goes through
//! [`WorkingStore`](extractor_store::WorkingStore).
//!
//! # Entry points
//!
//! - [`run_init`](pipeline::run_init) writes the parent skeleton
//! - [`run_collect`](pipeline::run_collect) records BOM keys, core
//!   extensions, integration-test modules and plugin versions
//! - [`Extractor`](pipeline::Extractor) runs the per-module pass and
//!   [`finalize`](pipeline::Extractor::finalize)

pub mod adapters;
pub mod pipeline;
pub mod ports;
pub mod settings;

pub use extractor_domain::ExtractionRules;
pub use extractor_store::{FsStore, InMemoryStore, WorkingStore};
pub use extractor_types::ModuleDescriptor;
