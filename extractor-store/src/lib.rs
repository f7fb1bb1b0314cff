//! Working state shared between extraction passes.
//!
//! Passes run in separate processes, so everything one pass hands to the
//! next goes through a [`WorkingStore`]:
//! - [`InMemoryStore`] for single-process runs and tests
//! - [`FsStore`] for multi-process runs (one file per key)
//!
//! Entries are create-new. Writing a key twice means the working directory is
//! not clean and fails with [`StoreError::AlreadyExists`]. The core-extension
//! list is the one append-only key.
//!
//! [`ResolutionContext`] is the read side: it loads the collected metadata
//! once and refuses to start when a prior pass has not run.

mod context;
mod error;
pub mod keys;
mod store;

pub use context::ResolutionContext;
pub use error::StoreError;
pub use store::{FsStore, InMemoryStore, WorkingStore};
